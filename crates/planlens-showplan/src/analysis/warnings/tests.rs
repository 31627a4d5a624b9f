//! Tests for warning classification

use super::*;
use crate::showplan::NodeIndex;
use crate::test_fixtures::{self, ACTUAL_SORT_SPILL, HASH_JOIN, SINGLE_SCAN};

mod severity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_types() {
        assert_eq!(classify_severity("NoJoinPredicate"), Severity::Critical);
        assert_eq!(classify_severity("HashSpillDetails"), Severity::Critical);
        assert_eq!(classify_severity("PlanAffectingConvert"), Severity::Warning);
        assert_eq!(classify_severity("MemoryGrantWarning"), Severity::Warning);
        assert_eq!(classify_severity("SpatialGuess"), Severity::Info);
    }

    #[test]
    fn test_unknown_type_is_info() {
        assert_eq!(classify_severity("FancyNewWarning"), Severity::Info);
        assert_eq!(classify_severity(""), Severity::Info);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(classify_severity("nojoinpredicate"), Severity::Info);
    }

    #[test]
    fn test_spill_types_are_critical() {
        for warning_type in [
            "SpillToTempDb",
            "SortSpillDetails",
            "HashSpillDetails",
            "ExchangeSpillDetails",
        ] {
            assert!(spill_kind(warning_type).is_some());
            assert!(classify_severity(warning_type).is_critical());
        }
        assert_eq!(spill_kind("NoJoinPredicate"), None);
    }

    #[test]
    fn test_ordering_puts_critical_first() {
        let mut levels = vec![Severity::Info, Severity::Critical, Severity::Warning];
        levels.sort();
        assert_eq!(levels, vec![Severity::Critical, Severity::Warning, Severity::Info]);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");

        let parsed: Severity = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(parsed, Severity::Info);
    }
}

mod parsed_warning_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spill_warning_carries_detail() {
        let plan = test_fixtures::parse(ACTUAL_SORT_SPILL);
        let sort = plan.statements().next().unwrap().root().unwrap();

        let spill = sort
            .warnings
            .iter()
            .find(|w| w.warning_type == "SortSpillDetails")
            .unwrap();
        assert_eq!(spill.severity, Severity::Critical);

        let detail = spill.spill.as_ref().unwrap();
        assert_eq!(detail.kind, SpillKind::Sort);
        assert_eq!(detail.writes_to_tempdb, 120);
        assert_eq!(detail.reads_from_tempdb, 118);
        assert_eq!(detail.granted_memory_kb, Some(1024));
        assert_eq!(detail.used_memory_kb, Some(1024));
        assert!(spill.message.contains("120 pages"));
    }

    #[test]
    fn test_spill_pair_becomes_one_warning() {
        let plan = test_fixtures::parse(ACTUAL_SORT_SPILL);
        let sort = plan.statements().next().unwrap().root().unwrap();

        let spills: Vec<&PlanWarning> =
            sort.warnings.iter().filter(|w| w.spill.is_some()).collect();
        assert_eq!(spills.len(), 1);
        assert!(!sort.warnings.iter().any(|w| w.warning_type == "SpillToTempDb"));

        let detail = spills[0].spill.as_ref().unwrap();
        assert_eq!(detail.spill_level, Some(1));
        assert_eq!(detail.spilled_thread_count, Some(2));
        assert!(detail.writes_to_tempdb > 0 && detail.reads_from_tempdb > 0);
        assert!(spills[0].message.ends_with("(spill level 1, 2 spilled thread(s))"));
    }

    #[test]
    fn test_hash_spill_pair_in_either_order() {
        let xml = format!(
            r#"<ShowPlanXML xmlns="{}"><BatchSequence><Batch><Statements>
              <StmtSimple StatementId="1" StatementSubTreeCost="1"><QueryPlan>
                <RelOp NodeId="0" PhysicalOp="Hash Match" LogicalOp="Aggregate" EstimatedTotalSubtreeCost="1">
                  <Warnings>
                    <HashSpillDetails GrantedMemoryKb="64" UsedMemoryKb="64" WritesToTempDb="8" ReadsFromTempDb="8" />
                    <SpillToTempDb SpillLevel="2" SpilledThreadCount="1" />
                  </Warnings>
                  <Hash />
                </RelOp>
              </QueryPlan></StmtSimple>
            </Statements></Batch></BatchSequence></ShowPlanXML>"#,
            crate::showplan::SHOWPLAN_NAMESPACE
        );
        let plan = test_fixtures::parse(&xml);
        let hash = plan.statements().next().unwrap().root().unwrap();

        assert_eq!(hash.warnings.len(), 1);
        assert_eq!(hash.warnings[0].warning_type, "HashSpillDetails");
        let detail = hash.warnings[0].spill.as_ref().unwrap();
        assert_eq!(detail.kind, SpillKind::Hash);
        assert_eq!(detail.spill_level, Some(2));
        assert_eq!(detail.writes_to_tempdb, 8);
    }

    #[test]
    fn test_lone_tempdb_spill_is_kept() {
        let xml = format!(
            r#"<ShowPlanXML xmlns="{}"><BatchSequence><Batch><Statements>
              <StmtSimple StatementId="1" StatementSubTreeCost="1"><QueryPlan>
                <RelOp NodeId="0" PhysicalOp="Sort" LogicalOp="Sort" EstimatedTotalSubtreeCost="1">
                  <Warnings><SpillToTempDb SpillLevel="1" SpilledThreadCount="1" /></Warnings>
                  <Sort />
                </RelOp>
              </QueryPlan></StmtSimple>
            </Statements></Batch></BatchSequence></ShowPlanXML>"#,
            crate::showplan::SHOWPLAN_NAMESPACE
        );
        let plan = test_fixtures::parse(&xml);
        let sort = plan.statements().next().unwrap().root().unwrap();

        assert_eq!(sort.warnings.len(), 1);
        let detail = sort.warnings[0].spill.as_ref().unwrap();
        assert_eq!(detail.kind, SpillKind::TempDb);
        assert_eq!(detail.spill_level, Some(1));
    }

    #[test]
    fn test_unknown_element_warning_is_kept_as_info() {
        let plan = test_fixtures::parse(ACTUAL_SORT_SPILL);
        let sort = plan.statements().next().unwrap().root().unwrap();

        let unknown = sort
            .warnings
            .iter()
            .find(|w| w.warning_type == "FancyNewWarning")
            .unwrap();
        assert_eq!(unknown.severity, Severity::Info);
        assert_eq!(unknown.spill, None);
        assert_eq!(unknown.message, "FancyNewWarning: Reason=made up");
    }

    #[test]
    fn test_false_boolean_attribute_is_not_a_warning() {
        let plan = test_fixtures::parse(HASH_JOIN);
        let join = plan.statements().next().unwrap().root().unwrap();
        assert!(join.warnings.is_empty());
    }
}

mod grouping_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_warnings_records_origin() {
        let plan = test_fixtures::parse(HASH_JOIN);
        let all = plan.all_warnings();

        let origins: Vec<(&str, WarningSource)> = all
            .iter()
            .map(|w| (w.warning.warning_type.as_str(), w.source))
            .collect();
        assert_eq!(
            origins,
            vec![
                ("PlanAffectingConvert", WarningSource::Statement),
                (
                    "ColumnsWithNoStatistics",
                    WarningSource::Operator {
                        node_id: 2,
                        index: NodeIndex(2),
                    }
                ),
            ]
        );
        assert!(all.iter().all(|w| w.statement_index == 0));
    }

    #[test]
    fn test_grouped_most_severe_first() {
        let plan = test_fixtures::parse(ACTUAL_SORT_SPILL);
        let groups = plan.warnings_by_severity();

        let summary: Vec<(Severity, Vec<&str>)> = groups
            .iter()
            .map(|(severity, warnings)| {
                (
                    *severity,
                    warnings
                        .iter()
                        .map(|w| w.warning.warning_type.as_str())
                        .collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Severity::Critical, vec!["SortSpillDetails"]),
                (Severity::Warning, vec!["MemoryGrantWarning"]),
                (Severity::Info, vec!["FancyNewWarning"]),
            ]
        );
    }

    #[test]
    fn test_plan_without_warnings_has_no_groups() {
        let plan = test_fixtures::parse(SINGLE_SCAN);
        assert!(plan.all_warnings().is_empty());
        assert!(plan.warnings_by_severity().is_empty());
    }
}
