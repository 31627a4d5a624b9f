//! Warning Classification
//!
//! Severity is assigned from a fixed table of known warning types when the
//! plan is parsed. Types missing from the table are `Info`.

use std::collections::BTreeMap;

use crate::showplan::model::{NodeIndex, ParsedPlan, PlanWarning, Severity, SpillKind};

/// Known warning types and their severity
pub const WARNING_SEVERITIES: &[(&str, Severity)] = &[
    ("NoJoinPredicate", Severity::Critical),
    ("SpillToTempDb", Severity::Critical),
    ("SortSpillDetails", Severity::Critical),
    ("HashSpillDetails", Severity::Critical),
    ("ExchangeSpillDetails", Severity::Critical),
    ("MemoryGrantWarning", Severity::Warning),
    ("PlanAffectingConvert", Severity::Warning),
    ("ColumnsWithNoStatistics", Severity::Warning),
    ("UnmatchedIndexes", Severity::Warning),
    ("SpatialGuess", Severity::Info),
    ("FullUpdateForOnlineIndexBuild", Severity::Info),
    ("Wait", Severity::Info),
];

/// Looks up the severity of a warning type
pub fn classify_severity(warning_type: &str) -> Severity {
    WARNING_SEVERITIES
        .iter()
        .find(|(known, _)| *known == warning_type)
        .map_or(Severity::Info, |(_, severity)| *severity)
}

/// Returns the spill kind for warning types that carry spill detail
pub fn spill_kind(warning_type: &str) -> Option<SpillKind> {
    match warning_type {
        "SpillToTempDb" => Some(SpillKind::TempDb),
        "SortSpillDetails" => Some(SpillKind::Sort),
        "HashSpillDetails" => Some(SpillKind::Hash),
        "ExchangeSpillDetails" => Some(SpillKind::Exchange),
        _ => None,
    }
}

/// Where a warning was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSource {
    /// On the statement's query plan
    Statement,
    /// On an operator
    Operator { node_id: i32, index: NodeIndex },
}

/// A warning together with its origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarningRef<'a> {
    /// Position of the statement in [`ParsedPlan::statements`]
    pub statement_index: usize,
    pub source: WarningSource,
    pub warning: &'a PlanWarning,
}

impl ParsedPlan {
    /// Every statement and operator warning, in statement order, with
    /// statement warnings before operator warnings
    pub fn all_warnings(&self) -> Vec<WarningRef<'_>> {
        let mut all = Vec::new();
        for (statement_index, statement) in self.statements().enumerate() {
            all.extend(statement.warnings.iter().map(|warning| WarningRef {
                statement_index,
                source: WarningSource::Statement,
                warning,
            }));
            let Some(tree) = &statement.tree else {
                continue;
            };
            for node in tree.iter() {
                all.extend(node.warnings.iter().map(|warning| WarningRef {
                    statement_index,
                    source: WarningSource::Operator {
                        node_id: node.node_id,
                        index: node.index(),
                    },
                    warning,
                }));
            }
        }
        all
    }

    /// Warnings grouped by severity; iteration yields the most severe group first
    pub fn warnings_by_severity(&self) -> BTreeMap<Severity, Vec<WarningRef<'_>>> {
        let mut groups: BTreeMap<Severity, Vec<WarningRef<'_>>> = BTreeMap::new();
        for warning in self.all_warnings() {
            groups
                .entry(warning.warning.severity)
                .or_default()
                .push(warning);
        }
        groups
    }
}

#[cfg(test)]
mod tests;
