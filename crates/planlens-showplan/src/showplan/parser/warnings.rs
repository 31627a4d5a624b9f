//! `<Warnings>` extraction
//!
//! A `Warnings` element reports some conditions as boolean attributes
//! (`NoJoinPredicate="true"`) and others as child elements carrying detail
//! (`SortSpillDetails`, `PlanAffectingConvert`, ...). Both become
//! `PlanWarning`s whose type is the attribute or element name. Unknown child
//! elements are kept with a generic message.
//!
//! A spilling operator reports `SpillToTempDb` (level and thread count) next
//! to a `SortSpillDetails`/`HashSpillDetails`/`ExchangeSpillDetails` element
//! (memory and tempdb page counts). Such a pair becomes one warning of the
//! details type carrying both halves.

use roxmltree::Node;

use super::xml::{attr, attr_u32, attr_u64, column_list, elements, parse_bool};
use crate::analysis::warnings::{classify_severity, spill_kind};
use crate::showplan::model::{PlanWarning, SpillDetail, SpillKind};

pub(super) fn parse_warnings(warnings: Node<'_, '_>) -> Vec<PlanWarning> {
    let mut parsed = Vec::new();

    for attribute in warnings.attributes() {
        if parse_bool(attribute.value()) == Some(true) {
            parsed.push(flag_warning(attribute.name()));
        }
    }

    for element in elements(warnings) {
        parsed.push(element_warning(element));
    }

    merge_spill_pair(&mut parsed);
    parsed
}

/// Folds a `SpillToTempDb` warning into the operator-specific spill details
/// warning reported alongside it
fn merge_spill_pair(warnings: &mut Vec<PlanWarning>) {
    let is_kind = |w: &PlanWarning, tempdb: bool| {
        w.spill
            .as_ref()
            .is_some_and(|s| (s.kind == SpillKind::TempDb) == tempdb)
    };
    let Some(level_at) = warnings.iter().position(|w| is_kind(w, true)) else {
        return;
    };
    let Some(details_at) = warnings.iter().position(|w| is_kind(w, false)) else {
        return;
    };

    let level = warnings.remove(level_at);
    let details_at = if details_at > level_at {
        details_at - 1
    } else {
        details_at
    };
    let details = &mut warnings[details_at];
    if let (Some(from), Some(into)) = (level.spill, details.spill.as_mut()) {
        into.spill_level = into.spill_level.or(from.spill_level);
        into.spilled_thread_count = into.spilled_thread_count.or(from.spilled_thread_count);
        if let (Some(level), Some(threads)) = (into.spill_level, into.spilled_thread_count) {
            details.message = format!(
                "{} (spill level {level}, {threads} spilled thread(s))",
                details.message
            );
        }
    }
}

fn flag_warning(warning_type: &str) -> PlanWarning {
    let message = match warning_type {
        "NoJoinPredicate" => "No join predicate".to_string(),
        "SpatialGuess" => "Spatial guess used for cardinality estimation".to_string(),
        "UnmatchedIndexes" => "Unmatched filtered indexes due to parameterization".to_string(),
        "FullUpdateForOnlineIndexBuild" => {
            "Full update required for online index build".to_string()
        }
        other => other.to_string(),
    };
    PlanWarning::new(warning_type, message, classify_severity(warning_type))
}

fn element_warning(element: Node<'_, '_>) -> PlanWarning {
    let warning_type = element.tag_name().name();
    let value = |name: &str| attr(element, name).unwrap_or("?");

    let message = match warning_type {
        "ColumnsWithNoStatistics" => format!(
            "Columns with no statistics: {}",
            column_list(element).join(", ")
        ),
        "PlanAffectingConvert" => format!(
            "Type conversion in expression ({}) may affect \"{}\" in query plan choice",
            value("Expression"),
            value("ConvertIssue")
        ),
        "SpillToTempDb" => format!(
            "Operator used tempdb to spill data during execution with spill level {} and {} spilled thread(s)",
            value("SpillLevel"),
            value("SpilledThreadCount")
        ),
        "SortSpillDetails" | "HashSpillDetails" => format!(
            "Operator wrote {} pages to and read {} pages from tempdb with granted memory {}KB and used memory {}KB",
            value("WritesToTempDb"),
            value("ReadsFromTempDb"),
            value("GrantedMemoryKb"),
            value("UsedMemoryKb")
        ),
        "ExchangeSpillDetails" => format!(
            "Exchange wrote {} pages to tempdb",
            value("WritesToTempDb")
        ),
        "MemoryGrantWarning" => format!(
            "{}: requested {}KB, granted {}KB, max used {}KB",
            value("GrantWarningKind"),
            value("RequestedMemory"),
            value("GrantedMemory"),
            value("MaxUsedMemory")
        ),
        "Wait" => format!("Waited {} ms on {}", value("WaitTime"), value("WaitType")),
        "UnmatchedIndexes" => "Unmatched filtered indexes due to parameterization".to_string(),
        _ => {
            let details: Vec<String> = element
                .attributes()
                .map(|a| format!("{}={}", a.name(), a.value()))
                .collect();
            if details.is_empty() {
                warning_type.to_string()
            } else {
                format!("{warning_type}: {}", details.join(", "))
            }
        }
    };

    let mut warning = PlanWarning::new(warning_type, message, classify_severity(warning_type));
    if let Some(kind) = spill_kind(warning_type) {
        warning = warning.with_spill(spill_detail(element, kind));
    }
    warning
}

fn spill_detail(element: Node<'_, '_>, kind: SpillKind) -> SpillDetail {
    SpillDetail {
        kind,
        spill_level: attr_u32(element, "SpillLevel"),
        spilled_thread_count: attr_u32(element, "SpilledThreadCount"),
        granted_memory_kb: attr_u64(element, "GrantedMemoryKb"),
        used_memory_kb: attr_u64(element, "UsedMemoryKb"),
        writes_to_tempdb: attr_u64(element, "WritesToTempDb").unwrap_or(0),
        reads_from_tempdb: attr_u64(element, "ReadsFromTempDb").unwrap_or(0),
    }
}
