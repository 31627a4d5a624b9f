//! Plan Analysis Module
//!
//! Enrichment passes applied to a parsed plan before layout:
//! - cost share of each operator relative to its statement's root
//! - warning severity classification and grouping
//! - missing-index `CREATE INDEX` synthesis

pub mod costs;
pub mod missing_index;
pub mod warnings;

pub use costs::{EXPENSIVE_COST_PERCENT, annotate_costs, cost_percent, most_expensive};
pub use missing_index::create_index_statement;
pub use warnings::{
    WARNING_SEVERITIES, WarningRef, WarningSource, classify_severity, spill_kind,
};
