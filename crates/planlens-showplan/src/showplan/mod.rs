//! Showplan Module
//!
//! Parses SQL Server showplan XML into a strongly-typed model:
//! `ParsedPlan → Batch → Statement → PlanTree`.
//!
//! # Example
//!
//! ```
//! use planlens_showplan::showplan::{parse_showplan, ShowplanError};
//!
//! let err = parse_showplan("<QueryPlan />").unwrap_err();
//! assert!(matches!(err, ShowplanError::UnsupportedSchema(_)));
//!
//! let err = parse_showplan("<ShowPlanXML>").unwrap_err();
//! assert!(matches!(err, ShowplanError::MalformedXml(_)));
//! ```

pub mod model;
pub mod parser;

pub use model::{
    ActualStats, Batch, CompileMetrics, CursorInfo, FunctionKind, FunctionPlan, MemoryFractions,
    MemoryGrantInfo, MissingIndex, NodeIndex, ObjectRef, OptimizerHardwareProperties, Parameter,
    ParsedPlan, PlanNode, PlanNodeIterator, PlanTree, PlanTreeError, PlanWarning,
    QueryTimeStats, Severity, SortColumn, SpillDetail, SpillKind, Statement, StatisticsInfo,
    ThreadCounters, ThreadReservation, ThreadStat, TraceFlag, WaitStat,
};
pub use parser::{Result, SHOWPLAN_NAMESPACE, ShowplanError, parse_showplan};
