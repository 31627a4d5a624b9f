//! PlanLens Showplan - Execution plan parsing and diagram layout
//!
//! This crate provides functionality for:
//! - Parsing SQL Server showplan XML into a typed operator tree
//! - Cost annotation, warning classification and missing-index reporting
//! - Computing deterministic diagram coordinates for each statement's tree
//!
//! # Example
//!
//! ```
//! use planlens_showplan::{LayoutEngine, parse_showplan};
//!
//! let xml = r#"<ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan">
//!   <BatchSequence><Batch><Statements>
//!     <StmtSimple StatementId="1">
//!       <QueryPlan>
//!         <RelOp NodeId="0" PhysicalOp="Constant Scan" LogicalOp="Constant Scan" EstimatedTotalSubtreeCost="0" />
//!       </QueryPlan>
//!     </StmtSimple>
//!   </Statements></Batch></BatchSequence>
//! </ShowPlanXML>"#;
//!
//! let mut plan = parse_showplan(xml).unwrap();
//! let canvases = LayoutEngine::default().layout_plan(&mut plan);
//!
//! let root = plan.statements().next().unwrap().root().unwrap();
//! assert_eq!((root.x, root.y), (20.0, 20.0));
//! assert_eq!(root.cost_percent, 0);
//! assert!(canvases[0].is_some());
//! ```

pub mod analysis;
pub mod layout;
pub mod showplan;

pub use analysis::{WarningRef, WarningSource, most_expensive};
pub use layout::{CanvasSize, LayoutConfig, LayoutConfigError, LayoutEngine};
pub use showplan::*;

#[cfg(test)]
mod test_fixtures;
