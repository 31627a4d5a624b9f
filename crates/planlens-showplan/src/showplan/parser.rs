//! Showplan XML Parser
//!
//! Parses the XML execution plan documents produced by SQL Server
//! (`SET SHOWPLAN_XML ON`, `SET STATISTICS XML ON`, or the plan cache) into a
//! [`ParsedPlan`].
//!
//! The schema differs between engine versions, so the parser follows one
//! rule everywhere: unknown elements and attributes are ignored, and absent
//! optional data is left as `None`, zero or empty. Only two conditions abort a
//! parse: input that is not well-formed XML, and a document whose root is not
//! `ShowPlanXML`. A statement without an operator tree is dropped and counted
//! in [`Batch::skipped_statements`]; its siblings still parse.
//!
//! # Examples
//!
//! ```
//! use planlens_showplan::showplan::parse_showplan;
//!
//! let xml = r#"<ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan" Version="1.6">
//!   <BatchSequence><Batch><Statements>
//!     <StmtSimple StatementText="SELECT * FROM t" StatementId="1" StatementSubTreeCost="0.5">
//!       <QueryPlan>
//!         <RelOp NodeId="0" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimatedTotalSubtreeCost="0.5">
//!           <TableScan><Object Table="[t]" /></TableScan>
//!         </RelOp>
//!       </QueryPlan>
//!     </StmtSimple>
//!   </Statements></Batch></BatchSequence>
//! </ShowPlanXML>"#;
//!
//! let plan = parse_showplan(xml).unwrap();
//! let statement = plan.statements().next().unwrap();
//! assert_eq!(statement.root().unwrap().physical_op, "Table Scan");
//! assert_eq!(statement.root().unwrap().cost_percent, 100);
//! ```

mod relop;
mod warnings;
mod xml;

use roxmltree::Node;
use thiserror::Error;

use self::relop::build_tree;
use self::warnings::parse_warnings;
use self::xml::{
    attr, attr_bool, attr_f64, attr_flag, attr_i32, attr_string, attr_u32, attr_u64, child,
    children_named, elements,
};
use crate::analysis::missing_index::create_index_statement;
use crate::showplan::model::{
    Batch, CompileMetrics, CursorInfo, FunctionKind, FunctionPlan, MemoryGrantInfo, MissingIndex,
    OptimizerHardwareProperties, Parameter, ParsedPlan, QueryTimeStats, Statement,
    StatisticsInfo, ThreadReservation, ThreadStat, TraceFlag, WaitStat,
};

/// Namespace of every showplan schema version
pub const SHOWPLAN_NAMESPACE: &str = "http://schemas.microsoft.com/sqlserver/2004/07/showplan";

const ROOT_ELEMENT: &str = "ShowPlanXML";

/// Errors that can occur when parsing showplan XML
#[derive(Debug, Error)]
pub enum ShowplanError {
    #[error("Malformed XML: {0}")]
    MalformedXml(#[from] roxmltree::Error),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    /// Raised per statement and absorbed by the batch loop; never returned
    /// from [`parse_showplan`]
    #[error("Statement has no root operator (StatementId {statement_id:?})")]
    MissingRootOperator { statement_id: Option<u32> },
}

/// Result type for showplan parsing
pub type Result<T> = std::result::Result<T, ShowplanError>;

/// Parses a showplan XML document
#[tracing::instrument(skip(xml), fields(input_len = xml.len()))]
pub fn parse_showplan(xml: &str) -> Result<ParsedPlan> {
    let document = roxmltree::Document::parse(xml)?;
    let root = document.root_element();

    let root_name = root.tag_name();
    if root_name.name() != ROOT_ELEMENT {
        return Err(ShowplanError::UnsupportedSchema(format!(
            "expected <{ROOT_ELEMENT}> root element, found <{}>",
            root_name.name()
        )));
    }
    if let Some(namespace) = root_name.namespace()
        && namespace != SHOWPLAN_NAMESPACE
    {
        return Err(ShowplanError::UnsupportedSchema(format!(
            "unrecognized namespace {namespace}"
        )));
    }

    let mut plan = ParsedPlan {
        version: attr_string(root, "Version"),
        build: attr_string(root, "Build"),
        batches: Vec::new(),
    };

    for sequence in children_named(root, "BatchSequence") {
        for batch in children_named(sequence, "Batch") {
            plan.batches.push(parse_batch(batch)?);
        }
    }

    tracing::info!(
        version = plan.version.as_deref(),
        batches = plan.batches.len(),
        statements = plan.statement_count(),
        skipped = plan.skipped_statement_count(),
        "parsed showplan"
    );
    Ok(plan)
}

fn parse_batch(batch: Node<'_, '_>) -> Result<Batch> {
    let mut parsed = Batch::default();
    for statements in children_named(batch, "Statements") {
        parse_statement_list(statements, &mut parsed.statements, &mut parsed.skipped_statements)?;
    }
    Ok(parsed)
}

/// Parses every `Stmt*` child of a `Statements` element into `out`
fn parse_statement_list(
    statements: Node<'_, '_>,
    out: &mut Vec<Statement>,
    skipped: &mut usize,
) -> Result<()> {
    for element in elements(statements) {
        let name = element.tag_name().name();
        if !name.starts_with("Stmt") {
            continue;
        }

        match parse_statement(element) {
            Ok(statement) => out.push(statement),
            Err(ShowplanError::MissingRootOperator { statement_id }) => {
                tracing::debug!(
                    element = name,
                    statement_id = ?statement_id,
                    statement_type = attr(element, "StatementType"),
                    "skipping statement without root operator"
                );
                *skipped += 1;
            }
            Err(e) => return Err(e),
        }

        // Conditional branches hold statements of their own, which follow the
        // condition in document order
        if name == "StmtCond" {
            for branch in ["Then", "Else"] {
                if let Some(branch) = child(element, branch)
                    && let Some(nested) = child(branch, "Statements")
                {
                    parse_statement_list(nested, out, skipped)?;
                }
            }
        }
    }
    Ok(())
}

/// Locates the `QueryPlan` holding a statement's operator tree
fn query_plan_of<'a, 'input>(statement: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    match statement.tag_name().name() {
        "StmtCond" => child(statement, "Condition").and_then(|c| child(c, "QueryPlan")),
        "StmtCursor" => child(statement, "CursorPlan").and_then(|cursor| {
            children_named(cursor, "Operation")
                .filter_map(|op| child(op, "QueryPlan"))
                .find(|qp| child(*qp, "RelOp").is_some())
        }),
        _ => child(statement, "QueryPlan"),
    }
}

fn parse_statement(element: Node<'_, '_>) -> Result<Statement> {
    let statement_id = attr_u32(element, "StatementId");
    let query_plan = query_plan_of(element);
    let Some(root_relop) = query_plan.and_then(|qp| child(qp, "RelOp")) else {
        return Err(ShowplanError::MissingRootOperator { statement_id });
    };

    let mut statement = Statement {
        statement_id,
        statement_comp_id: attr_u32(element, "StatementCompId"),
        statement_type: attr_string(element, "StatementType"),
        statement_text: attr_string(element, "StatementText"),
        estimated_subtree_cost: attr_f64(element, "StatementSubTreeCost").unwrap_or(0.0),
        estimated_rows: attr_f64(element, "StatementEstRows").unwrap_or(0.0),
        optimization_level: attr_string(element, "StatementOptmLevel"),
        early_abort_reason: attr_string(element, "StatementOptmEarlyAbortReason"),
        query_hash: attr_string(element, "QueryHash"),
        query_plan_hash: attr_string(element, "QueryPlanHash"),
        ce_model_version: attr_u32(element, "CardinalityEstimationModelVersion"),
        retrieved_from_cache: attr_flag(element, "RetrievedFromCache"),
        ..Statement::default()
    };

    if let Some(options) = child(element, "StatementSetOptions") {
        statement.set_options = options
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
    }

    if let Some(query_plan) = query_plan {
        parse_query_plan(query_plan, &mut statement);
    }

    if element.tag_name().name() == "StmtCursor" {
        statement.cursor = child(element, "CursorPlan").map(parse_cursor);
    }

    for function in elements(element) {
        let kind = match function.tag_name().name() {
            "UDF" => FunctionKind::Udf,
            "StoredProc" => FunctionKind::StoredProcedure,
            _ => continue,
        };
        statement.function_plans.push(parse_function_plan(function, kind)?);
    }

    statement.tree = Some(build_tree(root_relop));
    Ok(statement)
}

fn parse_query_plan(query_plan: Node<'_, '_>, statement: &mut Statement) {
    statement.degree_of_parallelism = attr_u32(query_plan, "DegreeOfParallelism")
        .or_else(|| attr_u32(query_plan, "EffectiveDegreeOfParallelism"));
    statement.compile = CompileMetrics {
        cached_plan_size_kb: attr_u64(query_plan, "CachedPlanSize"),
        compile_time_ms: attr_u64(query_plan, "CompileTime"),
        compile_cpu_ms: attr_u64(query_plan, "CompileCPU"),
        compile_memory_kb: attr_u64(query_plan, "CompileMemory"),
        memory_grant_kb: attr_u64(query_plan, "MemoryGrant"),
        non_parallel_plan_reason: attr_string(query_plan, "NonParallelPlanReason"),
    };

    for element in elements(query_plan) {
        match element.tag_name().name() {
            "ThreadStat" => statement.thread_stat = Some(parse_thread_stat(element)),
            "MissingIndexes" => statement.missing_indexes = parse_missing_indexes(element),
            "Warnings" => statement.warnings = parse_warnings(element),
            "MemoryGrantInfo" => statement.memory_grant = Some(parse_memory_grant(element)),
            "OptimizerHardwareDependentProperties" => {
                statement.hardware = Some(parse_hardware(element))
            }
            "OptimizerStatsUsage" => {
                statement.stats_usage = children_named(element, "StatisticsInfo")
                    .map(parse_statistics_info)
                    .collect()
            }
            "TraceFlags" => {
                let is_compile_time = attr_flag(element, "IsCompileTime");
                statement
                    .trace_flags
                    .extend(children_named(element, "TraceFlag").filter_map(|flag| {
                        Some(TraceFlag {
                            value: attr_u32(flag, "Value")?,
                            scope: attr_string(flag, "Scope"),
                            is_compile_time,
                        })
                    }));
            }
            "WaitStats" => {
                statement.wait_stats = children_named(element, "Wait")
                    .map(|wait| WaitStat {
                        wait_type: attr_string(wait, "WaitType").unwrap_or_default(),
                        wait_time_ms: attr_u64(wait, "WaitTimeMs").unwrap_or(0),
                        wait_count: attr_u64(wait, "WaitCount").unwrap_or(0),
                    })
                    .collect()
            }
            "QueryTimeStats" => {
                statement.query_time = Some(QueryTimeStats {
                    cpu_time_ms: attr_u64(element, "CpuTime").unwrap_or(0),
                    elapsed_time_ms: attr_u64(element, "ElapsedTime").unwrap_or(0),
                    udf_cpu_time_ms: attr_u64(element, "UdfCpuTime"),
                    udf_elapsed_time_ms: attr_u64(element, "UdfElapsedTime"),
                })
            }
            "ParameterList" => {
                statement.parameters = children_named(element, "ColumnReference")
                    .map(|param| Parameter {
                        name: attr_string(param, "Column").unwrap_or_default(),
                        data_type: attr_string(param, "ParameterDataType"),
                        compiled_value: attr_string(param, "ParameterCompiledValue"),
                        runtime_value: attr_string(param, "ParameterRuntimeValue"),
                    })
                    .collect()
            }
            _ => {}
        }
    }
}

fn parse_thread_stat(element: Node<'_, '_>) -> ThreadStat {
    ThreadStat {
        branches: attr_u32(element, "Branches").unwrap_or(0),
        used_threads: attr_u32(element, "UsedThreads"),
        reservations: children_named(element, "ThreadReservation")
            .map(|r| ThreadReservation {
                node_id: attr_i32(r, "NodeId"),
                reserved_threads: attr_u32(r, "ReservedThreads").unwrap_or(0),
            })
            .collect(),
    }
}

fn parse_memory_grant(element: Node<'_, '_>) -> MemoryGrantInfo {
    MemoryGrantInfo {
        serial_required_memory_kb: attr_u64(element, "SerialRequiredMemory"),
        serial_desired_memory_kb: attr_u64(element, "SerialDesiredMemory"),
        required_memory_kb: attr_u64(element, "RequiredMemory"),
        desired_memory_kb: attr_u64(element, "DesiredMemory"),
        requested_memory_kb: attr_u64(element, "RequestedMemory"),
        granted_memory_kb: attr_u64(element, "GrantedMemory"),
        max_used_memory_kb: attr_u64(element, "MaxUsedMemory"),
        max_query_memory_kb: attr_u64(element, "MaxQueryMemory"),
        grant_wait_time_ms: attr_u64(element, "GrantWaitTime"),
        feedback_adjusted: attr_string(element, "IsMemoryGrantFeedbackAdjusted"),
    }
}

fn parse_hardware(element: Node<'_, '_>) -> OptimizerHardwareProperties {
    OptimizerHardwareProperties {
        estimated_available_memory_grant_kb: attr_u64(element, "EstimatedAvailableMemoryGrant"),
        estimated_pages_cached: attr_u64(element, "EstimatedPagesCached"),
        estimated_available_degree_of_parallelism: attr_u32(
            element,
            "EstimatedAvailableDegreeOfParallelism",
        ),
        max_compile_memory_kb: attr_u64(element, "MaxCompileMemory"),
    }
}

fn parse_statistics_info(element: Node<'_, '_>) -> StatisticsInfo {
    StatisticsInfo {
        database: attr_string(element, "Database"),
        schema: attr_string(element, "Schema"),
        table: attr_string(element, "Table"),
        statistics: attr_string(element, "Statistics"),
        modification_count: attr_u64(element, "ModificationCount"),
        sampling_percent: attr_f64(element, "SamplingPercent"),
        last_update: attr_string(element, "LastUpdate"),
    }
}

/// Extracts suggestions verbatim; every `MissingIndex` element becomes one
/// entry carrying its group's impact
fn parse_missing_indexes(element: Node<'_, '_>) -> Vec<MissingIndex> {
    let mut indexes = Vec::new();
    for group in children_named(element, "MissingIndexGroup") {
        let impact = attr_f64(group, "Impact").unwrap_or(0.0);
        for suggestion in children_named(group, "MissingIndex") {
            let mut index = MissingIndex {
                database: attr_string(suggestion, "Database").unwrap_or_default(),
                schema: attr_string(suggestion, "Schema").unwrap_or_default(),
                table: attr_string(suggestion, "Table").unwrap_or_default(),
                impact,
                ..MissingIndex::default()
            };
            for column_group in children_named(suggestion, "ColumnGroup") {
                let columns = children_named(column_group, "Column")
                    .filter_map(|c| attr_string(c, "Name"));
                match attr(column_group, "Usage") {
                    Some("EQUALITY") => index.equality_columns.extend(columns),
                    Some("INEQUALITY") => index.inequality_columns.extend(columns),
                    Some("INCLUDE") => index.include_columns.extend(columns),
                    _ => {}
                }
            }
            index.create_statement = create_index_statement(&index);
            indexes.push(index);
        }
    }
    indexes
}

fn parse_cursor(cursor: Node<'_, '_>) -> CursorInfo {
    CursorInfo {
        name: attr_string(cursor, "CursorName"),
        actual_type: attr_string(cursor, "CursorActualType"),
        requested_type: attr_string(cursor, "CursorRequestedType"),
        concurrency: attr_string(cursor, "CursorConcurrency"),
        forward_only: attr_bool(cursor, "ForwardOnly").unwrap_or(false),
        operations: children_named(cursor, "Operation")
            .filter_map(|op| attr_string(op, "OperationType"))
            .collect(),
    }
}

fn parse_function_plan(element: Node<'_, '_>, kind: FunctionKind) -> Result<FunctionPlan> {
    let mut function = FunctionPlan {
        name: attr_string(element, "ProcName").unwrap_or_default(),
        kind,
        is_clr: attr_flag(element, "IsClrFunction"),
        statements: Vec::new(),
        skipped_statements: 0,
    };
    if let Some(statements) = child(element, "Statements") {
        parse_statement_list(
            statements,
            &mut function.statements,
            &mut function.skipped_statements,
        )?;
    }
    tracing::debug!(
        name = %function.name,
        kind = ?function.kind,
        statements = function.statements.len(),
        "parsed function plan"
    );
    Ok(function)
}
