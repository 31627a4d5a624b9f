//! Showplan Model - Data structures for parsed execution plans
//!
//! A parsed document is a `ParsedPlan` holding batches of statements. Each
//! statement owns at most one operator tree, stored as an arena (`PlanTree`)
//! in which nodes refer to their children and parent by `NodeIndex`.
//! `children` is the only structural relation; `parent` exists for
//! navigation and is kept consistent by `PlanTree::push_child`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A complete parsed showplan document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedPlan {
    /// Schema version reported by the document (`Version` attribute)
    pub version: Option<String>,
    /// Engine build that produced the document (`Build` attribute)
    pub build: Option<String>,
    /// Batches in document order
    pub batches: Vec<Batch>,
}

impl ParsedPlan {
    /// Creates an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all top-level statements across every batch, in document order
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.batches.iter().flat_map(|b| b.statements.iter())
    }

    /// Mutable variant of [`ParsedPlan::statements`]
    pub fn statements_mut(&mut self) -> impl Iterator<Item = &mut Statement> {
        self.batches.iter_mut().flat_map(|b| b.statements.iter_mut())
    }

    /// Number of statements that parsed successfully
    pub fn statement_count(&self) -> usize {
        self.batches.iter().map(|b| b.statements.len()).sum()
    }

    /// Number of statements dropped because they had no operator tree
    pub fn skipped_statement_count(&self) -> usize {
        self.batches.iter().map(|b| b.skipped_statements).sum()
    }

    /// Flattens every statement's missing-index suggestions in statement order.
    ///
    /// Recomputed on each call. Identical suggestions coming from different
    /// statements are all kept, so each entry still maps back to the
    /// statement that produced it.
    pub fn all_missing_indexes(&self) -> Vec<&MissingIndex> {
        self.statements()
            .flat_map(|s| s.missing_indexes.iter())
            .collect()
    }

    /// Returns true if any operator in the document carries runtime counters
    pub fn has_actual_stats(&self) -> bool {
        self.statements().any(|s| s.has_actual_stats())
    }
}

/// A batch of statements
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    /// Statements in document order
    pub statements: Vec<Statement>,
    /// Statements dropped because they had no root operator
    pub skipped_statements: usize,
}

/// A single statement and its execution plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    /// `StatementId` attribute
    pub statement_id: Option<u32>,
    /// `StatementCompId` attribute
    pub statement_comp_id: Option<u32>,
    /// Statement type such as `SELECT` or `UPDATE`
    pub statement_type: Option<String>,
    /// Statement source text
    pub statement_text: Option<String>,
    /// Optimizer's estimated cost for the whole statement
    pub estimated_subtree_cost: f64,
    /// Optimizer's estimated row count for the statement
    pub estimated_rows: f64,
    /// `TRIVIAL` or `FULL`
    pub optimization_level: Option<String>,
    /// Why optimization stopped early (`TimeOut`, `MemoryLimitExceeded`, ...)
    pub early_abort_reason: Option<String>,
    pub query_hash: Option<String>,
    pub query_plan_hash: Option<String>,
    /// Cardinality estimation model version
    pub ce_model_version: Option<u32>,
    /// Whether the plan was taken from the plan cache
    pub retrieved_from_cache: bool,
    /// Degree of parallelism the plan ran (or would run) with
    pub degree_of_parallelism: Option<u32>,
    /// Compile-time figures
    pub compile: CompileMetrics,
    /// Memory grant summary (`MemoryGrantInfo`)
    pub memory_grant: Option<MemoryGrantInfo>,
    /// Hardware figures the optimizer assumed
    pub hardware: Option<OptimizerHardwareProperties>,
    /// SET options in effect at compile time, keyed by option name
    pub set_options: BTreeMap<String, String>,
    /// Parameters with compiled and runtime values
    pub parameters: Vec<Parameter>,
    /// Statistics the optimizer loaded while compiling
    pub stats_usage: Vec<StatisticsInfo>,
    pub trace_flags: Vec<TraceFlag>,
    /// Top waits recorded while executing (actual plans only)
    pub wait_stats: Vec<WaitStat>,
    /// CPU and elapsed time (actual plans only)
    pub query_time: Option<QueryTimeStats>,
    /// Parallel thread usage
    pub thread_stat: Option<ThreadStat>,
    /// Statement-level warnings
    pub warnings: Vec<PlanWarning>,
    /// Missing-index suggestions, verbatim from the document
    pub missing_indexes: Vec<MissingIndex>,
    /// Cursor metadata, when the statement declares a cursor
    pub cursor: Option<CursorInfo>,
    /// Plans of functions and procedures invoked by this statement
    pub function_plans: Vec<FunctionPlan>,
    /// Operator tree; `None` only for statements built outside the parser
    pub tree: Option<PlanTree>,
}

impl Statement {
    /// Creates an empty statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operator tree
    pub fn with_tree(mut self, tree: PlanTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Sets the statement text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.statement_text = Some(text.into());
        self
    }

    /// Adds a missing-index suggestion
    pub fn with_missing_index(mut self, index: MissingIndex) -> Self {
        self.missing_indexes.push(index);
        self
    }

    /// Returns the root operator, if any
    pub fn root(&self) -> Option<&PlanNode> {
        self.tree.as_ref().map(|t| t.root())
    }

    /// Number of operators in the statement's tree
    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.len())
    }

    /// Returns true if any operator carries runtime counters
    pub fn has_actual_stats(&self) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|t| t.iter().any(|n| n.has_actual_stats()))
    }

    /// Returns the first `max_chars` characters of the statement text on one line
    pub fn text_preview(&self, max_chars: usize) -> String {
        let text = self.statement_text.as_deref().unwrap_or_default();
        let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flattened.chars().count() <= max_chars {
            flattened
        } else {
            let mut preview: String = flattened.chars().take(max_chars).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Compile-time figures from the `QueryPlan` element
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompileMetrics {
    pub cached_plan_size_kb: Option<u64>,
    pub compile_time_ms: Option<u64>,
    pub compile_cpu_ms: Option<u64>,
    pub compile_memory_kb: Option<u64>,
    /// Granted memory reported on the `QueryPlan` element itself
    pub memory_grant_kb: Option<u64>,
    /// Why the optimizer produced a serial plan
    pub non_parallel_plan_reason: Option<String>,
}

/// Statement memory grant summary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryGrantInfo {
    pub serial_required_memory_kb: Option<u64>,
    pub serial_desired_memory_kb: Option<u64>,
    pub required_memory_kb: Option<u64>,
    pub desired_memory_kb: Option<u64>,
    pub requested_memory_kb: Option<u64>,
    pub granted_memory_kb: Option<u64>,
    pub max_used_memory_kb: Option<u64>,
    pub max_query_memory_kb: Option<u64>,
    pub grant_wait_time_ms: Option<u64>,
    /// Memory grant feedback state, as reported
    pub feedback_adjusted: Option<String>,
}

impl MemoryGrantInfo {
    /// Granted memory that was never used, when both figures are known
    pub fn unused_memory_kb(&self) -> Option<u64> {
        match (self.granted_memory_kb, self.max_used_memory_kb) {
            (Some(granted), Some(used)) => Some(granted.saturating_sub(used)),
            _ => None,
        }
    }
}

/// Hardware figures the optimizer assumed at compile time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerHardwareProperties {
    pub estimated_available_memory_grant_kb: Option<u64>,
    pub estimated_pages_cached: Option<u64>,
    pub estimated_available_degree_of_parallelism: Option<u32>,
    pub max_compile_memory_kb: Option<u64>,
}

/// A statement parameter and the values it was compiled and run with
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub data_type: Option<String>,
    /// Value the plan was compiled for (sniffed value)
    pub compiled_value: Option<String>,
    /// Value supplied at execution
    pub runtime_value: Option<String>,
}

impl Parameter {
    /// Returns true when the compiled and runtime values are both known and differ
    pub fn is_sniffing_mismatch(&self) -> bool {
        matches!(
            (&self.compiled_value, &self.runtime_value),
            (Some(compiled), Some(runtime)) if compiled != runtime
        )
    }
}

/// A statistics object loaded by the optimizer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatisticsInfo {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub statistics: Option<String>,
    pub modification_count: Option<u64>,
    pub sampling_percent: Option<f64>,
    pub last_update: Option<String>,
}

/// A trace flag active for the statement
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceFlag {
    pub value: u32,
    /// `Global` or `Session`
    pub scope: Option<String>,
    /// True if the flag was in effect at compile time rather than execution
    pub is_compile_time: bool,
}

/// One wait type recorded while the statement ran
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaitStat {
    pub wait_type: String,
    pub wait_time_ms: u64,
    pub wait_count: u64,
}

/// Statement CPU and elapsed time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryTimeStats {
    pub cpu_time_ms: u64,
    pub elapsed_time_ms: u64,
    pub udf_cpu_time_ms: Option<u64>,
    pub udf_elapsed_time_ms: Option<u64>,
}

/// Parallel thread usage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThreadStat {
    /// Number of parallel branches
    pub branches: u32,
    pub used_threads: Option<u32>,
    pub reservations: Vec<ThreadReservation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThreadReservation {
    pub node_id: Option<i32>,
    pub reserved_threads: u32,
}

/// Cursor metadata for `StmtCursor` statements
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CursorInfo {
    pub name: Option<String>,
    pub actual_type: Option<String>,
    pub requested_type: Option<String>,
    pub concurrency: Option<String>,
    pub forward_only: bool,
    /// Cursor operation types (`FetchQuery`, `PopulateQuery`, ...) in document order
    pub operations: Vec<String>,
}

/// Kind of routine a function plan belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// User-defined function (`UDF` element)
    Udf,
    /// Stored procedure (`StoredProc` element)
    StoredProcedure,
}

/// The plan of a function or procedure invoked by a statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionPlan {
    pub name: String,
    pub kind: FunctionKind,
    /// CLR function (no T-SQL plan of its own)
    pub is_clr: bool,
    pub statements: Vec<Statement>,
    pub skipped_statements: usize,
}

/// A missing-index suggestion
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MissingIndex {
    pub database: String,
    pub schema: String,
    pub table: String,
    /// Estimated improvement in percent
    pub impact: f64,
    pub equality_columns: Vec<String>,
    pub inequality_columns: Vec<String>,
    pub include_columns: Vec<String>,
    /// Synthesized `CREATE INDEX` statement
    pub create_statement: String,
}

/// Warning severity
///
/// Ordering puts the most severe level first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Returns true if this is a critical issue
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// Returns true if this is at least a warning
    pub fn is_warning_or_above(&self) -> bool {
        matches!(self, Self::Critical | Self::Warning)
    }

    /// Returns the severity level as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// What kind of operator spilled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpillKind {
    /// `SpillToTempDb` with no operator-specific details
    TempDb,
    Sort,
    Hash,
    Exchange,
}

/// Structured detail of a spill warning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpillDetail {
    pub kind: SpillKind,
    pub spill_level: Option<u32>,
    pub spilled_thread_count: Option<u32>,
    pub granted_memory_kb: Option<u64>,
    pub used_memory_kb: Option<u64>,
    /// Pages written to tempdb
    pub writes_to_tempdb: u64,
    /// Pages read back from tempdb
    pub reads_from_tempdb: u64,
}

impl SpillDetail {
    pub fn new(kind: SpillKind) -> Self {
        Self {
            kind,
            spill_level: None,
            spilled_thread_count: None,
            granted_memory_kb: None,
            used_memory_kb: None,
            writes_to_tempdb: 0,
            reads_from_tempdb: 0,
        }
    }
}

/// A warning attached to a statement or operator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanWarning {
    /// Warning type, e.g. `NoJoinPredicate` or `SortSpillDetails`
    pub warning_type: String,
    /// Human-readable message
    pub message: String,
    pub severity: Severity,
    /// Present for spill warnings
    pub spill: Option<SpillDetail>,
}

impl PlanWarning {
    /// Creates a warning with the given severity and no spill detail
    pub fn new(
        warning_type: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            warning_type: warning_type.into(),
            message: message.into(),
            severity,
            spill: None,
        }
    }

    /// Attaches spill detail
    pub fn with_spill(mut self, spill: SpillDetail) -> Self {
        self.spill = Some(spill);
        self
    }
}

/// Position of a node inside its statement's [`PlanTree`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(pub usize);

/// Arena holding one statement's operator tree. The root is always at index 0.
///
/// Deserialization replays the nodes through [`PlanTree::push_child`] and
/// rejects any input whose parent and child links it would not reproduce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawPlanTree")]
pub struct PlanTree {
    nodes: Vec<PlanNode>,
}

/// Structural defect in a serialized [`PlanTree`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanTreeError {
    #[error("plan tree has no nodes")]
    Empty,

    #[error("node at position {position} records index {recorded}")]
    MisplacedNode { position: usize, recorded: usize },

    #[error("root node has a parent")]
    RootHasParent,

    #[error("node {0} has no parent, or its parent does not precede it")]
    InvalidParent(usize),

    #[error("children of node {0} do not match the parent links")]
    ChildrenMismatch(usize),
}

#[derive(Deserialize)]
struct RawPlanTree {
    nodes: Vec<PlanNode>,
}

impl TryFrom<RawPlanTree> for PlanTree {
    type Error = PlanTreeError;

    fn try_from(raw: RawPlanTree) -> Result<Self, Self::Error> {
        let declared_children: Vec<Vec<NodeIndex>> =
            raw.nodes.iter().map(|n| n.children.clone()).collect();
        let mut nodes = raw.nodes.into_iter().enumerate();

        let Some((_, root)) = nodes.next() else {
            return Err(PlanTreeError::Empty);
        };
        if root.index != Self::ROOT {
            return Err(PlanTreeError::MisplacedNode {
                position: 0,
                recorded: root.index.0,
            });
        }
        if root.parent.is_some() {
            return Err(PlanTreeError::RootHasParent);
        }

        // push_child only appends, so a parent always sits before its children
        let mut tree = PlanTree::new(root);
        for (position, node) in nodes {
            if node.index.0 != position {
                return Err(PlanTreeError::MisplacedNode {
                    position,
                    recorded: node.index.0,
                });
            }
            match node.parent {
                Some(parent) if parent.0 < position => {
                    tree.push_child(parent, node);
                }
                _ => return Err(PlanTreeError::InvalidParent(position)),
            }
        }

        for (position, declared) in declared_children.iter().enumerate() {
            if tree.nodes[position].children != *declared {
                return Err(PlanTreeError::ChildrenMismatch(position));
            }
        }
        Ok(tree)
    }
}

impl PlanTree {
    /// Index of the root node
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Creates a tree holding only `root`
    pub fn new(mut root: PlanNode) -> Self {
        root.index = Self::ROOT;
        root.parent = None;
        root.children.clear();
        Self { nodes: vec![root] }
    }

    /// Appends `node` as the last child of `parent` and returns its index.
    ///
    /// This is the only way nodes enter a tree, so every node except the root
    /// has exactly one parent and appears once in that parent's children.
    ///
    /// # Panics
    /// Panics if `parent` is not an index of this tree.
    pub fn push_child(&mut self, parent: NodeIndex, mut node: PlanNode) -> NodeIndex {
        assert!(parent.0 < self.nodes.len(), "parent index out of bounds");
        let index = NodeIndex(self.nodes.len());
        node.index = index;
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(index);
        index
    }

    /// Returns the root node
    pub fn root(&self) -> &PlanNode {
        &self.nodes[Self::ROOT.0]
    }

    /// Returns the node at `index`, if it exists
    pub fn get(&self, index: NodeIndex) -> Option<&PlanNode> {
        self.nodes.get(index.0)
    }

    /// Returns a mutable reference to the node at `index`, if it exists
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut PlanNode> {
        self.nodes.get_mut(index.0)
    }

    /// Number of nodes in the tree (never zero)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in arena order
    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    /// All nodes in arena order, mutably. Structure cannot change through this.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut PlanNode> {
        self.nodes.iter_mut()
    }

    /// Depth-first, pre-order traversal starting at the root
    pub fn iter(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(self)
    }

    /// Children of `index` in source order
    pub fn children_of(&self, index: NodeIndex) -> impl Iterator<Item = &PlanNode> {
        self.nodes[index.0]
            .children
            .iter()
            .map(move |child| &self.nodes[child.0])
    }

    /// Parent of `index`, `None` for the root
    pub fn parent_of(&self, index: NodeIndex) -> Option<&PlanNode> {
        self.nodes[index.0].parent.map(|p| &self.nodes[p.0])
    }

    /// Number of edges between `index` and the root
    pub fn depth_of(&self, index: NodeIndex) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[index.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Finds a node by its showplan `NodeId`
    pub fn find_by_node_id(&self, node_id: i32) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Nodes that have no children
    pub fn leaves(&self) -> impl Iterator<Item = &PlanNode> {
        self.iter().filter(|n| n.is_leaf())
    }

    /// Returns the maximum depth of the tree (a lone root has depth 1)
    pub fn max_depth(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| self.depth_of(n.index) + 1)
            .max()
            .unwrap_or(0)
    }
}

impl std::ops::Index<NodeIndex> for PlanTree {
    type Output = PlanNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl std::ops::IndexMut<NodeIndex> for PlanTree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

/// The object an operator reads or writes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectRef {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub index: Option<String>,
    pub alias: Option<String>,
    /// `Clustered`, `NonClustered`, `Heap`, ...
    pub index_kind: Option<String>,
    /// `RowStore`, `ColumnStore`, `MemoryOptimized`
    pub storage: Option<String>,
}

impl ObjectRef {
    /// Short name shown under the operator: `table.index alias`
    pub fn display_name(&self) -> String {
        let mut name = String::new();
        if let Some(table) = &self.table {
            name.push_str(table);
        }
        if let Some(index) = &self.index {
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(index);
        }
        if let Some(alias) = &self.alias {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(alias);
        }
        name
    }

    /// Fully qualified `database.schema.table` name
    pub fn qualified_table(&self) -> String {
        [&self.database, &self.schema, &self.table]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Sort key of a sort or ordered operator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SortColumn {
    pub column: String,
    pub ascending: bool,
}

/// Fraction of the statement's memory grant an operator may use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryFractions {
    pub input: f64,
    pub output: f64,
}

/// Runtime counters reported for one thread of one operator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThreadCounters {
    pub thread: u32,
    pub actual_rows: u64,
    pub actual_rows_read: Option<u64>,
    pub actual_executions: u64,
    pub actual_rebinds: Option<u64>,
    pub actual_rewinds: Option<u64>,
    pub actual_end_of_scans: Option<u64>,
    pub actual_elapsed_ms: Option<u64>,
    pub actual_cpu_ms: Option<u64>,
    pub actual_scans: Option<u64>,
    pub logical_reads: Option<u64>,
    pub physical_reads: Option<u64>,
    pub read_aheads: Option<u64>,
    pub lob_logical_reads: Option<u64>,
    pub lob_physical_reads: Option<u64>,
    /// `Row` or `Batch`
    pub execution_mode: Option<String>,
    pub input_memory_grant_kb: Option<u64>,
    pub output_memory_grant_kb: Option<u64>,
    pub used_memory_grant_kb: Option<u64>,
}

/// Runtime counters summed over all threads of an operator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActualStats {
    pub actual_rows: u64,
    pub actual_rows_read: Option<u64>,
    pub actual_executions: u64,
    pub actual_rebinds: Option<u64>,
    pub actual_rewinds: Option<u64>,
    pub actual_end_of_scans: Option<u64>,
    /// Longest elapsed time of any thread
    pub actual_elapsed_ms: Option<u64>,
    /// CPU time summed over threads
    pub actual_cpu_ms: Option<u64>,
    pub actual_scans: Option<u64>,
    pub logical_reads: Option<u64>,
    pub physical_reads: Option<u64>,
    pub read_aheads: Option<u64>,
    pub lob_logical_reads: Option<u64>,
    pub lob_physical_reads: Option<u64>,
    pub execution_mode: Option<String>,
    pub granted_memory_kb: Option<u64>,
    pub used_memory_kb: Option<u64>,
    /// Number of threads that reported counters
    pub thread_count: usize,
}

impl ActualStats {
    /// Aggregates per-thread counters. Returns `None` when there are no threads.
    pub fn from_threads(threads: &[ThreadCounters]) -> Option<Self> {
        if threads.is_empty() {
            return None;
        }

        fn sum(
            threads: &[ThreadCounters],
            f: impl Fn(&ThreadCounters) -> Option<u64>,
        ) -> Option<u64> {
            threads.iter().filter_map(f).reduce(|a, b| a.saturating_add(b))
        }

        Some(Self {
            actual_rows: threads.iter().map(|t| t.actual_rows).sum(),
            actual_rows_read: sum(threads, |t| t.actual_rows_read),
            actual_executions: threads.iter().map(|t| t.actual_executions).sum(),
            actual_rebinds: sum(threads, |t| t.actual_rebinds),
            actual_rewinds: sum(threads, |t| t.actual_rewinds),
            actual_end_of_scans: sum(threads, |t| t.actual_end_of_scans),
            actual_elapsed_ms: threads.iter().filter_map(|t| t.actual_elapsed_ms).max(),
            actual_cpu_ms: sum(threads, |t| t.actual_cpu_ms),
            actual_scans: sum(threads, |t| t.actual_scans),
            logical_reads: sum(threads, |t| t.logical_reads),
            physical_reads: sum(threads, |t| t.physical_reads),
            read_aheads: sum(threads, |t| t.read_aheads),
            lob_logical_reads: sum(threads, |t| t.lob_logical_reads),
            lob_physical_reads: sum(threads, |t| t.lob_physical_reads),
            execution_mode: threads.iter().find_map(|t| t.execution_mode.clone()),
            granted_memory_kb: sum(threads, |t| {
                match (t.input_memory_grant_kb, t.output_memory_grant_kb) {
                    (None, None) => None,
                    (input, output) => Some(input.unwrap_or(0) + output.unwrap_or(0)),
                }
            }),
            used_memory_kb: sum(threads, |t| t.used_memory_grant_kb),
            thread_count: threads.len(),
        })
    }
}

/// A single operator in the plan tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanNode {
    index: NodeIndex,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,

    /// Showplan `NodeId`, unique within the statement
    pub node_id: i32,
    /// Physical operator, e.g. `Clustered Index Seek`
    pub physical_op: String,
    /// Logical operator, e.g. `Inner Join`
    pub logical_op: String,
    /// Name of the operator-specific element (`IndexScan`, `Hash`, ...)
    pub operator_element: Option<String>,

    // Estimates
    pub estimate_rows: f64,
    pub estimate_io: f64,
    pub estimate_cpu: f64,
    pub avg_row_size: f64,
    /// Cost of this operator and everything beneath it
    pub estimated_subtree_cost: f64,
    pub estimate_rebinds: f64,
    pub estimate_rewinds: f64,
    pub estimated_rows_read: Option<f64>,
    pub table_cardinality: Option<f64>,
    /// `Row` or `Batch`
    pub estimated_execution_mode: Option<String>,

    pub parallel: bool,
    pub partitioned: bool,
    /// Adaptive join
    pub is_adaptive: bool,
    pub adaptive_threshold_rows: Option<f64>,
    pub estimated_join_type: Option<String>,

    // Access details
    pub object: Option<ObjectRef>,
    pub ordered: Option<bool>,
    pub scan_direction: Option<String>,
    pub forced_index: bool,
    pub force_seek: bool,

    // Predicates and keys
    pub predicate: Option<String>,
    pub seek_predicate: Option<String>,
    pub probe_residual: Option<String>,
    pub hash_keys_build: Vec<String>,
    pub hash_keys_probe: Vec<String>,
    pub order_by: Vec<SortColumn>,
    pub output_columns: Vec<String>,

    pub memory_fractions: Option<MemoryFractions>,
    pub warnings: Vec<PlanWarning>,

    /// Aggregated runtime counters; present only when the plan was captured with them
    pub actual: Option<ActualStats>,
    /// Per-thread runtime counters
    pub threads: Vec<ThreadCounters>,

    /// Share of the statement's root subtree cost, 0..=100
    pub cost_percent: u8,
    /// True when `cost_percent` reaches the expensive threshold
    pub is_expensive: bool,

    /// Layout position (left edge)
    pub x: f64,
    /// Layout position (top edge)
    pub y: f64,
}

impl PlanNode {
    /// Creates a node with the given physical and logical operators
    pub fn new(physical_op: impl Into<String>, logical_op: impl Into<String>) -> Self {
        Self {
            physical_op: physical_op.into(),
            logical_op: logical_op.into(),
            ..Self::default()
        }
    }

    /// Sets the showplan node id
    pub fn with_node_id(mut self, node_id: i32) -> Self {
        self.node_id = node_id;
        self
    }

    /// Sets the estimated subtree cost
    pub fn with_subtree_cost(mut self, cost: f64) -> Self {
        self.estimated_subtree_cost = cost;
        self
    }

    /// Sets the estimated rows
    pub fn with_rows(mut self, rows: f64) -> Self {
        self.estimate_rows = rows;
        self
    }

    /// Sets the accessed object
    pub fn with_object(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }

    /// Sets per-thread runtime counters and their aggregate
    pub fn with_threads(mut self, threads: Vec<ThreadCounters>) -> Self {
        self.actual = ActualStats::from_threads(&threads);
        self.threads = threads;
        self
    }

    /// Adds a warning
    pub fn with_warning(mut self, warning: PlanWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Sets the predicate text
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Position of this node in its tree
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Parent position, `None` for the root
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Child positions in source order
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Returns true if this is a leaf node (no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if runtime counters were captured for this operator
    pub fn has_actual_stats(&self) -> bool {
        self.actual.is_some()
    }

    /// Name of the accessed object, empty when the operator touches none
    pub fn object_name(&self) -> String {
        self.object
            .as_ref()
            .map(ObjectRef::display_name)
            .unwrap_or_default()
    }

    /// Operator label: physical operator, with the logical one when it differs
    pub fn display_name(&self) -> String {
        if self.logical_op.is_empty() || self.logical_op == self.physical_op {
            self.physical_op.clone()
        } else {
            format!("{} ({})", self.physical_op, self.logical_op)
        }
    }

    /// Estimated IO plus CPU cost of this operator alone
    pub fn operator_cost(&self) -> f64 {
        self.estimate_io + self.estimate_cpu
    }
}

/// Iterator for traversing a [`PlanTree`] depth-first in pre-order
pub struct PlanNodeIterator<'a> {
    tree: &'a PlanTree,
    stack: Vec<NodeIndex>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(tree: &'a PlanTree) -> Self {
        Self {
            tree,
            stack: vec![PlanTree::ROOT],
        }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree.nodes[index.0];
        // Push children in reverse order so we visit them in order
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

#[cfg(test)]
mod tests;
