//! Operator (`RelOp`) extraction
//!
//! Builds a statement's `PlanTree` from its root `RelOp`. Child operators are
//! the nearest `RelOp` descendants of the operator-specific element, taken in
//! document order. Traversal uses an explicit stack so very deep plans do not
//! grow the call stack.

use std::collections::HashSet;

use roxmltree::Node;

use super::warnings::parse_warnings;
use super::xml::{
    attr, attr_bool, attr_f64, attr_flag, attr_i32, attr_string, attr_u32, attr_u64, child,
    children_named, column_list, column_name, elements, is_element_named, scalar_string,
};
use crate::analysis::costs::annotate_costs;
use crate::showplan::model::{
    MemoryFractions, ObjectRef, PlanNode, PlanTree, SortColumn, ThreadCounters,
};

const RELOP: &str = "RelOp";

/// `RelOp` children that describe the operator rather than being the
/// operator-specific element
const RELOP_METADATA_ELEMENTS: &[&str] = &[
    "OutputList",
    "Warnings",
    "MemoryFractions",
    "RunTimeInformation",
    "RunTimePartitionSummary",
    "InternalInfo",
];

/// Hands out node ids, replacing missing or repeated `NodeId` attributes with
/// ids above every id present in the tree
struct NodeIdAllocator {
    seen: HashSet<i32>,
    next_free: i32,
}

impl NodeIdAllocator {
    fn for_tree(root: Node<'_, '_>) -> Self {
        let max_id = root
            .descendants()
            .filter(|n| is_element_named(*n, RELOP))
            .filter_map(|n| attr_i32(n, "NodeId"))
            .max()
            .unwrap_or(-1);
        Self {
            seen: HashSet::new(),
            next_free: max_id.saturating_add(1),
        }
    }

    fn assign(&mut self, declared: Option<i32>) -> i32 {
        if let Some(id) = declared
            && self.seen.insert(id)
        {
            return id;
        }
        let id = self.next_free;
        self.next_free = self.next_free.saturating_add(1);
        self.seen.insert(id);
        tracing::debug!(declared = ?declared, assigned = id, "re-assigned operator node id");
        id
    }
}

/// Builds the operator tree rooted at `root_relop` and annotates its costs
pub(super) fn build_tree(root_relop: Node<'_, '_>) -> PlanTree {
    let mut ids = NodeIdAllocator::for_tree(root_relop);
    let mut tree = PlanTree::new(parse_relop(root_relop, &mut ids));

    // Popping in reverse-pushed order visits operators in pre-order, so the
    // arena order matches document order.
    let mut pending: Vec<_> = child_relops(root_relop)
        .into_iter()
        .rev()
        .map(|el| (PlanTree::ROOT, el))
        .collect();
    while let Some((parent, element)) = pending.pop() {
        let index = tree.push_child(parent, parse_relop(element, &mut ids));
        pending.extend(
            child_relops(element)
                .into_iter()
                .rev()
                .map(|el| (index, el)),
        );
    }

    annotate_costs(&mut tree);
    tracing::trace!(nodes = tree.len(), "built operator tree");
    tree
}

/// Nearest `RelOp` descendants of `relop`, in document order
fn child_relops<'a, 'input>(relop: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    fn collect<'a, 'input>(node: Node<'a, 'input>, out: &mut Vec<Node<'a, 'input>>) {
        for element in elements(node) {
            if is_element_named(element, RELOP) {
                out.push(element);
            } else {
                collect(element, out);
            }
        }
    }

    let mut found = Vec::new();
    collect(relop, &mut found);
    found
}

/// The operator-specific child of a `RelOp` (`IndexScan`, `Hash`, ...)
fn operator_element<'a, 'input>(relop: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    elements(relop).find(|e| {
        let name = e.tag_name().name();
        !RELOP_METADATA_ELEMENTS.iter().any(|m| *m == name)
    })
}

fn parse_relop(relop: Node<'_, '_>, ids: &mut NodeIdAllocator) -> PlanNode {
    let mut node = PlanNode::new(
        attr(relop, "PhysicalOp").unwrap_or_default(),
        attr(relop, "LogicalOp").unwrap_or_default(),
    );
    node.node_id = ids.assign(attr_i32(relop, "NodeId"));

    node.estimate_rows = attr_f64(relop, "EstimateRows").unwrap_or(0.0);
    node.estimate_io = attr_f64(relop, "EstimateIO").unwrap_or(0.0);
    node.estimate_cpu = attr_f64(relop, "EstimateCPU").unwrap_or(0.0);
    node.avg_row_size = attr_f64(relop, "AvgRowSize").unwrap_or(0.0);
    node.estimated_subtree_cost = attr_f64(relop, "EstimatedTotalSubtreeCost").unwrap_or(0.0);
    node.estimate_rebinds = attr_f64(relop, "EstimateRebinds").unwrap_or(0.0);
    node.estimate_rewinds = attr_f64(relop, "EstimateRewinds").unwrap_or(0.0);
    node.estimated_rows_read = attr_f64(relop, "EstimatedRowsRead");
    node.table_cardinality = attr_f64(relop, "TableCardinality");
    node.estimated_execution_mode = attr_string(relop, "EstimatedExecutionMode");

    node.parallel = attr_flag(relop, "Parallel");
    node.partitioned = attr_flag(relop, "Partitioned");
    node.is_adaptive = attr_flag(relop, "IsAdaptive");
    node.adaptive_threshold_rows = attr_f64(relop, "AdaptiveThresholdRows");
    node.estimated_join_type = attr_string(relop, "EstimatedJoinType");

    if let Some(output) = child(relop, "OutputList") {
        node.output_columns = column_list(output);
    }

    if let Some(fractions) = child(relop, "MemoryFractions") {
        node.memory_fractions = Some(MemoryFractions {
            input: attr_f64(fractions, "Input").unwrap_or(0.0),
            output: attr_f64(fractions, "Output").unwrap_or(0.0),
        });
    }

    if let Some(warnings) = child(relop, "Warnings") {
        node.warnings = parse_warnings(warnings);
    }

    if let Some(runtime) = child(relop, "RunTimeInformation") {
        let threads: Vec<_> = children_named(runtime, "RunTimeCountersPerThread")
            .map(parse_thread_counters)
            .collect();
        node = node.with_threads(threads);
    }

    if let Some(op) = operator_element(relop) {
        parse_operator_details(op, &mut node);
    }

    tracing::trace!(
        node_id = node.node_id,
        physical_op = %node.physical_op,
        "parsed operator"
    );
    node
}

fn parse_operator_details(op: Node<'_, '_>, node: &mut PlanNode) {
    node.operator_element = Some(op.tag_name().name().to_string());

    if let Some(object) = child(op, "Object") {
        node.object = Some(parse_object(object));
    }

    node.ordered = attr_bool(op, "Ordered");
    node.scan_direction = attr_string(op, "ScanDirection");
    node.forced_index = attr_flag(op, "ForcedIndex");
    node.force_seek = attr_flag(op, "ForceSeek");

    if let Some(predicate) = child(op, "Predicate") {
        node.predicate = scalar_string(predicate);
    }

    if let Some(seek) = child(op, "SeekPredicates") {
        node.seek_predicate = seek_predicate_text(seek);
    }

    // Hash joins carry a probe residual, merge joins a residual
    if let Some(residual) = child(op, "ProbeResidual").or_else(|| child(op, "Residual")) {
        node.probe_residual = scalar_string(residual);
    }

    if let Some(build) = child(op, "HashKeysBuild") {
        node.hash_keys_build = column_list(build);
    }
    if let Some(probe) = child(op, "HashKeysProbe") {
        node.hash_keys_probe = column_list(probe);
    }

    if let Some(order_by) = child(op, "OrderBy") {
        node.order_by = children_named(order_by, "OrderByColumn")
            .map(|col| SortColumn {
                column: child(col, "ColumnReference")
                    .map(column_name)
                    .unwrap_or_default(),
                ascending: attr_bool(col, "Ascending").unwrap_or(true),
            })
            .collect();
    }
}

fn parse_object(object: Node<'_, '_>) -> ObjectRef {
    ObjectRef {
        database: attr_string(object, "Database"),
        schema: attr_string(object, "Schema"),
        table: attr_string(object, "Table"),
        index: attr_string(object, "Index"),
        alias: attr_string(object, "Alias"),
        index_kind: attr_string(object, "IndexKind"),
        storage: attr_string(object, "Storage"),
    }
}

fn parse_thread_counters(counters: Node<'_, '_>) -> ThreadCounters {
    ThreadCounters {
        thread: attr_u32(counters, "Thread").unwrap_or(0),
        actual_rows: attr_u64(counters, "ActualRows").unwrap_or(0),
        actual_rows_read: attr_u64(counters, "ActualRowsRead"),
        actual_executions: attr_u64(counters, "ActualExecutions").unwrap_or(0),
        actual_rebinds: attr_u64(counters, "ActualRebinds"),
        actual_rewinds: attr_u64(counters, "ActualRewinds"),
        actual_end_of_scans: attr_u64(counters, "ActualEndOfScans"),
        actual_elapsed_ms: attr_u64(counters, "ActualElapsedms"),
        actual_cpu_ms: attr_u64(counters, "ActualCPUms"),
        actual_scans: attr_u64(counters, "ActualScans"),
        logical_reads: attr_u64(counters, "ActualLogicalReads"),
        physical_reads: attr_u64(counters, "ActualPhysicalReads"),
        read_aheads: attr_u64(counters, "ActualReadAheads"),
        lob_logical_reads: attr_u64(counters, "ActualLobLogicalReads"),
        lob_physical_reads: attr_u64(counters, "ActualLobPhysicalReads"),
        execution_mode: attr_string(counters, "ActualExecutionMode"),
        input_memory_grant_kb: attr_u64(counters, "InputMemoryGrant"),
        output_memory_grant_kb: attr_u64(counters, "OutputMemoryGrant"),
        used_memory_grant_kb: attr_u64(counters, "UsedMemoryGrant"),
    }
}

const RANGE_ELEMENTS: &[(&str, &str)] = &[
    ("Prefix", "Prefix"),
    ("StartRange", "Start"),
    ("EndRange", "End"),
];

/// Renders seek keys as `Seek Keys[1]: Prefix: col = expr, Start: ...`.
///
/// Handles both the older `SeekPredicate/Prefix` shape and the newer
/// `SeekPredicateNew/SeekKeys/Prefix` one: any element directly holding a
/// range element is treated as one key group.
fn seek_predicate_text(seek_predicates: Node<'_, '_>) -> Option<String> {
    let groups: Vec<String> = seek_predicates
        .descendants()
        .filter(|d| {
            d.is_element()
                && elements(*d).any(|c| RANGE_ELEMENTS.iter().any(|(n, _)| is_element_named(c, n)))
        })
        .enumerate()
        .map(|(i, group)| {
            let ranges: Vec<String> = elements(group)
                .filter_map(|range| {
                    let (_, label) = RANGE_ELEMENTS
                        .iter()
                        .find(|(n, _)| is_element_named(range, n))?;
                    Some(format!("{label}: {}", range_text(range)))
                })
                .collect();
            format!("Seek Keys[{}]: {}", i + 1, ranges.join(", "))
        })
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(groups.join("; "))
    }
}

fn range_text(range: Node<'_, '_>) -> String {
    let columns = child(range, "RangeColumns")
        .map(column_list)
        .unwrap_or_default()
        .join(", ");
    let expressions = child(range, "RangeExpressions")
        .map(|exprs| {
            children_named(exprs, "ScalarOperator")
                .filter_map(|s| attr_string(s, "ScalarString"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let comparison = match attr(range, "ScanType").unwrap_or("EQ") {
        "EQ" => "=",
        "GT" => ">",
        "GE" => ">=",
        "LT" => "<",
        "LE" => "<=",
        "NE" => "<>",
        other => other,
    };
    if expressions.is_empty() {
        format!("{columns} {comparison}")
    } else {
        format!("{columns} {comparison} {expressions}")
    }
}
