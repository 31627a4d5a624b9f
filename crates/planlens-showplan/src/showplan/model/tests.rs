//! Tests for the Showplan Model

use super::*;
use pretty_assertions::assert_eq;

fn orders_object() -> ObjectRef {
    ObjectRef {
        database: Some("[Sales]".into()),
        schema: Some("[dbo]".into()),
        table: Some("[Orders]".into()),
        index: Some("[PK_Orders]".into()),
        alias: Some("[o]".into()),
        ..ObjectRef::default()
    }
}

/// ```text
///       Nested Loops (0)
///      /               \
///   Sort (1)       Index Seek (2)
///     |
///   Table Scan (3)
/// ```
fn sample_tree() -> PlanTree {
    let mut tree = PlanTree::new(
        PlanNode::new("Nested Loops", "Inner Join")
            .with_node_id(0)
            .with_subtree_cost(2.0),
    );
    let sort = tree.push_child(PlanTree::ROOT, PlanNode::new("Sort", "Sort").with_node_id(1));
    tree.push_child(
        PlanTree::ROOT,
        PlanNode::new("Index Seek", "Index Seek").with_node_id(2),
    );
    tree.push_child(
        sort,
        PlanNode::new("Table Scan", "Table Scan")
            .with_node_id(3)
            .with_object(orders_object()),
    );
    tree
}

#[test]
fn test_push_child_links_both_directions() {
    let tree = sample_tree();

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.root().parent(), None);
    for node in tree.nodes() {
        if let Some(parent) = node.parent() {
            let occurrences = tree[parent]
                .children()
                .iter()
                .filter(|c| **c == node.index())
                .count();
            assert_eq!(occurrences, 1);
        }
    }
}

#[test]
fn test_new_tree_resets_structure_of_root() {
    let mut tree = sample_tree();
    let detached = tree[NodeIndex(1)].clone();
    assert!(!detached.children().is_empty());

    let fresh = PlanTree::new(detached);
    assert_eq!(fresh.len(), 1);
    assert!(fresh.root().is_leaf());
    assert_eq!(fresh.root().index(), PlanTree::ROOT);

    // Mutating through the arena does not touch structure
    tree[NodeIndex(3)].cost_percent = 7;
    assert_eq!(tree.parent_of(NodeIndex(3)).unwrap().node_id, 1);
}

#[test]
#[should_panic(expected = "parent index out of bounds")]
fn test_push_child_rejects_unknown_parent() {
    let mut tree = sample_tree();
    tree.push_child(NodeIndex(99), PlanNode::new("Filter", "Filter"));
}

#[test]
fn test_traversal_is_pre_order() {
    let tree = sample_tree();
    let ids: Vec<i32> = tree.iter().map(|n| n.node_id).collect();
    assert_eq!(ids, vec![0, 1, 3, 2]);

    let children: Vec<i32> = tree.children_of(PlanTree::ROOT).map(|n| n.node_id).collect();
    assert_eq!(children, vec![1, 2]);
}

#[test]
fn test_depth_and_leaves() {
    let tree = sample_tree();
    assert_eq!(tree.depth_of(PlanTree::ROOT), 0);
    assert_eq!(tree.depth_of(NodeIndex(3)), 2);
    assert_eq!(tree.max_depth(), 3);

    let leaves: Vec<i32> = tree.leaves().map(|n| n.node_id).collect();
    assert_eq!(leaves, vec![3, 2]);
}

#[test]
fn test_find_by_node_id() {
    let tree = sample_tree();
    assert_eq!(tree.find_by_node_id(2).unwrap().physical_op, "Index Seek");
    assert!(tree.find_by_node_id(42).is_none());
    assert!(tree.get(NodeIndex(4)).is_none());
}

#[test]
fn test_display_names() {
    let join = PlanNode::new("Hash Match", "Inner Join");
    assert_eq!(join.display_name(), "Hash Match (Inner Join)");

    let scan = PlanNode::new("Table Scan", "Table Scan");
    assert_eq!(scan.display_name(), "Table Scan");
    assert_eq!(scan.object_name(), "");

    let object = orders_object();
    assert_eq!(object.display_name(), "[Orders].[PK_Orders] [o]");
    assert_eq!(object.qualified_table(), "[Sales].[dbo].[Orders]");
}

#[test]
fn test_actual_stats_aggregate_threads() {
    let node = PlanNode::new("Parallelism", "Gather Streams").with_threads(vec![
        ThreadCounters {
            thread: 1,
            actual_rows: 600,
            actual_executions: 1,
            actual_elapsed_ms: Some(40),
            actual_cpu_ms: Some(30),
            logical_reads: Some(10),
            input_memory_grant_kb: Some(512),
            ..ThreadCounters::default()
        },
        ThreadCounters {
            thread: 2,
            actual_rows: 400,
            actual_executions: 1,
            actual_elapsed_ms: Some(55),
            actual_cpu_ms: Some(35),
            input_memory_grant_kb: Some(256),
            output_memory_grant_kb: Some(64),
            ..ThreadCounters::default()
        },
    ]);

    assert!(node.has_actual_stats());
    let actual = node.actual.unwrap();
    assert_eq!(actual.actual_rows, 1000);
    assert_eq!(actual.actual_executions, 2);
    assert_eq!(actual.actual_elapsed_ms, Some(55));
    assert_eq!(actual.actual_cpu_ms, Some(65));
    assert_eq!(actual.logical_reads, Some(10));
    assert_eq!(actual.physical_reads, None);
    assert_eq!(actual.granted_memory_kb, Some(832));
    assert_eq!(actual.thread_count, 2);
}

#[test]
fn test_no_threads_means_no_actual_stats() {
    assert_eq!(ActualStats::from_threads(&[]), None);
    assert!(!PlanNode::new("Sort", "Sort").with_threads(Vec::new()).has_actual_stats());
}

#[test]
fn test_statement_helpers() {
    let statement = Statement::new()
        .with_text("SELECT *\n  FROM   dbo.Orders\n WHERE OrderID = 1")
        .with_tree(sample_tree());

    assert_eq!(statement.node_count(), 4);
    assert_eq!(statement.root().unwrap().node_id, 0);
    assert!(!statement.has_actual_stats());
    assert_eq!(statement.text_preview(100), "SELECT * FROM dbo.Orders WHERE OrderID = 1");
    assert_eq!(statement.text_preview(8), "SELECT *...");
    assert_eq!(Statement::new().node_count(), 0);
}

#[test]
fn test_memory_grant_and_parameters() {
    let grant = MemoryGrantInfo {
        granted_memory_kb: Some(8192),
        max_used_memory_kb: Some(1024),
        ..MemoryGrantInfo::default()
    };
    assert_eq!(grant.unused_memory_kb(), Some(7168));
    assert_eq!(MemoryGrantInfo::default().unused_memory_kb(), None);

    let sniffed = Parameter {
        name: "@from".into(),
        compiled_value: Some("(1)".into()),
        runtime_value: Some("(49000)".into()),
        ..Parameter::default()
    };
    assert!(sniffed.is_sniffing_mismatch());

    let estimated_only = Parameter {
        runtime_value: None,
        ..sniffed
    };
    assert!(!estimated_only.is_sniffing_mismatch());
}

#[test]
fn test_plan_counts_missing_indexes_across_batches() {
    let index = MissingIndex {
        table: "[Orders]".into(),
        ..MissingIndex::default()
    };
    let mut plan = ParsedPlan::new();
    plan.batches.push(Batch {
        statements: vec![
            Statement::new().with_missing_index(index.clone()),
            Statement::new(),
        ],
        skipped_statements: 1,
    });
    plan.batches.push(Batch {
        statements: vec![
            Statement::new()
                .with_missing_index(index.clone())
                .with_missing_index(index),
        ],
        skipped_statements: 0,
    });

    let expected: usize = plan.statements().map(|s| s.missing_indexes.len()).sum();
    assert_eq!(plan.all_missing_indexes().len(), expected);
    assert_eq!(expected, 3);
    assert_eq!(plan.statement_count(), 3);
    assert_eq!(plan.skipped_statement_count(), 1);
    // A statement without suggestions has an empty list, not a missing one
    assert!(plan.statements().nth(1).unwrap().missing_indexes.is_empty());
}

#[test]
fn test_tree_serialization() {
    let tree = sample_tree();
    let json = serde_json::to_value(&tree).unwrap();

    assert_eq!(json["nodes"][0]["physical_op"], "Nested Loops");
    assert_eq!(json["nodes"][1]["children"], serde_json::json!([3]));
    assert_eq!(json["nodes"][3]["parent"], serde_json::json!(1));

    let parsed: PlanTree = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, tree);
}

#[test]
fn test_tree_deserialization_rejects_broken_structure() {
    let parse = |json: serde_json::Value| serde_json::from_value::<PlanTree>(json);

    assert!(parse(serde_json::json!({ "nodes": [] })).is_err());

    let valid = serde_json::to_value(sample_tree()).unwrap();

    // Child listed under the wrong parent
    let mut moved = valid.clone();
    moved["nodes"][1]["children"] = serde_json::json!([]);
    moved["nodes"][2]["children"] = serde_json::json!([3]);
    assert!(parse(moved).is_err());

    // Parent that does not precede its child forms a cycle
    let mut cycle = valid.clone();
    cycle["nodes"][1]["parent"] = serde_json::json!(3);
    assert!(parse(cycle).is_err());

    let mut rooted = valid.clone();
    rooted["nodes"][0]["parent"] = serde_json::json!(1);
    assert!(parse(rooted).is_err());

    let mut misplaced = valid;
    misplaced["nodes"][2]["index"] = serde_json::json!(7);
    assert!(parse(misplaced).is_err());
}

#[test]
fn test_tree_error_variants() {
    let tree = |nodes: serde_json::Value| {
        serde_json::from_value::<PlanTree>(serde_json::json!({ "nodes": nodes }))
    };
    let err = tree(serde_json::json!([])).unwrap_err();
    assert!(err.to_string().contains("plan tree has no nodes"));

    let raw = RawPlanTree { nodes: Vec::new() };
    assert_eq!(PlanTree::try_from(raw), Err(PlanTreeError::Empty));

    let mut root = PlanNode::new("Sort", "Sort");
    root.parent = Some(NodeIndex(0));
    let raw = RawPlanTree { nodes: vec![root] };
    assert_eq!(PlanTree::try_from(raw), Err(PlanTreeError::RootHasParent));

    let mut orphan = PlanNode::new("Table Scan", "Table Scan");
    orphan.index = NodeIndex(1);
    let raw = RawPlanTree {
        nodes: vec![PlanNode::new("Sort", "Sort"), orphan],
    };
    assert_eq!(PlanTree::try_from(raw), Err(PlanTreeError::InvalidParent(1)));
}

#[test]
fn test_node_builders() {
    let warning = PlanWarning::new("NoJoinPredicate", "No join predicate", Severity::Critical);
    let node = PlanNode::new("Filter", "Filter")
        .with_rows(12.5)
        .with_predicate("[o].[Status] = 'open'")
        .with_warning(warning.clone());

    assert_eq!(node.estimate_rows, 12.5);
    assert_eq!(node.predicate.as_deref(), Some("[o].[Status] = 'open'"));
    assert_eq!(node.warnings, vec![warning]);
}

#[test]
fn test_severity_levels() {
    assert!(Severity::Critical.is_warning_or_above());
    assert!(Severity::Warning.is_warning_or_above());
    assert!(!Severity::Info.is_warning_or_above());
    assert!(!Severity::Warning.is_critical());
    assert_eq!(Severity::Info.as_str(), "info");
}

#[test]
fn test_plan_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ParsedPlan>();
}
