//! Tests for diagram layout

use super::*;
use crate::showplan::model::{ObjectRef, PlanNode, PlanTree, Statement, ThreadCounters};
use crate::test_fixtures::{self, HASH_JOIN, MIXED_BATCHES, SINGLE_SCAN};
use indoc::indoc;

fn scan(node_id: i32, table: &str) -> PlanNode {
    PlanNode::new("Table Scan", "Table Scan")
        .with_node_id(node_id)
        .with_object(ObjectRef {
            table: Some(table.to_string()),
            ..ObjectRef::default()
        })
}

fn coordinates(tree: &PlanTree) -> Vec<(i32, f64, f64)> {
    tree.iter().map(|n| (n.node_id, n.x, n.y)).collect()
}

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.padding, 20.0);
        assert_eq!(config.horizontal_spacing, 180.0);
        assert_eq!(config.vertical_spacing, 20.0);
        assert_eq!(config.node_width, 150.0);
        assert_eq!(config.min_node_height, 60.0);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = LayoutConfig::from_toml(indoc! {r#"
            padding = 8.0
            vertical_spacing = 4.0
        "#})
        .unwrap();

        assert_eq!(config.padding, 8.0);
        assert_eq!(config.vertical_spacing, 4.0);
        assert_eq!(config.horizontal_spacing, 180.0);
        assert_eq!(config.line_height, 14.0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(LayoutConfig::from_toml("").unwrap(), LayoutConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = LayoutConfig::from_toml("padding = \"wide\"").unwrap_err();
        assert!(matches!(err, LayoutConfigError::Toml(_)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let rejected = [
            ("horizontal_spacing = 0.0", "horizontal_spacing"),
            ("horizontal_spacing = -180.0", "horizontal_spacing"),
            ("vertical_spacing = -200.0", "vertical_spacing"),
            ("node_width = 0.0", "node_width"),
            ("padding = nan", "padding"),
            ("line_height = inf", "line_height"),
        ];
        for (source, expected) in rejected {
            match LayoutConfig::from_toml(source) {
                Err(LayoutConfigError::InvalidValue { field, .. }) => {
                    assert_eq!(field, expected, "{source}")
                }
                other => panic!("{source} was accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_padding_and_spacing_are_allowed() {
        let config =
            LayoutConfig::from_toml("padding = 0.0\nvertical_spacing = 0.0").unwrap();
        assert_eq!(config.padding, 0.0);
        assert!(LayoutConfig::default().validate().is_ok());
    }
}

mod node_height_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_height() {
        let engine = LayoutEngine::default();
        let node = PlanNode::new("Compute Scalar", "Compute Scalar");
        // icon 32 + two lines of 14 + padding 10
        assert_eq!(engine.node_height(&node), 70.0);
    }

    #[test]
    fn test_actual_stats_and_object_add_four_lines() {
        let engine = LayoutEngine::default();
        let plain = PlanNode::new("Compute Scalar", "Compute Scalar");
        let rich = scan(0, "[Orders]").with_threads(vec![ThreadCounters {
            actual_rows: 10,
            actual_executions: 1,
            ..ThreadCounters::default()
        }]);

        let line = engine.config().line_height;
        assert_eq!(engine.node_height(&rich) - engine.node_height(&plain), 4.0 * line);
    }

    #[test]
    fn test_minimum_height_floor() {
        let engine = LayoutEngine::new(LayoutConfig {
            icon_size: 10.0,
            line_height: 5.0,
            node_padding: 0.0,
            min_node_height: 60.0,
            ..LayoutConfig::default()
        });
        let plain = PlanNode::new("Compute Scalar", "Compute Scalar");
        assert_eq!(engine.node_height(&plain), 60.0);

        // 10 + 10 + 15 + 5 = 40, still floored
        let rich = scan(0, "[t]").with_threads(vec![ThreadCounters::default()]);
        assert_eq!(engine.node_height(&rich), 60.0);
    }
}

mod tree_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_leaf_sits_at_padding() {
        let mut plan = test_fixtures::parse(SINGLE_SCAN);
        let canvases = LayoutEngine::default().layout_plan(&mut plan);

        let root = plan.statements().next().unwrap().root().unwrap();
        assert_eq!((root.x, root.y), (20.0, 20.0));
        assert_eq!(root.cost_percent, 100);
        // Object name adds one line: 70 + 14
        assert_eq!(
            canvases,
            vec![Some(CanvasSize {
                width: 20.0 + 150.0 + 20.0,
                height: 20.0 + 84.0 + 20.0,
            })]
        );
    }

    #[test]
    fn test_join_over_two_scans() {
        let mut plan = test_fixtures::parse(HASH_JOIN);
        let engine = LayoutEngine::default();
        let canvases = engine.layout_plan(&mut plan);

        let tree = plan.statements().next().unwrap().tree.as_ref().unwrap();
        let first_scan_height = engine.node_height(&tree[crate::showplan::NodeIndex(1)]);
        assert_eq!(first_scan_height, 84.0);
        assert_eq!(
            coordinates(tree),
            vec![
                (0, 20.0, 20.0),
                (1, 200.0, 20.0),
                (2, 200.0, 20.0 + first_scan_height + 20.0),
            ]
        );
        assert_eq!(
            canvases[0],
            Some(CanvasSize {
                width: 200.0 + 150.0 + 20.0,
                height: 124.0 + 84.0 + 20.0,
            })
        );
    }

    #[test]
    fn test_internal_node_follows_first_child() {
        // 0 ── 1 ── 3
        //  │    └── 4
        //  └── 2
        let mut tree = PlanTree::new(PlanNode::new("Nested Loops", "Inner Join").with_node_id(0));
        let left = tree.push_child(
            PlanTree::ROOT,
            PlanNode::new("Merge Join", "Inner Join").with_node_id(1),
        );
        tree.push_child(PlanTree::ROOT, scan(2, "[c]"));
        tree.push_child(left, scan(3, "[a]"));
        tree.push_child(
            left,
            PlanNode::new("Constant Scan", "Constant Scan").with_node_id(4),
        );

        let engine = LayoutEngine::default();
        engine.layout_tree(&mut tree);

        let by_id = |id: i32| tree.find_by_node_id(id).unwrap();
        assert_eq!(by_id(0).y, by_id(1).y);
        assert_eq!(by_id(1).y, by_id(3).y);
        // Leaves in traversal order: 3, 4, 2
        assert_eq!(by_id(3).y, 20.0);
        assert_eq!(by_id(4).y, 20.0 + 84.0 + 20.0);
        assert_eq!(by_id(2).y, 124.0 + 70.0 + 20.0);
        assert_eq!(by_id(3).x, 20.0 + 2.0 * 180.0);
        assert_eq!(by_id(2).x, 20.0 + 180.0);
    }

    #[test]
    fn test_children_are_right_of_parents_and_leaves_do_not_overlap() {
        let mut plan = test_fixtures::parse(MIXED_BATCHES);
        let engine = LayoutEngine::default();
        engine.layout_plan(&mut plan);

        for statement in plan.statements() {
            let tree = statement.tree.as_ref().unwrap();
            for node in tree.iter() {
                if let Some(parent) = tree.parent_of(node.index()) {
                    assert!(node.x > parent.x);
                }
            }

            let leaves: Vec<&PlanNode> = tree.leaves().collect();
            for pair in leaves.windows(2) {
                let gap = pair[1].y - pair[0].y;
                assert!(gap >= engine.node_height(pair[0]) + engine.config().vertical_spacing);
            }
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut first = test_fixtures::parse(HASH_JOIN);
        let mut second = first.clone();
        let engine = LayoutEngine::default();

        let a = engine.layout_plan(&mut first);
        let b = engine.layout_plan(&mut second);
        assert_eq!(a, b);
        assert_eq!(first, second);

        // Running again over an already laid-out plan changes nothing
        let before = first.clone();
        engine.layout_plan(&mut first);
        assert_eq!(first, before);
    }

    #[test]
    fn test_function_plans_are_laid_out() {
        let mut plan = test_fixtures::parse(MIXED_BATCHES);
        LayoutEngine::default().layout_plan(&mut plan);

        let with_udf = plan
            .statements()
            .find(|s| !s.function_plans.is_empty())
            .unwrap();
        let nested = with_udf.function_plans[0].statements[0].root().unwrap();
        assert_eq!((nested.x, nested.y), (20.0, 20.0));
    }

    #[test]
    fn test_statement_without_tree_is_skipped() {
        let mut statement = Statement::new().with_text("SET NOCOUNT ON");
        assert_eq!(LayoutEngine::default().layout_statement(&mut statement), None);
    }

    #[test]
    fn test_custom_spacing() {
        let engine = LayoutEngine::new(LayoutConfig {
            padding: 0.0,
            horizontal_spacing: 100.0,
            vertical_spacing: 0.0,
            ..LayoutConfig::default()
        });
        let mut tree = PlanTree::new(PlanNode::new("Concatenation", "Concatenation"));
        tree.push_child(PlanTree::ROOT, scan(1, "[a]"));
        tree.push_child(PlanTree::ROOT, scan(2, "[b]"));

        let canvas = engine.layout_tree(&mut tree);
        let positions: Vec<(f64, f64)> = tree.iter().map(|n| (n.x, n.y)).collect();
        assert_eq!(positions, vec![(0.0, 0.0), (100.0, 0.0), (100.0, 84.0)]);
        assert_eq!(canvas, CanvasSize { width: 250.0, height: 168.0 });
    }
}
