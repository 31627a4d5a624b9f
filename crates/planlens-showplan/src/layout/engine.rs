use serde::{Deserialize, Serialize};

use super::LayoutConfig;
use crate::showplan::model::{ParsedPlan, PlanNode, PlanTree, Statement};

/// Extent of a laid-out statement diagram
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Places plan operators on a left-to-right, root-first diagram.
///
/// The root sits at the top left. Each level of the tree moves one
/// `horizontal_spacing` to the right. Leaves are stacked top to bottom in
/// traversal order, and every internal node is aligned with its first child,
/// so the first branch of each operator is drawn as a straight line.
///
/// Layout only reads the tree and writes `x`/`y`; running it twice gives the
/// same coordinates.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Height of a node's box, which depends on how much text it shows
    pub fn node_height(&self, node: &PlanNode) -> f64 {
        let c = &self.config;
        let mut height = c.icon_size + 2.0 * c.line_height + c.node_padding;
        if node.has_actual_stats() {
            height += 3.0 * c.line_height;
        }
        if !node.object_name().is_empty() {
            height += c.line_height;
        }
        height.max(c.min_node_height)
    }

    /// Assigns `x`/`y` to every node and returns the canvas the tree needs
    pub fn layout_tree(&self, tree: &mut PlanTree) -> CanvasSize {
        let c = &self.config;
        let heights: Vec<f64> = tree.nodes().iter().map(|n| self.node_height(n)).collect();

        // X: pre-order, one column per depth
        let mut stack = vec![(PlanTree::ROOT, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            tree[index].x = c.padding + depth as f64 * c.horizontal_spacing;
            stack.extend(tree[index].children().iter().map(|&child| (child, depth + 1)));
        }

        // Y: post-order, leaves take the next free row, parents follow their first child
        let mut next_y = c.padding;
        let mut stack = vec![(PlanTree::ROOT, false)];
        while let Some((index, children_done)) = stack.pop() {
            let first_child = tree[index].children().first().copied();
            match first_child {
                None => {
                    tree[index].y = next_y;
                    next_y += heights[index.0] + c.vertical_spacing;
                }
                Some(first) if children_done => {
                    let y = tree[first].y;
                    tree[index].y = y;
                }
                Some(_) => {
                    stack.push((index, true));
                    stack.extend(
                        tree[index]
                            .children()
                            .iter()
                            .rev()
                            .map(|&child| (child, false)),
                    );
                }
            }
        }

        let canvas = tree
            .nodes()
            .iter()
            .zip(&heights)
            .fold(CanvasSize::default(), |canvas, (node, height)| CanvasSize {
                width: canvas.width.max(node.x + c.node_width + c.padding),
                height: canvas.height.max(node.y + height + c.padding),
            });

        tracing::trace!(
            nodes = tree.len(),
            width = canvas.width,
            height = canvas.height,
            "laid out operator tree"
        );
        canvas
    }

    /// Lays out a statement's tree and those of its function plans.
    ///
    /// Returns the statement's own canvas, or `None` when it has no tree.
    pub fn layout_statement(&self, statement: &mut Statement) -> Option<CanvasSize> {
        for function in &mut statement.function_plans {
            for nested in &mut function.statements {
                self.layout_statement(nested);
            }
        }
        statement.tree.as_mut().map(|tree| self.layout_tree(tree))
    }

    /// Lays out every statement of the plan; one entry per statement, in
    /// [`ParsedPlan::statements`] order
    #[tracing::instrument(skip(self, plan), fields(statements = plan.statement_count()))]
    pub fn layout_plan(&self, plan: &mut ParsedPlan) -> Vec<Option<CanvasSize>> {
        let canvases: Vec<_> = plan
            .statements_mut()
            .map(|statement| self.layout_statement(statement))
            .collect();
        tracing::debug!(
            laid_out = canvases.iter().filter(|c| c.is_some()).count(),
            "laid out plan"
        );
        canvases
    }
}
