//! Cost Annotation
//!
//! Each operator's `cost_percent` is its estimated subtree cost as a share of
//! the statement root's subtree cost, rounded to the nearest integer and
//! clamped to `0..=100`. A root cost of exactly zero yields zero for every
//! operator instead of dividing by zero.

use crate::showplan::model::{PlanNode, PlanTree};

/// Operators at or above this share of the statement cost are flagged expensive
pub const EXPENSIVE_COST_PERCENT: u8 = 25;

/// Computes an operator's share of the root subtree cost
pub fn cost_percent(subtree_cost: f64, root_cost: f64) -> u8 {
    if root_cost == 0.0 {
        return 0;
    }
    let percent = (100.0 * subtree_cost / root_cost).round();
    if percent.is_nan() {
        0
    } else {
        percent.clamp(0.0, 100.0) as u8
    }
}

/// Sets `cost_percent` and `is_expensive` on every node of the tree
pub fn annotate_costs(tree: &mut PlanTree) {
    let root_cost = tree.root().estimated_subtree_cost;
    for node in tree.nodes_mut() {
        node.cost_percent = cost_percent(node.estimated_subtree_cost, root_cost);
        node.is_expensive = node.cost_percent >= EXPENSIVE_COST_PERCENT;
    }
}

/// Returns up to `limit` operators ordered by their own IO + CPU estimate,
/// highest first. Ties keep tree order.
pub fn most_expensive(tree: &PlanTree, limit: usize) -> Vec<&PlanNode> {
    let mut nodes: Vec<&PlanNode> = tree.iter().collect();
    nodes.sort_by(|a, b| b.operator_cost().total_cmp(&a.operator_cost()));
    nodes.truncate(limit);
    nodes
}
