//! Table and JSON rendering of a laid-out plan

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use planlens_showplan::{
    CanvasSize, FunctionKind, FunctionPlan, ParsedPlan, PlanTree, Severity, Statement,
    WarningSource, most_expensive,
};
use serde::Serialize;

const TEXT_PREVIEW_CHARS: usize = 60;

/// Everything the JSON output contains
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub plan: &'a ParsedPlan,
    /// Canvas of each statement, in statement order
    pub canvases: &'a [Option<CanvasSize>],
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_cost(cost: f64) -> String {
    format!("{cost:.6}")
}

fn format_canvas(canvas: Option<&CanvasSize>) -> String {
    canvas.map_or_else(
        || "-".to_string(),
        |c| format!("{:.0} x {:.0}", c.width, c.height),
    )
}

fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::Critical => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
    };
    Cell::new(severity.as_str()).fg(color)
}

pub fn statements_table(plan: &ParsedPlan, canvases: &[Option<CanvasSize>]) -> Table {
    let mut table = new_table(vec!["#", "Id", "Type", "Cost", "Operators", "Canvas", "Text"]);
    for (i, statement) in plan.statements().enumerate() {
        table.add_row(vec![
            Cell::new(i),
            Cell::new(
                statement
                    .statement_id
                    .map_or_else(String::new, |id| id.to_string()),
            ),
            Cell::new(statement.statement_type.as_deref().unwrap_or_default()),
            Cell::new(format_cost(statement.estimated_subtree_cost)),
            Cell::new(statement.node_count()),
            Cell::new(format_canvas(canvases.get(i).and_then(Option::as_ref))),
            Cell::new(statement.text_preview(TEXT_PREVIEW_CHARS)),
        ]);
    }
    table
}

/// Operator tree of one statement, indented by depth
pub fn operators_table(tree: &PlanTree) -> Table {
    let with_actuals = tree.iter().any(|n| n.has_actual_stats());
    let mut header = vec!["Node", "Operator", "Object", "Est. Rows"];
    if with_actuals {
        header.push("Actual Rows");
    }
    header.extend(["Cost %", "X", "Y"]);

    let mut table = new_table(header);
    for node in tree.iter() {
        let indent = "  ".repeat(tree.depth_of(node.index()));
        let mut cost = Cell::new(format!("{}%", node.cost_percent));
        if node.is_expensive {
            cost = cost.fg(Color::Red);
        }

        let mut row = vec![
            Cell::new(node.node_id),
            Cell::new(format!("{indent}{}", node.display_name())),
            Cell::new(node.object_name()),
            Cell::new(format!("{:.1}", node.estimate_rows)),
        ];
        if with_actuals {
            row.push(Cell::new(
                node.actual
                    .as_ref()
                    .map_or_else(String::new, |a| a.actual_rows.to_string()),
            ));
        }
        row.extend([
            cost,
            Cell::new(format!("{:.0}", node.x)),
            Cell::new(format!("{:.0}", node.y)),
        ]);
        table.add_row(row);
    }
    table
}

/// The `limit` operators with the highest own cost
pub fn hotspots_table(tree: &PlanTree, limit: usize) -> Table {
    let mut table = new_table(vec!["Node", "Operator", "IO + CPU", "Subtree %"]);
    for node in most_expensive(tree, limit) {
        table.add_row(vec![
            Cell::new(node.node_id),
            Cell::new(node.display_name()),
            Cell::new(format_cost(node.operator_cost())),
            Cell::new(format!("{}%", node.cost_percent)),
        ]);
    }
    table
}

pub fn missing_indexes_table(plan: &ParsedPlan) -> Table {
    let mut table = new_table(vec!["Statement", "Impact", "Table", "Create Statement"]);
    for (statement_index, index) in plan.missing_indexes_by_statement() {
        table.add_row(vec![
            Cell::new(statement_index),
            Cell::new(format!("{:.1}%", index.impact)),
            Cell::new(format!("{}.{}.{}", index.database, index.schema, index.table)),
            Cell::new(&index.create_statement),
        ]);
    }
    table
}

pub fn warnings_table(plan: &ParsedPlan) -> Table {
    let mut table = new_table(vec!["Severity", "Statement", "Node", "Type", "Message"]);
    for (severity, warnings) in plan.warnings_by_severity() {
        for warning in warnings {
            let node = match warning.source {
                WarningSource::Statement => String::new(),
                WarningSource::Operator { node_id, .. } => node_id.to_string(),
            };
            table.add_row(vec![
                severity_cell(severity),
                Cell::new(warning.statement_index),
                Cell::new(node),
                Cell::new(&warning.warning.warning_type),
                Cell::new(&warning.warning.message),
            ]);
        }
    }
    table
}

/// Heading printed above each statement's operator table
pub fn statement_heading(index: usize, statement: &Statement) -> String {
    let mut heading = format!("Statement {index}");
    if let Some(kind) = &statement.statement_type {
        heading.push_str(&format!(" ({kind})"));
    }
    if statement.has_actual_stats() {
        heading.push_str(" [actual]");
    }
    heading
}

/// Heading for a statement inside a called function or procedure, e.g.
/// `UDF [dbo].[fn_Total], statement 0 (SELECT)`
pub fn function_statement_heading(
    function: &FunctionPlan,
    index: usize,
    statement: &Statement,
) -> String {
    let kind = match function.kind {
        FunctionKind::Udf => "UDF",
        FunctionKind::StoredProcedure => "Procedure",
    };
    let mut heading = format!("{kind} {}, statement {index}", function.name);
    if let Some(statement_type) = &statement.statement_type {
        heading.push_str(&format!(" ({statement_type})"));
    }
    heading
}

/// Every operator tree reachable from a statement: its own, then those of
/// the functions and procedures it calls, each headed by the path to it
pub fn statement_trees(index: usize, statement: &Statement) -> Vec<(String, &PlanTree)> {
    fn collect<'a>(
        heading: String,
        statement: &'a Statement,
        out: &mut Vec<(String, &'a PlanTree)>,
    ) {
        for function in &statement.function_plans {
            for (index, nested) in function.statements.iter().enumerate() {
                let nested_heading = format!(
                    "{heading} > {}",
                    function_statement_heading(function, index, nested)
                );
                if let Some(tree) = &nested.tree {
                    out.push((nested_heading.clone(), tree));
                }
                collect(nested_heading, nested, out);
            }
        }
    }

    let heading = statement_heading(index, statement);
    let mut trees = Vec::new();
    if let Some(tree) = &statement.tree {
        trees.push((heading.clone(), tree));
    }
    collect(heading, statement, &mut trees);
    trees
}
