//! Missing-Index Statements
//!
//! Synthesizes the `CREATE INDEX` text shown next to each suggestion.
//! Identifiers are used exactly as the plan reports them (already bracketed
//! by the engine); only the generated index name is derived.

use crate::showplan::model::{MissingIndex, ParsedPlan};

/// SQL Server identifier length limit
const MAX_IDENTIFIER_LEN: usize = 128;

/// Builds the `CREATE NONCLUSTERED INDEX` statement for a suggestion.
///
/// Key columns are the equality columns followed by the inequality columns;
/// include columns go into an `INCLUDE` clause when present.
pub fn create_index_statement(index: &MissingIndex) -> String {
    let key_columns: Vec<&str> = index
        .equality_columns
        .iter()
        .chain(&index.inequality_columns)
        .map(String::as_str)
        .collect();

    let target = [&index.database, &index.schema, &index.table]
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".");

    let mut statement = format!(
        "CREATE NONCLUSTERED INDEX [{}] ON {} ({})",
        index_name(&index.table, &key_columns),
        target,
        key_columns.join(", ")
    );
    if !index.include_columns.is_empty() {
        statement.push_str(&format!(" INCLUDE ({})", index.include_columns.join(", ")));
    }
    statement.push(';');
    statement
}

/// `IX_<table>_<key columns>` with brackets stripped, cut to the identifier limit
fn index_name(table: &str, key_columns: &[&str]) -> String {
    let mut name = format!("IX_{}", unbracket(table));
    for column in key_columns {
        name.push('_');
        name.push_str(unbracket(column));
    }
    name.chars().take(MAX_IDENTIFIER_LEN).collect()
}

fn unbracket(identifier: &str) -> &str {
    identifier
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
}

impl ParsedPlan {
    /// Missing indexes paired with the position of the statement that
    /// suggested them in [`ParsedPlan::statements`]
    pub fn missing_indexes_by_statement(&self) -> Vec<(usize, &MissingIndex)> {
        self.statements()
            .enumerate()
            .flat_map(|(i, s)| s.missing_indexes.iter().map(move |m| (i, m)))
            .collect()
    }
}
