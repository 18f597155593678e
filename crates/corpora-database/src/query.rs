//! Statement dispatch and result materialization.

use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row};

/// Leading-keyword classification of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Other,
}

impl StatementKind {
    /// Case-insensitive on the first keyword, surrounding whitespace
    /// ignored.
    pub fn of(statement: &str) -> Self {
        let first = statement.trim().split_whitespace().next().unwrap_or("");
        if first.eq_ignore_ascii_case("select") {
            StatementKind::Select
        } else if first.eq_ignore_ascii_case("insert") {
            StatementKind::Insert
        } else {
            StatementKind::Other
        }
    }
}

/// Materialized result set: column names plus rows in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one `run` call, discriminated by statement kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// SELECT: the full result set.
    Rows(ResultTable),
    /// INSERT: identifier generated for the new row.
    Inserted(u64),
    /// Anything else: executed and committed, nothing to return.
    Done,
}

pub(crate) fn table_from_rows(rows: &[MySqlRow]) -> ResultTable {
    let Some(first) = rows.first() else {
        return ResultTable::default();
    };

    let columns = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut table = ResultTable {
        columns,
        rows: Vec::with_capacity(rows.len()),
    };
    for row in rows {
        let cells = (0..row.len()).map(|i| cell_to_string(row, i)).collect();
        table.rows.push(cells);
    }
    table
}

// Cells arrive untyped here; try the common decodings in order and fall back
// to a marker rather than failing the whole result set.
fn cell_to_string(row: &MySqlRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_else(|| "NULL".to_string());
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return value.to_string();
    }
    if let Ok(value) = row.try_get::<u64, _>(index) {
        return value.to_string();
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return value.to_string();
    }
    if let Ok(value) = row.try_get::<bool, _>(index) {
        return value.to_string();
    }
    if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
        return String::from_utf8_lossy(&value).into_owned();
    }
    "<unsupported type>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_dispatch_ignores_case_and_whitespace() {
        assert_eq!(StatementKind::of("SELECT * FROM Audio"), StatementKind::Select);
        assert_eq!(StatementKind::of("  select 1"), StatementKind::Select);
        assert_eq!(StatementKind::of("\n\tSeLeCt 1"), StatementKind::Select);
    }

    #[test]
    fn insert_dispatch() {
        assert_eq!(
            StatementKind::of("INSERT INTO Audio (name) VALUES (?)"),
            StatementKind::Insert
        );
        assert_eq!(StatementKind::of("  insert into x"), StatementKind::Insert);
    }

    #[test]
    fn everything_else_is_other() {
        assert_eq!(StatementKind::of("UPDATE Audio SET duration = ?"), StatementKind::Other);
        assert_eq!(StatementKind::of("DELETE FROM Audio"), StatementKind::Other);
        assert_eq!(StatementKind::of(""), StatementKind::Other);
        // A keyword that merely starts with "select" does not count.
        assert_eq!(StatementKind::of("selection"), StatementKind::Other);
    }

    #[test]
    fn empty_table() {
        let table = ResultTable::default();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }
}
