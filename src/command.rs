//! The executor: turns parsed statements into tree and cursor operations.

use crate::errors::Error;
use crate::sql::{SqlCommand, Statement};
use crate::storage::{self, Row, Table};
use tracing::debug;

/// Outcome of a successfully executed statement.
#[derive(Debug)]
pub enum SqlResult {
    Ok { affected_rows: usize },
    ResultSet { rows: Vec<Row> },
}

/// Executes a statement against the table.
///
/// # Errors
/// `Error::DuplicateKey` for an insert whose id already exists; storage
/// errors bubble up unchanged.
pub fn execute(table: &mut Table, command: SqlCommand) -> Result<SqlResult, Error> {
    debug!(sql = %command.sql, "Executing statement");
    match command.statement {
        Statement::Insert(row) => {
            storage::insert_row(table, &row)?;
            Ok(SqlResult::Ok { affected_rows: 1 })
        }
        Statement::Select => {
            let rows = storage::select_rows(table)?;
            Ok(SqlResult::ResultSet { rows })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;
    use tempfile::tempdir;

    fn run(table: &mut Table, line: &str) -> Result<SqlResult, Error> {
        execute(table, sql::parse(line).unwrap())
    }

    #[test]
    fn test_execute_insert_then_select() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();

        match run(&mut table, "insert alice 1 a@x").unwrap() {
            SqlResult::Ok { affected_rows } => assert_eq!(affected_rows, 1),
            other => panic!("unexpected: {:?}", other),
        }
        run(&mut table, "insert bob 2 b@x").unwrap();

        match run(&mut table, "select").unwrap() {
            SqlResult::ResultSet { rows } => {
                let printed: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                assert_eq!(printed, vec!["(1, alice, a@x)", "(2, bob, b@x)"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_execute_duplicate_insert() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        run(&mut table, "insert alice 1 a@x").unwrap();

        let err = run(&mut table, "insert alice2 1 a2@x").unwrap_err();
        assert!(matches!(err, Error::DuplicateKey));
        assert_eq!(format!("Error: {}", err), "Error: Duplicate key.");

        match run(&mut table, "select").unwrap() {
            SqlResult::ResultSet { rows } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].username(), "alice");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_execute_select_on_empty_table() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(&dir.path().join("test.db")).unwrap();
        match run(&mut table, "select").unwrap() {
            SqlResult::ResultSet { rows } => assert!(rows.is_empty()),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
