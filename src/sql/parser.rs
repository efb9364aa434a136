//! The statement parser.
//!
//! Only two statements exist: `insert <username> <id> <email>` and `select`.
//! The parser owns all user-input validation, so a `Statement` handed to the
//! executor always carries a well-formed row.

use super::statement::{SqlCommand, Statement};
use crate::errors::Error;
use crate::storage::Row;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref INSERT_REGEX: Regex =
        Regex::new(r"^insert\s+(\S+)\s+(-?\d+)\s+(\S+)\s*$").unwrap();
}

/// Parses a statement line.
///
/// # Errors
/// * `Error::Unrecognized` when the line starts with an unknown keyword.
/// * `Error::Syntax` when an `insert` does not match the expected shape.
/// * `Error::NegativeId` / `Error::StringTooLong` for value validation.
pub fn parse(sql: &str) -> Result<SqlCommand, Error> {
    let sql = sql.trim();

    if sql == "select" || sql.starts_with("select ") {
        return Ok(SqlCommand {
            statement: Statement::Select,
            sql: sql.to_string(),
        });
    }

    if sql.starts_with("insert") {
        return Ok(SqlCommand {
            statement: Statement::Insert(parse_insert(sql)?),
            sql: sql.to_string(),
        });
    }

    Err(Error::Unrecognized(sql.to_string()))
}

fn parse_insert(sql: &str) -> Result<Row, Error> {
    let captures = INSERT_REGEX
        .captures(sql)
        .ok_or_else(|| err!(Syntax, "Could not parse statement."))?;

    let username = &captures[1];
    let id_text = &captures[2];
    let email = &captures[3];

    let id: i64 = id_text
        .parse()
        .map_err(|_| err!(Syntax, "Could not parse statement."))?;
    if id < 0 {
        return Err(Error::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| err!(Syntax, "Could not parse statement."))?;

    debug!(id, username, "Parsed insert statement");
    Row::new(id, username, email)
}
