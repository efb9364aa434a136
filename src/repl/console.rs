//! The interactive prompt: reads a line at a time, dispatches meta-commands
//! and statements, and prints results.
//!
//! Stdout carries only user-visible output; diagnostics go to the tracing
//! log. Error messages render in red when stdout is a terminal and as plain
//! text when output is piped.

use super::history::History;
use crate::assistant;
use crate::command::{self, SqlResult};
use crate::errors::Error;
use crate::session::Session;
use crate::sql;
use crate::storage::{self, node};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::tty::IsTty;
use crossterm::execute;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

const PROMPT: &str = "db > ";

enum MetaResult {
    Continue,
    Exit,
}

/// Runs the REPL against the database at `filename` until `.exit` or end of
/// input.
///
/// # Errors
/// Only fatal storage and I/O failures escape; user mistakes are reported
/// at the prompt and the loop continues.
pub fn start(filename: &Path) -> Result<(), Error> {
    let mut session = Session::open(filename)?;
    let mut history = History::open();
    info!(
        session_id = %session.id,
        history_entries = history.len(),
        "Starting REPL session..."
    );

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // end of input closes the session like .exit
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = history.push(line) {
            warn!("Failed to save history: {}", e);
        }

        if line.starts_with('.') {
            match do_meta_command(line, &mut session)? {
                MetaResult::Continue => continue,
                MetaResult::Exit => break,
            }
        }

        let statement_line = if line.starts_with(assistant::ASSISTANT_PREFIX) {
            match assistant::translate(line) {
                Ok(command) => command,
                Err(e) => {
                    echo_error(&e.to_string());
                    continue;
                }
            }
        } else {
            line.to_string()
        };

        let sql_command = match sql::parse(&statement_line) {
            Ok(c) => c,
            Err(e) => {
                debug!(line = %statement_line, "Rejected statement: {}", e);
                echo_error(&e.to_string());
                continue;
            }
        };

        match command::execute(&mut session.table, sql_command) {
            Ok(SqlResult::Ok { .. }) => echo("Executed."),
            Ok(SqlResult::ResultSet { rows }) => {
                if rows.is_empty() {
                    echo("DB is empty.");
                } else {
                    for row in rows {
                        echo(&row.to_string());
                    }
                }
            }
            Err(e @ Error::DuplicateKey) => echo_error(&format!("Error: {}", e)),
            Err(e) => {
                // Fatal failure: close what we can, then surface it.
                let _ = session.close();
                return Err(e);
            }
        }
    }

    session.close()?;
    Ok(())
}

fn do_meta_command(line: &str, session: &mut Session) -> Result<MetaResult, Error> {
    match line {
        ".exit" => Ok(MetaResult::Exit),
        ".btree" => {
            let tree = storage::render_btree(&mut session.table)?;
            print!("{}", tree);
            Ok(MetaResult::Continue)
        }
        ".constants" => {
            print!("{}", node::format_constants());
            Ok(MetaResult::Continue)
        }
        _ => {
            echo(&format!("Unrecognized command '{}'", line));
            Ok(MetaResult::Continue)
        }
    }
}

pub fn echo(message: &str) {
    println!("{}", message);
}

pub fn echo_error(message: &str) {
    let mut stdout = io::stdout();
    if stdout.is_tty() {
        let _ = execute!(
            stdout,
            SetForegroundColor(Color::Red),
            Print(message),
            Print("\n"),
            ResetColor
        );
    } else {
        println!("{}", message);
    }
}
