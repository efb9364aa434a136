//! Bridge to the out-of-process natural-language assistant.
//!
//! The assistant is an arbitrary text-to-command translator: it receives the
//! user's question and prints a statement back. Its output is re-fed to the
//! parser exactly as if the user had typed it, so the engine never depends
//! on the assistant being present or sensible.

use crate::errors::Error;
use std::process::Command;
use tracing::debug;

/// Prefix that routes a REPL line to the assistant. Case-sensitive.
pub const ASSISTANT_PREFIX: &str = "Ada ";

/// Name of the assistant executable, resolved through `PATH`.
const ASSISTANT_PROGRAM: &str = "ada";

/// Asks the assistant to translate a natural-language line into a statement.
///
/// # Errors
/// Returns `Error::Assistant` when the subprocess cannot be spawned, exits
/// unsuccessfully, or prints nothing; the REPL reports this and carries on.
pub fn translate(line: &str) -> Result<String, Error> {
    let question = line.strip_prefix(ASSISTANT_PREFIX).unwrap_or(line).trim();
    debug!(question, "Delegating to the assistant");

    let output = Command::new(ASSISTANT_PROGRAM)
        .arg(question)
        .output()
        .map_err(|e| err!(Assistant, "Failed to run '{}'. {}", ASSISTANT_PROGRAM, e))?;

    if !output.status.success() {
        return Err(err!(
            Assistant,
            "'{}' exited with {}",
            ASSISTANT_PROGRAM,
            output.status
        ));
    }

    let command = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if command.is_empty() {
        return Err(err!(Assistant, "'{}' returned no command", ASSISTANT_PROGRAM));
    }
    debug!(command = %command, "Assistant produced a command");
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!("Ada insert a row".starts_with(ASSISTANT_PREFIX));
        assert!(!"ada insert a row".starts_with(ASSISTANT_PREFIX));
    }
}
