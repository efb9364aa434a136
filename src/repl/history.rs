//! Command history for the REPL.
//!
//! Every statement and meta-command typed at the prompt is kept in memory
//! for the lifetime of the session and mirrored to `~/.minisql_history`.
//! History is best effort: when the file cannot be opened the session keeps
//! an in-memory history and the REPL carries on.

use once_cell::sync::Lazy;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const NAME: &str = env!("CARGO_PKG_NAME");

/// Location of the history file, `~/.minisql_history`.
static HISTORY_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(format!(".{}_history", NAME))
});

/// A session's command history, preloaded from previous runs.
pub struct History {
    entries: Vec<String>,
    file: Option<File>,
}

impl History {
    /// Opens the history at the default location.
    pub fn open() -> Self {
        Self::open_at(&HISTORY_PATH)
    }

    /// Opens a history backed by `path`, loading whatever earlier sessions
    /// recorded there.
    pub fn open_at(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => Vec::new(),
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok();
        History { entries, file }
    }

    /// Records one prompt line, appending it to the backing file when one is
    /// available. Blank lines are dropped.
    pub fn push(&mut self, line: &str) -> io::Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.entries.push(line.to_string());
        if let Some(file) = &mut self.file {
            writeln!(file, "{}", line)?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_history_survives_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = History::open_at(&path);
        assert_eq!(history.len(), 0);
        history.push("insert alice 1 a@x").unwrap();
        history.push(".btree").unwrap();
        drop(history);

        let history = History::open_at(&path);
        assert_eq!(history.entries, ["insert alice 1 a@x", ".btree"]);
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let dir = tempdir().unwrap();
        let mut history = History::open_at(&dir.path().join("history"));
        history.push("   ").unwrap();
        history.push("select").unwrap();
        history.push("").unwrap();
        assert_eq!(history.entries, ["select"]);
    }

    #[test]
    fn test_unwritable_path_falls_back_to_memory() {
        let path = PathBuf::from("/nonexistent/dir/history");
        let mut history = History::open_at(&path);
        history.push("select").unwrap();
        assert_eq!(history.len(), 1);
    }
}
