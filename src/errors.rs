use std::fmt;

/// Crate-wide error type.
///
/// User-facing variants (`Syntax`, `NegativeId`, `StringTooLong`,
/// `Unrecognized`, `DuplicateKey`, `Assistant`) are reported at the prompt
/// and the REPL continues. `Io` and `Storage` are fatal: they propagate out
/// of the REPL loop and terminate the process with a diagnostic.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Storage(String),
    Syntax(String),
    Assistant(String),
    DuplicateKey,
    NegativeId,
    StringTooLong,
    Unrecognized(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::Storage(msg) => write!(f, "Storage error. {}", msg),
            Error::Syntax(msg) => write!(f, "Syntax error. {}", msg),
            Error::Assistant(msg) => write!(f, "Assistant error. {}", msg),
            Error::DuplicateKey => write!(f, "Duplicate key."),
            Error::NegativeId => write!(f, "ID must be positive."),
            Error::StringTooLong => write!(f, "String is too long."),
            Error::Unrecognized(line) => {
                write!(f, "Unrecognized keyword at start of '{}'.", line)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Builds an [`Error`] variant from a format string, e.g.
/// `err!(Storage, "page {} not resident", page_num)`.
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}
