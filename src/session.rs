use crate::errors::Error;
use crate::storage::Table;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// One REPL session bound to one database file.
///
/// The id ties every log record of a run together.
pub struct Session {
    pub id: Uuid,
    pub table: Table,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let table = Table::open(path)?;
        let session = Session {
            id: Uuid::new_v4(),
            table,
        };
        info!(session_id = %session.id, path = %path.display(), "Opened database");
        Ok(session)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.table.close()?;
        info!(session_id = %self.id, "Closed database");
        Ok(())
    }
}
