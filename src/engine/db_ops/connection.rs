//! Read-only connections to the source database (plain SQLite or SQLCipher).

use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::config::SourceConsts;

/// Where rows come from. Each pass or retrieval opens its own connection from this.
#[derive(Clone)]
pub struct SourceDb {
    path: PathBuf,
    passphrase: Option<String>,
}

impl fmt::Debug for SourceDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDb")
            .field("path", &self.path)
            .field("encrypted", &self.passphrase.is_some())
            .finish()
    }
}

impl SourceDb {
    pub fn new(path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            path: path.into(),
            passphrase,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only connection. If a passphrase is set, PRAGMA key is applied before anything else.
    pub fn open(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| Error::query(format!("open {}", self.path.display()), e))?;
        if let Some(key) = &self.passphrase {
            conn.pragma_update(None, "key", key)
                .map_err(|e| Error::query("set SQLCipher key", e))?;
        }
        conn.busy_timeout(Duration::from_millis(SourceConsts::BUSY_TIMEOUT_MS))
            .map_err(|e| Error::query("set busy timeout", e))?;
        Ok(conn)
    }

    /// True when the schema can be read with the current key (or without one).
    /// An encrypted file opened without its key fails here.
    pub fn is_readable(&self) -> bool {
        self.open()
            .and_then(|conn| {
                conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))
                    .map_err(|e| Error::query("read schema", e))
            })
            .is_ok()
    }
}
