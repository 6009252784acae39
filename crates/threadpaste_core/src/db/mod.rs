//! Database layer for threadpaste.

/// Paste storage helpers.
pub mod paste;
/// redb table definitions.
pub mod tables;
/// User storage helpers.
pub mod user;

use crate::error::AppError;
use redb::ReadableTable;
use std::path::Path;
use std::sync::Arc;

/// Database handle with typed accessors over the shared redb instance.
pub struct Database {
    pub db: Arc<redb::Database>,
    pub pastes: paste::PasteDb,
    pub users: user::UserDb,
}


/// Allocate the next id from a named sequence inside an open write transaction.
pub(crate) fn next_id(
    sequences: &mut redb::Table<&str, u64>,
    sequence: &str,
) -> Result<u64, AppError> {
    let current = sequences.get(sequence)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current
        .checked_add(1)
        .ok_or_else(|| AppError::StorageMessage(format!("Sequence '{}' exhausted", sequence)))?;
    sequences.insert(sequence, next)?;
    Ok(next)
}

impl Database {
    /// Build a database handle from an already-open redb instance.
    ///
    /// # Errors
    /// Returns an error if the required tables cannot be created.
    pub fn from_shared(db: Arc<redb::Database>) -> Result<Self, AppError> {
        Ok(Self {
            pastes: paste::PasteDb::new(db.clone())?,
            users: user::UserDb::new(db.clone())?,
            db,
        })
    }

    /// Open (or create) the database under the `path` directory and initialize tables.
    ///
    /// # Returns
    /// A fully initialized [`Database`].
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or redb fails to open.
    pub fn new(path: &str) -> Result<Self, AppError> {
        let dir = Path::new(path);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create database directory '{}': {}",
                dir.display(),
                err
            ))
        })?;

        let file = dir.join(tables::REDB_FILE_NAME);
        let db = match redb::Database::create(&file) {
            Ok(db) => Arc::new(db),
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                return Err(AppError::StorageMessage(format!(
                    "Database at '{}' is already open in another process.\n\
                    Stop the other threadpaste instance, or set DB_PATH to a different location.",
                    file.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        tracing::debug!("Opened database at {}", file.display());

        Self::from_shared(db)
    }
}
