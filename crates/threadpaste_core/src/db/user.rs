//! User storage operations backed by redb.

use crate::db::{next_id, tables::*};
use crate::error::AppError;
use crate::models::user::{ProviderIdentity, User};
use redb::{ReadableDatabase, ReadableTable};
use std::sync::Arc;

/// Accessor for the user tables.
pub struct UserDb {
    db: Arc<redb::Database>,
}

pub(crate) fn deserialize_user(bytes: &[u8]) -> Result<User, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

impl UserDb {
    /// Initialize user tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(USERS)?;
        write_txn.open_table(USERS_BY_PROVIDER)?;
        write_txn.open_table(SEQUENCES)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Fetch a user by id.
    ///
    /// # Returns
    /// `Ok(Some(user))` when found, `Ok(None)` when missing.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get(&self, id: u64) -> Result<Option<User>, AppError> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        users
            .get(id)?
            .map(|guard| deserialize_user(guard.value()))
            .transpose()
    }

    /// Fetch a user by external provider id.
    pub fn get_by_provider(&self, provider_id: &str) -> Result<Option<User>, AppError> {
        let read_txn = self.db.begin_read()?;
        let by_provider = read_txn.open_table(USERS_BY_PROVIDER)?;
        let Some(user_id) = by_provider.get(provider_id)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        users
            .get(user_id)?
            .map(|guard| deserialize_user(guard.value()))
            .transpose()
    }

    /// Create or refresh the user for a provider identity.
    ///
    /// The first login for a provider id creates the user; later logins keep
    /// the same row and overwrite its display name.
    ///
    /// # Returns
    /// The stored user after the write commits.
    ///
    /// # Errors
    /// Returns an error when storage access or serialization fails.
    pub fn upsert_by_provider(&self, identity: &ProviderIdentity) -> Result<User, AppError> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let mut by_provider = write_txn.open_table(USERS_BY_PROVIDER)?;
            let mut sequences = write_txn.open_table(SEQUENCES)?;

            let existing_id = by_provider
                .get(identity.provider_id.as_str())?
                .map(|guard| guard.value());
            let existing = match existing_id {
                Some(id) => users
                    .get(id)?
                    .map(|guard| deserialize_user(guard.value()))
                    .transpose()?,
                None => None,
            };

            let user = match existing {
                Some(mut user) => {
                    user.display_name = identity.display_name.clone();
                    user
                }
                None => User {
                    id: next_id(&mut sequences, USER_SEQUENCE)?,
                    display_name: identity.display_name.clone(),
                    provider_id: identity.provider_id.clone(),
                },
            };

            let encoded = bincode::serialize(&user)?;
            users.insert(user.id, encoded.as_slice())?;
            by_provider.insert(user.provider_id.as_str(), user.id)?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// List all users ordered by id.
    pub fn list(&self) -> Result<Vec<User>, AppError> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let mut out = Vec::new();
        for item in users.iter()? {
            let (_, value) = item?;
            out.push(deserialize_user(value.value())?);
        }
        Ok(out)
    }
}
