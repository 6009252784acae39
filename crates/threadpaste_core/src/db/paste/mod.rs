//! Paste storage operations backed by redb.

mod helpers;

use crate::db::{next_id, tables::*};
use crate::error::AppError;
use crate::models::paste::*;
use redb::{ReadableDatabase, ReadableTable};
use std::sync::Arc;

use self::helpers::{deserialize_record, indexed_ids, load_paste, owned_range};

/// Accessor for paste-related redb tables.
pub struct PasteDb {
    db: Arc<redb::Database>,
}

impl PasteDb {
    /// Initialize paste tables if they do not exist yet.
    ///
    /// # Returns
    /// A new [`PasteDb`] accessor bound to `db`.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PASTES)?;
        write_txn.open_table(PASTES_BY_PARENT)?;
        write_txn.open_table(PASTES_BY_AUTHOR)?;
        write_txn.open_table(USERS)?;
        write_txn.open_table(SEQUENCES)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Persist a new paste and its index rows atomically.
    ///
    /// The parent, when given, is checked inside the same write transaction,
    /// so a reply can never be stored against a missing parent.
    ///
    /// # Arguments
    /// - `draft`: Unsaved paste carrying author, parent and creation time.
    ///
    /// # Returns
    /// The stored paste with its generated id.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when the parent does not exist, or a
    /// storage/serialization error.
    pub fn create(&self, draft: NewPaste) -> Result<Paste, AppError> {
        let write_txn = self.db.begin_write()?;
        let (record, author) = {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_parent = write_txn.open_table(PASTES_BY_PARENT)?;
            let mut by_author = write_txn.open_table(PASTES_BY_AUTHOR)?;
            let mut sequences = write_txn.open_table(SEQUENCES)?;

            if let Some(parent_id) = draft.parent_id {
                if pastes.get(parent_id)?.is_none() {
                    return Err(AppError::NotFound);
                }
            }

            let id = next_id(&mut sequences, PASTE_SEQUENCE)?;
            let (record, author) = draft.into_record(id);
            let encoded = bincode::serialize(&record)?;

            pastes.insert(id, encoded.as_slice())?;
            if let Some(parent_id) = record.parent_id {
                by_parent.insert((parent_id, id), ())?;
            }
            if let Some(author_id) = record.author_id {
                by_author.insert((author_id, id), ())?;
            }
            (record, author)
        };
        write_txn.commit()?;
        Ok(Paste::from_record(record, author))
    }

    /// Fetch a paste by id.
    ///
    /// # Returns
    /// `Ok(Some(paste))` when found, `Ok(None)` when missing.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get(&self, id: u64) -> Result<Option<Paste>, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        let users = read_txn.open_table(USERS)?;
        load_paste(&pastes, &users, id)
    }

    /// Fetch a paste together with all of its direct replies in one read.
    ///
    /// # Returns
    /// `Ok(Some(thread))` with children in creation order, `Ok(None)` when missing.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get_thread(&self, id: u64) -> Result<Option<Thread>, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        let users = read_txn.open_table(USERS)?;
        let by_parent = read_txn.open_table(PASTES_BY_PARENT)?;

        let Some(paste) = load_paste(&pastes, &users, id)? else {
            return Ok(None);
        };
        let mut children = Vec::new();
        for child_id in indexed_ids(&by_parent, id)? {
            if let Some(child) = load_paste(&pastes, &users, child_id)? {
                children.push(child);
            }
        }
        Ok(Some(Thread { paste, children }))
    }

    /// Delete a paste on behalf of `requester_id`.
    ///
    /// Only the paste's author may delete it; authorless pastes cannot be
    /// deleted through this path. Replies to the deleted paste are detached
    /// (their parent is cleared) in the same transaction.
    ///
    /// # Returns
    /// Ids of the replies that were detached.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when the paste is missing,
    /// [`AppError::Unauthorized`] when the requester is not the author, or a
    /// storage/serialization error.
    pub fn delete_as(&self, id: u64, requester_id: Option<u64>) -> Result<Vec<u64>, AppError> {
        let write_txn = self.db.begin_write()?;
        let detached = {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_parent = write_txn.open_table(PASTES_BY_PARENT)?;
            let mut by_author = write_txn.open_table(PASTES_BY_AUTHOR)?;

            let Some(record) = pastes
                .get(id)?
                .map(|guard| deserialize_record(guard.value()))
                .transpose()?
            else {
                return Err(AppError::NotFound);
            };
            match (record.author_id, requester_id) {
                (Some(author), Some(requester)) if author == requester => {}
                _ => return Err(AppError::Unauthorized),
            }

            let children = indexed_ids(&by_parent, id)?;
            for child_id in &children {
                let child = pastes
                    .get(*child_id)?
                    .map(|guard| deserialize_record(guard.value()))
                    .transpose()?;
                if let Some(mut child) = child {
                    child.parent_id = None;
                    let encoded = bincode::serialize(&child)?;
                    pastes.insert(*child_id, encoded.as_slice())?;
                }
                by_parent.remove((id, *child_id))?;
            }

            if let Some(parent_id) = record.parent_id {
                by_parent.remove((parent_id, id))?;
            }
            if let Some(author_id) = record.author_id {
                by_author.remove((author_id, id))?;
            }
            pastes.remove(id)?;
            children
        };
        write_txn.commit()?;
        Ok(detached)
    }

    /// List one page of an author's pastes, newest first.
    ///
    /// # Arguments
    /// - `author_id`: Author whose pastes are listed.
    /// - `page`: 1-based page number.
    /// - `per_page`: Page size.
    ///
    /// # Returns
    /// The requested page and the author's total paste count. Out-of-range
    /// pages come back empty; see [`PastePage::is_out_of_range`].
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn list_by_author(
        &self,
        author_id: u64,
        page: usize,
        per_page: usize,
    ) -> Result<PastePage, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        let users = read_txn.open_table(USERS)?;
        let by_author = read_txn.open_table(PASTES_BY_AUTHOR)?;

        let mut total = 0usize;
        let mut ids = Vec::with_capacity(per_page);
        let skip = page.saturating_sub(1).saturating_mul(per_page);
        for item in by_author.range(owned_range(author_id))?.rev() {
            let (key, _) = item?;
            if page > 0 && total >= skip && ids.len() < per_page {
                ids.push(key.value().1);
            }
            total += 1;
        }

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(paste) = load_paste(&pastes, &users, id)? {
                items.push(paste);
            }
        }

        Ok(PastePage {
            items,
            page,
            per_page,
            total,
        })
    }
}
