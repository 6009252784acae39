//! Helper functions shared by paste storage operations.

use crate::db::user::deserialize_user;
use crate::error::AppError;
use crate::models::paste::{Paste, PasteRecord};
use crate::models::user::Author;
use redb::ReadableTable;
use std::ops::RangeInclusive;

pub(super) fn deserialize_record(bytes: &[u8]) -> Result<PasteRecord, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Key range covering every `(owner, *)` row of a composite index.
pub(super) fn owned_range(owner: u64) -> RangeInclusive<(u64, u64)> {
    (owner, 0)..=(owner, u64::MAX)
}

pub(super) fn resolve_author(
    users: &impl ReadableTable<u64, &'static [u8]>,
    author_id: Option<u64>,
) -> Result<Option<Author>, AppError> {
    let Some(author_id) = author_id else {
        return Ok(None);
    };
    match users.get(author_id)? {
        Some(guard) => Ok(Some(Author::from(&deserialize_user(guard.value())?))),
        None => {
            tracing::warn!("Paste author {} has no user row", author_id);
            Ok(None)
        }
    }
}

/// Load a paste row and resolve its author in the same read transaction.
pub(super) fn load_paste(
    pastes: &impl ReadableTable<u64, &'static [u8]>,
    users: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<Paste>, AppError> {
    let Some(record) = pastes
        .get(id)?
        .map(|guard| deserialize_record(guard.value()))
        .transpose()?
    else {
        return Ok(None);
    };
    let author = resolve_author(users, record.author_id)?;
    Ok(Some(Paste::from_record(record, author)))
}

/// Collect the second key component of every `(owner, *)` index row.
pub(super) fn indexed_ids(
    index: &impl ReadableTable<(u64, u64), ()>,
    owner: u64,
) -> Result<Vec<u64>, AppError> {
    let mut ids = Vec::new();
    for item in index.range(owned_range(owner))? {
        let (key, _) = item?;
        ids.push(key.value().1);
    }
    Ok(ids)
}
