//! Paste-related data models.

use super::user::{Author, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical paste row as persisted (bincode-encoded).
///
/// Author and parent are stored as ids and resolved on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasteRecord {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Option<u64>,
    pub parent_id: Option<u64>,
}

/// Paste returned by the store, with its author resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paste {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<Author>,
    pub parent_id: Option<u64>,
}

/// A paste that has not been stored yet.
///
/// The creation timestamp is captured here, at construction, and carried
/// unchanged into storage.
#[derive(Debug, Clone)]
pub struct NewPaste {
    pub content: String,
    pub author: Option<Author>,
    pub parent_id: Option<u64>,
    created_at: DateTime<Utc>,
}

/// A paste together with its direct replies, oldest reply first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Thread {
    pub paste: Paste,
    pub children: Vec<Paste>,
}

/// Request payload for creating a paste.
#[derive(Debug, Deserialize)]
pub struct CreatePasteRequest {
    pub content: String,
    /// Id of the paste being replied to.
    pub reply_to: Option<u64>,
}

/// One page of a user's pastes plus the totals needed for page links.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PastePage {
    pub items: Vec<Paste>,
    /// 1-based page number that was requested.
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl NewPaste {
    /// Build an unsaved paste stamped with the current time.
    ///
    /// # Arguments
    /// - `author`: Authenticated author, or `None` for anonymous pastes.
    /// - `content`: Paste text.
    /// - `parent_id`: Paste being replied to, if any.
    pub fn new(author: Option<&User>, content: String, parent_id: Option<u64>) -> Self {
        Self {
            content,
            author: author.map(Author::from),
            parent_id,
            created_at: Utc::now(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn into_record(self, id: u64) -> (PasteRecord, Option<Author>) {
        let record = PasteRecord {
            id,
            content: self.content,
            created_at: self.created_at,
            author_id: self.author.as_ref().map(|author| author.id),
            parent_id: self.parent_id,
        };
        (record, self.author)
    }
}

impl Paste {
    pub(crate) fn from_record(record: PasteRecord, author: Option<Author>) -> Self {
        Self {
            id: record.id,
            content: record.content,
            created_at: record.created_at,
            author,
            parent_id: record.parent_id,
        }
    }

    /// Author id, if the paste is not anonymous.
    pub fn author_id(&self) -> Option<u64> {
        self.author.as_ref().map(|author| author.id)
    }
}

impl PastePage {
    /// Total number of pages (at least one, so an empty listing has page 1).
    pub fn pages(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn prev_num(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// Page 0, or an empty page past the first, does not exist.
    pub fn is_out_of_range(&self) -> bool {
        self.page == 0 || (self.items.is_empty() && self.page != 1)
    }
}
