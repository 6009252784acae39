//! redb table definitions shared by storage modules.

use redb::TableDefinition;

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "data.redb";

/// Canonical paste rows (`PasteRecord`, bincode-encoded).
pub const PASTES: TableDefinition<u64, &[u8]> = TableDefinition::new("pastes");
/// Reply index keyed by `(parent_id, child_id)`.
pub const PASTES_BY_PARENT: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("pastes_by_parent");
/// Authorship index keyed by `(author_id, paste_id)`.
pub const PASTES_BY_AUTHOR: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("pastes_by_author");

/// Canonical user rows (`User`, bincode-encoded).
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
/// Unique provider id -> user id.
pub const USERS_BY_PROVIDER: TableDefinition<&str, u64> =
    TableDefinition::new("users_by_provider");

/// Monotonic id sequences, one row per entity kind.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence key for paste ids.
pub const PASTE_SEQUENCE: &str = "pastes";
/// Sequence key for user ids.
pub const USER_SEQUENCE: &str = "users";
