//! Data models for API requests and persistence.

/// Paste, thread and pagination types.
pub mod paste;
/// User and provider identity types.
pub mod user;
