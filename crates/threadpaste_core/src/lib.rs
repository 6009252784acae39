//! Core domain library for threadpaste (config, storage, models, reply fan-out).

/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Per-request caller context.
pub mod context;
/// Database access layer.
pub mod db;
/// Process-global environment helpers.
pub mod env;
/// Application error types (storage/domain).
pub mod error;
/// Data models for API requests and persistence.
pub mod models;
/// Reply notification payloads and the publisher seam.
pub mod notify;
/// Paste workflows shared by HTTP handlers.
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Config, OAuthConfig};
pub use constants::DEFAULT_PORT;
pub use context::RequestContext;
pub use db::Database;
pub use error::AppError;
pub use notify::{Channel, PublishError, Publisher, ReplyNotice, ReplyNotifier};
pub use service::PasteService;
