//! Shared test-only helpers for threadpaste_core.

use crate::notify::{PublishError, Publisher};
use crate::Database;
use std::sync::Mutex;
use tempfile::TempDir;

/// Creates an isolated temporary database and returns it with the temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing files.
///
/// # Panics
/// Panics if temp-dir creation, path conversion, or database initialization
/// fails in the test environment.
pub(crate) fn setup_temp_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path.to_str().expect("db path")).expect("db");
    (db, temp_dir)
}

/// Publisher that records every `(channel, payload)` pair in order.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingPublisher {
    pub(crate) fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().expect("recorder lock").clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, channel: &str, payload: &serde_json::Value) -> Result<usize, PublishError> {
        self.events
            .lock()
            .expect("recorder lock")
            .push((channel.to_string(), payload.clone()));
        Ok(1)
    }
}

/// Publisher whose transport is always down.
pub(crate) struct FailingPublisher;

impl Publisher for FailingPublisher {
    fn publish(&self, _channel: &str, _payload: &serde_json::Value) -> Result<usize, PublishError> {
        Err(PublishError::Transport("bus offline".to_string()))
    }
}
