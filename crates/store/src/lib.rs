//! Event store for Tansu contract events
//!
//! This crate owns the two persisted tables (`event` and `latest_ledger`) and
//! every read and write against them. Callers go through [`EventStore`]; the
//! Sea-ORM backed implementation is [`SeaOrmStore`].
//!
//! Inserts ignore duplicates: a row whose `(action, project_key, value)`
//! already exists is skipped rather than failing the batch. The value is
//! compared through its SHA-256 digest so payload size is not bounded by the
//! index entry limit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod database;
pub mod entity;
pub mod notifier;
pub mod schema;

pub use database::SeaOrmStore;
pub use entity::*;
pub use notifier::{InsertNotifier, spawn_event_logger};

/// Default maximum number of rows returned by a query
pub const DEFAULT_QUERY_LIMIT: u64 = 1000;

/// Largest limit the database drivers can bind (signed 64-bit)
pub const MAX_QUERY_LIMIT: u64 = i64::MAX as u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Contract actions tracked by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Register,
    Commit,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Register => "register",
            EventAction::Commit => "commit",
        }
    }

    /// Classify the first topic of a contract event.
    /// Covers both the short symbols and the named events of newer contract versions.
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            "register" | "project_registered" => Some(EventAction::Register),
            "commit" => Some(EventAction::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "register" => Ok(EventAction::Register),
            "commit" => Ok(EventAction::Commit),
            other => Err(format!("Unknown event action: {}", other)),
        }
    }
}

/// An event record before insertion (no surrogate id yet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub ledger: i64,
    pub action: String,
    pub project_key: String,
    pub value: String,
}

/// Hex SHA-256 of an event value, the column duplicate detection is keyed on
pub fn value_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Filter for [`EventStore::query_events`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub project_key: String,
    /// `None` matches every action
    pub action: Option<EventAction>,
    pub limit: u64,
}

impl EventQuery {
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            action: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn with_action(mut self, action: Option<EventAction>) -> Self {
        self.action = action;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

/// Result of a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    /// Rows that already existed
    pub skipped: usize,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a batch in one transaction. Any database error rolls back the whole batch.
    async fn insert_events(&self, events: &[NewEvent]) -> Result<InsertOutcome>;

    /// Events for a project, in insertion order
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<event::Model>>;

    /// Highest ledger recorded as fully ingested
    async fn latest_ledger(&self) -> Result<Option<i64>>;

    async fn record_latest_ledger(&self, ledger: i64) -> Result<()>;
}
