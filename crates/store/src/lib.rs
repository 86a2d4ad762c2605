//! Session persistence and mutual-exclusion primitives.
//!
//! The upload service talks to storage through two narrow traits:
//! [`SessionStore`] (key-value style records for sessions and their chunk
//! rows) and [`LockService`] (named mutual exclusion with a bounded acquire
//! wait). The in-memory implementations here cover single-node deployments
//! and tests; a multi-node deployment backs the same contracts with its
//! shared database.

mod lock;
mod memory;
mod session;

pub use lock::{LockGuard, LockService, MemoryLockService};
pub use memory::MemoryStore;
pub use session::{ChunkRecord, NewSession, SessionRecord, SessionStore};

use zipgate_protocol::types::SessionStatus;

/// Errors produced by session stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already exists: {0}")]
    SessionExists(String),

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}
