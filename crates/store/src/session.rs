use chrono::{DateTime, Utc};

use zipgate_protocol::types::{ChunkState, SessionStatus};

use crate::StoreError;

/// Persistent record of one upload session.
///
/// `id`, `filename`, `total_size` and `total_chunks` are fixed at handshake;
/// `status` only moves forward and `final_hash` is set exactly once, together
/// with the transition to `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub filename: String,
    pub total_size: i64,
    pub total_chunks: u32,
    pub status: SessionStatus,
    pub final_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Facts declared at handshake for a session that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub filename: String,
    pub total_size: i64,
    pub total_chunks: u32,
}

/// State of one chunk row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord {
    pub state: ChunkState,
    pub received_at: Option<DateTime<Utc>>,
}

/// Key-value style persistence for sessions and their chunk rows.
///
/// Implementations must be safe to call from concurrent request handlers:
/// each method is a single atomic step against the backing store.
pub trait SessionStore: Send + Sync {
    /// Returns the session record, or `None` if no such session exists.
    fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Creates the session (`Uploading`) and all `total_chunks` pending
    /// chunk rows in one atomic step; a session must never be observable
    /// without its full chunk set.
    fn create_session(&self, session: NewSession) -> Result<(), StoreError>;

    /// Indices of chunks already uploaded, ascending.
    fn uploaded_chunks(&self, id: &str) -> Result<Vec<u32>, StoreError>;

    /// Returns one chunk row.
    fn chunk(&self, id: &str, index: u32) -> Result<ChunkRecord, StoreError>;

    /// Marks one chunk uploaded with its arrival time.
    ///
    /// Idempotent: a chunk that is already uploaded keeps its original
    /// timestamp (the transition is one-way).
    fn mark_chunk_uploaded(
        &self,
        id: &str,
        index: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Moves the session status forward. Backward transitions are rejected;
    /// setting the current status again is allowed so an interrupted
    /// finalize can re-enter `Processing`.
    fn set_status(&self, id: &str, status: SessionStatus) -> Result<(), StoreError>;

    /// Sets `Completed` and the final hash in a single update. Rejected if
    /// the session already holds a final hash.
    fn complete(&self, id: &str, final_hash: &str) -> Result<(), StoreError>;
}
