//! Server core for resumable chunked uploads.
//!
//! [`UploadService`] implements the three protocol operations (handshake,
//! chunk write, finalize) over a [`SessionStore`](zipgate_store::SessionStore)
//! and a [`LockService`](zipgate_store::LockService). It is a library crate
//! with no HTTP dependency: the embedding server routes requests to these
//! methods and maps [`ServiceError::status_code`] onto its responses.

mod finalize;
mod service;

pub use service::{ServiceConfig, UploadService};

/// Errors produced by the upload service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("chunk {index} has {got} bytes, expected {expected}")]
    ChunkSizeMismatch {
        index: u32,
        got: usize,
        expected: usize,
    },

    #[error("session {0} is no longer accepting chunks")]
    SessionClosed(String),

    #[error("upload incomplete: {missing} chunks not yet uploaded")]
    Incomplete { missing: u32 },

    #[error("finalization already in progress")]
    FinalizeInProgress,

    #[error("store error: {0}")]
    Store(#[from] zipgate_store::StoreError),

    #[error("transfer error: {0}")]
    Transfer(#[from] zipgate_transfer::TransferError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// HTTP status for this error, for whatever routing layer embeds the
    /// service.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidRequest(_)
            | ServiceError::ChunkOutOfRange { .. }
            | ServiceError::ChunkSizeMismatch { .. } => 400,
            ServiceError::SessionNotFound(_) => 404,
            ServiceError::SessionClosed(_) | ServiceError::Incomplete { .. } => 409,
            ServiceError::FinalizeInProgress => 423,
            ServiceError::Store(_) | ServiceError::Transfer(_) | ServiceError::Join(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ServiceError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(ServiceError::SessionNotFound("x".into()).status_code(), 404);
        assert_eq!(ServiceError::Incomplete { missing: 1 }.status_code(), 409);
        assert_eq!(ServiceError::FinalizeInProgress.status_code(), 423);
        assert_eq!(
            ServiceError::Store(zipgate_store::StoreError::Backend("down".into())).status_code(),
            500
        );
    }
}
