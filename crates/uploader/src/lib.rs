//! Client-side upload scheduler.
//!
//! This crate implements the **driving half** of the resumable upload
//! protocol: split a file into fixed-size chunks, resume from the server's
//! handshake answer, keep a bounded number of chunks in flight, retry each
//! chunk with exponential backoff, and finalize once every chunk has
//! succeeded. It is a library crate with no HTTP dependency: the app
//! provides a [`Transport`] implementation bridging to its HTTP client.
//!
//! # Pipeline
//!
//! 1. **Fingerprint**: derive the stable upload id from the source file
//! 2. **Handshake**: create or resume the server session
//! 3. **Schedule**: send missing chunks under the concurrency cap
//! 4. **Finalize**: request the verified hash and archive summary

pub mod chunks;
pub mod fingerprint;
pub mod progress;
pub mod scheduler;
pub mod transport;
pub mod types;

pub use chunks::ChunkBoard;
pub use fingerprint::file_fingerprint;
pub use progress::SpeedEstimator;
pub use scheduler::{Uploader, UploaderConfig};
pub use transport::Transport;
pub use types::{ChunkStatus, UploadEvent, UploadOutcome, UploadProgress};

/// Errors produced while driving an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] zipgate_transfer::TransferError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{failed} chunks failed after retries")]
    ChunksFailed { failed: u32 },

    #[error("cancelled")]
    Cancelled,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
