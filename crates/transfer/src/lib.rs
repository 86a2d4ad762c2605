//! Chunked file transfer primitives.
//!
//! Chunk arithmetic, positional writes into a single target file (so chunks
//! may arrive out of order), streaming SHA-256 digests and a lazy,
//! entry-at-a-time ZIP name iterator for the finalize peek.

mod archive;
mod chunked;
mod validation;

pub use archive::{PEEK_OPEN_FAILED, PEEK_READ_FAILED, ZipEntryNames, peek_archive};
pub use chunked::{ChunkSource, chunk_count, chunk_len, digest_bytes, digest_file, write_chunk_at};
pub use validation::validate_upload_id;

/// Fixed chunk size: 5 MiB.
///
/// Every chunk except possibly the last occupies exactly this many bytes;
/// chunk `i` starts at byte offset `i * DEFAULT_CHUNK_SIZE`.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("invalid upload id: {0}")]
    InvalidId(String),

    #[error("file is empty: {0}")]
    EmptyFile(String),
}
