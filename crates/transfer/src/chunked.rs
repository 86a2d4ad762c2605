use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Chunk arithmetic
// ---------------------------------------------------------------------------

/// Number of fixed-size chunks needed to cover `total_size` bytes.
///
/// A size that is an exact multiple of `chunk_size` yields `size / chunk_size`
/// chunks; one extra byte adds one more chunk of length 1.
pub fn chunk_count(total_size: i64, chunk_size: usize) -> u32 {
    let chunk = chunk_size as i64;
    ((total_size + chunk - 1) / chunk) as u32
}

/// Byte length of chunk `index`; only the final chunk may be shorter.
pub fn chunk_len(index: u32, total_size: i64, chunk_size: usize) -> usize {
    let start = index as i64 * chunk_size as i64;
    let remaining = total_size - start;
    remaining.clamp(0, chunk_size as i64) as usize
}

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the lowercase hex digest.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file, streaming with a fixed buffer so
/// memory stays bounded for arbitrarily large files.
pub fn digest_file(path: &Path) -> Result<String, TransferError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Positional writes
// ---------------------------------------------------------------------------

/// Writes `data` at `offset` in `path`, creating the file if absent and
/// leaving every other byte range untouched (no truncation).
///
/// Writes to disjoint offsets of the same file are independent, which is
/// what makes out-of-order chunk arrival safe without locking.
pub fn write_chunk_at(path: &Path, offset: u64, data: &[u8]) -> Result<(), TransferError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ChunkSource
// ---------------------------------------------------------------------------

/// Reads fixed-size chunks of a source file by index.
///
/// Each read opens its own file handle, so concurrent tasks can pull
/// different chunks without sharing a cursor; chunks are uploaded out of
/// order and retried independently.
#[derive(Debug)]
pub struct ChunkSource {
    path: PathBuf,
    total_size: i64,
    chunk_size: usize,
}

impl ChunkSource {
    /// Opens `path` for indexed chunk reads.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (5 MiB) is used.
    /// Empty files are rejected: a session needs at least one chunk.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let total_size = std::fs::metadata(path)?.len() as i64;
        if total_size == 0 {
            return Err(TransferError::EmptyFile(path.display().to_string()));
        }
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            path: path.to_path_buf(),
            total_size,
            chunk_size,
        })
    }

    /// Total file size in bytes.
    pub fn total_size(&self) -> i64 {
        self.total_size
    }

    /// Chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks covering the file.
    pub fn chunk_count(&self) -> u32 {
        chunk_count(self.total_size, self.chunk_size)
    }

    /// Reads the bytes of chunk `index`.
    pub fn read_chunk(&self, index: u32) -> Result<Vec<u8>, TransferError> {
        let total = self.chunk_count();
        if index >= total {
            return Err(TransferError::ChunkOutOfRange { index, total });
        }

        let len = chunk_len(index, self.total_size, self.chunk_size);
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(index as u64 * self.chunk_size as u64))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
