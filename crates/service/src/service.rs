use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use zipgate_protocol::messages::{ChunkUploadAck, HandshakeRequest, HandshakeResponse};
use zipgate_protocol::types::SessionStatus;
use zipgate_store::{LockService, NewSession, SessionStore, StoreError};
use zipgate_transfer::{DEFAULT_CHUNK_SIZE, chunk_count, chunk_len, validate_upload_id, write_chunk_at};

use crate::ServiceError;

/// Tunables for the upload service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Fixed chunk size; every chunk except the last must be exactly this long.
    pub chunk_size: usize,
    /// Bounded wait for the per-upload finalize lock.
    pub finalize_lock_wait: Duration,
    /// Maximum archive entries reported by the finalize peek.
    pub peek_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            finalize_lock_wait: Duration::from_secs(5),
            peek_limit: 10,
        }
    }
}

/// Server-side coordinator for resumable chunked uploads.
///
/// Each request handler calls one method; the shared mutable state is the
/// target file (touched only through disjoint-offset writes) and the session
/// records behind the store's atomic single-row updates. Finalize is the one
/// operation serialized per upload id.
pub struct UploadService {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) locks: Arc<dyn LockService>,
    pub(crate) storage_dir: PathBuf,
    pub(crate) config: ServiceConfig,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        locks: Arc<dyn LockService>,
        storage_dir: impl Into<PathBuf>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            locks,
            storage_dir: storage_dir.into(),
            config,
        }
    }

    /// Target archive path for an upload id.
    pub fn target_path(&self, upload_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{upload_id}.zip"))
    }

    /// Creates a session or reports the progress of an existing one.
    ///
    /// Safe to repeat after any failure: for an existing id this is a pure
    /// read returning the current status and the uploaded chunk set, which
    /// is what lets a restarted client resume where it left off.
    pub async fn handshake(
        &self,
        req: HandshakeRequest,
    ) -> Result<HandshakeResponse, ServiceError> {
        validate_upload_id(&req.file_hash)
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
        if req.filename.is_empty() {
            return Err(ServiceError::InvalidRequest("filename is required".into()));
        }
        if req.total_size <= 0 {
            return Err(ServiceError::InvalidRequest(
                "totalSize must be positive".into(),
            ));
        }
        let expected = chunk_count(req.total_size, self.config.chunk_size);
        if req.total_chunks != expected {
            return Err(ServiceError::InvalidRequest(format!(
                "totalChunks {} does not match totalSize {} ({expected} expected)",
                req.total_chunks, req.total_size
            )));
        }

        if let Some(resume) = self.resume_response(&req.file_hash)? {
            return Ok(resume);
        }

        let created = self.store.create_session(NewSession {
            id: req.file_hash.clone(),
            filename: req.filename,
            total_size: req.total_size,
            total_chunks: req.total_chunks,
        });
        match created {
            Ok(()) => {
                info!(upload_id = %req.file_hash, chunks = req.total_chunks, "session created");
                Ok(HandshakeResponse {
                    upload_id: req.file_hash,
                    exists: false,
                    status: None,
                    uploaded_chunks: Vec::new(),
                })
            }
            // Lost a create race: the session exists now, so resume it.
            Err(StoreError::SessionExists(_)) => self
                .resume_response(&req.file_hash)?
                .ok_or_else(|| ServiceError::SessionNotFound(req.file_hash)),
            Err(e) => Err(e.into()),
        }
    }

    fn resume_response(&self, upload_id: &str) -> Result<Option<HandshakeResponse>, ServiceError> {
        let Some(session) = self.store.get_session(upload_id)? else {
            return Ok(None);
        };
        let uploaded = self.store.uploaded_chunks(upload_id)?;
        debug!(upload_id, uploaded = uploaded.len(), "resuming session");
        Ok(Some(HandshakeResponse {
            upload_id: session.id,
            exists: true,
            status: Some(session.status),
            uploaded_chunks: uploaded,
        }))
    }

    /// Writes one chunk at its fixed offset and records completion.
    ///
    /// Re-uploading an index with identical bytes overwrites the same byte
    /// range with the same content, so retries are safe. The chunk row moves
    /// to `Uploaded` only after the byte write fully succeeded.
    pub async fn write_chunk(
        &self,
        upload_id: &str,
        chunk_index: u32,
        bytes: Vec<u8>,
    ) -> Result<ChunkUploadAck, ServiceError> {
        let session = self
            .store
            .get_session(upload_id)?
            .ok_or_else(|| ServiceError::SessionNotFound(upload_id.to_string()))?;

        if session.status != SessionStatus::Uploading {
            return Err(ServiceError::SessionClosed(upload_id.to_string()));
        }
        if chunk_index >= session.total_chunks {
            return Err(ServiceError::ChunkOutOfRange {
                index: chunk_index,
                total: session.total_chunks,
            });
        }
        if bytes.is_empty() {
            return Err(ServiceError::InvalidRequest("empty chunk payload".into()));
        }
        let expected = chunk_len(chunk_index, session.total_size, self.config.chunk_size);
        if bytes.len() != expected {
            return Err(ServiceError::ChunkSizeMismatch {
                index: chunk_index,
                got: bytes.len(),
                expected,
            });
        }

        let path = self.target_path(upload_id);
        let offset = chunk_index as u64 * self.config.chunk_size as u64;
        // Disk I/O off the async runtime.
        tokio::task::spawn_blocking(move || write_chunk_at(&path, offset, &bytes)).await??;

        self.store
            .mark_chunk_uploaded(upload_id, chunk_index, Utc::now())?;
        debug!(upload_id, chunk = chunk_index, "chunk stored");

        Ok(ChunkUploadAck {
            message: "Chunk saved".into(),
            index: chunk_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zipgate_store::{MemoryLockService, MemoryStore};

    fn test_service(dir: &TempDir, chunk_size: usize) -> UploadService {
        UploadService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryLockService::new()),
            dir.path(),
            ServiceConfig {
                chunk_size,
                finalize_lock_wait: Duration::from_millis(200),
                peek_limit: 10,
            },
        )
    }

    fn handshake_req(id: &str, total_size: i64, chunk_size: usize) -> HandshakeRequest {
        HandshakeRequest {
            file_hash: id.into(),
            filename: "data.zip".into(),
            total_size,
            total_chunks: chunk_count(total_size, chunk_size),
        }
    }

    #[tokio::test]
    async fn handshake_creates_fresh_session() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        let resp = service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        assert_eq!(resp.upload_id, "u1");
        assert!(!resp.exists);
        assert!(resp.status.is_none());
        assert!(resp.uploaded_chunks.is_empty());
    }

    #[tokio::test]
    async fn handshake_resumes_with_uploaded_set() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        service.write_chunk("u1", 0, b"AAAA".to_vec()).await.unwrap();
        service.write_chunk("u1", 2, b"CC".to_vec()).await.unwrap();

        let resp = service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        assert!(resp.exists);
        assert_eq!(resp.status, Some(SessionStatus::Uploading));
        assert_eq!(resp.uploaded_chunks, vec![0, 2]);
    }

    #[tokio::test]
    async fn handshake_is_a_pure_read_when_repeated() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        let a = service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        let b = service.handshake(handshake_req("u1", 10, 4)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn handshake_rejects_bad_geometry() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        let mut req = handshake_req("u1", 10, 4);
        req.total_chunks = 2; // 10 bytes at chunk size 4 needs 3.
        assert!(matches!(
            service.handshake(req).await.unwrap_err(),
            ServiceError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn handshake_rejects_traversal_id() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        let mut req = handshake_req("u1", 10, 4);
        req.file_hash = "../escape".into();
        assert!(matches!(
            service.handshake(req).await.unwrap_err(),
            ServiceError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn handshake_rejects_empty_filename_and_size() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);

        let mut req = handshake_req("u1", 10, 4);
        req.filename = String::new();
        assert!(service.handshake(req).await.is_err());

        let mut req = handshake_req("u2", 0, 4);
        req.total_size = 0;
        assert!(service.handshake(req).await.is_err());
    }

    #[tokio::test]
    async fn write_chunk_places_bytes_at_offset() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);
        service.handshake(handshake_req("u1", 10, 4)).await.unwrap();

        // Out of order: final short chunk first.
        service.write_chunk("u1", 2, b"EE".to_vec()).await.unwrap();
        service.write_chunk("u1", 0, b"AABB".to_vec()).await.unwrap();
        service.write_chunk("u1", 1, b"CCDD".to_vec()).await.unwrap();

        let content = std::fs::read(service.target_path("u1")).unwrap();
        assert_eq!(&content, b"AABBCCDDEE");
    }

    #[tokio::test]
    async fn write_chunk_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);
        service.handshake(handshake_req("u1", 8, 4)).await.unwrap();

        service.write_chunk("u1", 0, b"AAAA".to_vec()).await.unwrap();
        service.write_chunk("u1", 1, b"BBBB".to_vec()).await.unwrap();
        let ack = service.write_chunk("u1", 0, b"AAAA".to_vec()).await.unwrap();
        assert_eq!(ack.index, 0);

        let content = std::fs::read(service.target_path("u1")).unwrap();
        assert_eq!(&content, b"AAAABBBB");

        let resp = service.handshake(handshake_req("u1", 8, 4)).await.unwrap();
        assert_eq!(resp.uploaded_chunks, vec![0, 1]);
    }

    #[tokio::test]
    async fn write_chunk_validates_request() {
        let dir = TempDir::new().unwrap();
        let service = test_service(&dir, 4);
        service.handshake(handshake_req("u1", 10, 4)).await.unwrap();

        assert!(matches!(
            service.write_chunk("nope", 0, b"AAAA".to_vec()).await.unwrap_err(),
            ServiceError::SessionNotFound(_)
        ));
        assert!(matches!(
            service.write_chunk("u1", 3, b"AAAA".to_vec()).await.unwrap_err(),
            ServiceError::ChunkOutOfRange { index: 3, total: 3 }
        ));
        assert!(matches!(
            service.write_chunk("u1", 0, Vec::new()).await.unwrap_err(),
            ServiceError::InvalidRequest(_)
        ));
        // Chunk 0 must be exactly chunk_size bytes.
        assert!(matches!(
            service.write_chunk("u1", 0, b"AA".to_vec()).await.unwrap_err(),
            ServiceError::ChunkSizeMismatch { index: 0, got: 2, expected: 4 }
        ));
        // Final chunk must be exactly the remainder.
        assert!(matches!(
            service.write_chunk("u1", 2, b"AAAA".to_vec()).await.unwrap_err(),
            ServiceError::ChunkSizeMismatch { index: 2, got: 4, expected: 2 }
        ));
    }
}
