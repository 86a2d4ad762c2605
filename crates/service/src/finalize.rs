use std::sync::Arc;

use tracing::{info, warn};

use zipgate_protocol::messages::FinalizeResponse;
use zipgate_protocol::types::SessionStatus;
use zipgate_store::LockGuard;
use zipgate_transfer::{digest_bytes, digest_file, peek_archive};

use crate::{ServiceError, UploadService};

/// Lock name for an upload id: lowercase-hex SHA-256 of `finalize_{id}`.
///
/// Always 64 characters, so arbitrarily long upload ids stay inside the
/// identifier-length limits of store-backed lock services.
fn lock_token(upload_id: &str) -> String {
    digest_bytes(format!("finalize_{upload_id}").as_bytes())
}

impl UploadService {
    /// One-time-effective completion of a fully uploaded session.
    ///
    /// Exactly one caller per upload id gets to do the work: losers of the
    /// per-upload lock receive [`ServiceError::FinalizeInProgress`] after a
    /// bounded wait, and callers arriving after completion get the stored
    /// hash back without any recomputation. An interrupted finalize leaves
    /// the session in `Processing`, which a later call re-enters under the
    /// same lock and retries from the top.
    pub async fn finalize(&self, upload_id: &str) -> Result<FinalizeResponse, ServiceError> {
        self.store
            .get_session(upload_id)?
            .ok_or_else(|| ServiceError::SessionNotFound(upload_id.to_string()))?;

        let guard = {
            let locks = Arc::clone(&self.locks);
            let token = lock_token(upload_id);
            let wait = self.config.finalize_lock_wait;
            // The bounded wait blocks, so it runs off the async runtime.
            tokio::task::spawn_blocking(move || LockGuard::acquire(locks, token, wait)).await?
        }
        .ok_or(ServiceError::FinalizeInProgress)?;
        // From here on the guard releases the lock on every path, errors
        // included.

        // Re-check under the lock: a concurrent caller may have finished.
        let session = self
            .store
            .get_session(upload_id)?
            .ok_or_else(|| ServiceError::SessionNotFound(upload_id.to_string()))?;

        if session.status == SessionStatus::Completed {
            let hash = session.final_hash.unwrap_or_default();
            let files = self.peek(upload_id).await?;
            info!(upload_id, "finalize replay, returning stored result");
            drop(guard);
            return Ok(FinalizeResponse {
                message: "Already completed".into(),
                hash,
                files_in_zip: files,
            });
        }

        // Every chunk must have arrived before the file is hashed.
        let uploaded = self.store.uploaded_chunks(upload_id)?.len() as u32;
        if uploaded < session.total_chunks {
            warn!(
                upload_id,
                uploaded,
                total = session.total_chunks,
                "finalize rejected, upload incomplete"
            );
            return Err(ServiceError::Incomplete {
                missing: session.total_chunks - uploaded,
            });
        }

        // Visible to other observers as "in progress" while we hash.
        self.store.set_status(upload_id, SessionStatus::Processing)?;

        let path = self.target_path(upload_id);
        let peek_limit = self.config.peek_limit;
        let (hash, files) = tokio::task::spawn_blocking(move || {
            // Digest failure is a hard error; the peek degrades internally.
            let hash = digest_file(&path)?;
            let files = peek_archive(&path, peek_limit);
            Ok::<_, ServiceError>((hash, files))
        })
        .await??;

        self.store.complete(upload_id, &hash)?;
        info!(upload_id, hash = %hash, entries = files.len(), "upload finalized");
        drop(guard);

        Ok(FinalizeResponse {
            message: "Upload finalized successfully".into(),
            hash,
            files_in_zip: files,
        })
    }

    async fn peek(&self, upload_id: &str) -> Result<Vec<String>, ServiceError> {
        let path = self.target_path(upload_id);
        let peek_limit = self.config.peek_limit;
        Ok(tokio::task::spawn_blocking(move || peek_archive(&path, peek_limit)).await?)
    }
}
