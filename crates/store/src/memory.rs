use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use zipgate_protocol::types::{ChunkState, SessionStatus};

use crate::session::{ChunkRecord, NewSession, SessionRecord, SessionStore};
use crate::StoreError;

/// In-memory [`SessionStore`] for single-node deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, SessionEntry>>,
}

struct SessionEntry {
    record: SessionRecord,
    chunks: Vec<ChunkRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.get(id).map(|entry| entry.record.clone()))
    }

    fn create_session(&self, session: NewSession) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.contains_key(&session.id) {
            return Err(StoreError::SessionExists(session.id));
        }

        let chunks = vec![
            ChunkRecord {
                state: ChunkState::Pending,
                received_at: None,
            };
            session.total_chunks as usize
        ];
        let record = SessionRecord {
            id: session.id.clone(),
            filename: session.filename,
            total_size: session.total_size,
            total_chunks: session.total_chunks,
            status: SessionStatus::Uploading,
            final_hash: None,
            created_at: Utc::now(),
        };
        // Single map insert: the session and its chunk rows appear together.
        inner.insert(session.id, SessionEntry { record, chunks });
        Ok(())
    }

    fn uploaded_chunks(&self, id: &str) -> Result<Vec<u32>, StoreError> {
        let inner = self.inner.read().unwrap();
        let entry = inner
            .get(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        Ok(entry
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| chunk.state == ChunkState::Uploaded)
            .map(|(index, _)| index as u32)
            .collect())
    }

    fn chunk(&self, id: &str, index: u32) -> Result<ChunkRecord, StoreError> {
        let inner = self.inner.read().unwrap();
        let entry = inner
            .get(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        entry
            .chunks
            .get(index as usize)
            .copied()
            .ok_or(StoreError::ChunkOutOfRange {
                index,
                total: entry.record.total_chunks,
            })
    }

    fn mark_chunk_uploaded(
        &self,
        id: &str,
        index: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        let total = entry.record.total_chunks;
        let chunk = entry
            .chunks
            .get_mut(index as usize)
            .ok_or(StoreError::ChunkOutOfRange { index, total })?;

        if chunk.state == ChunkState::Pending {
            chunk.state = ChunkState::Uploaded;
            chunk.received_at = Some(at);
        }
        Ok(())
    }

    fn set_status(&self, id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;

        if status < entry.record.status {
            return Err(StoreError::InvalidTransition {
                from: entry.record.status,
                to: status,
            });
        }
        entry.record.status = status;
        Ok(())
    }

    fn complete(&self, id: &str, final_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;

        if entry.record.final_hash.is_some() {
            return Err(StoreError::InvalidTransition {
                from: entry.record.status,
                to: SessionStatus::Completed,
            });
        }
        entry.record.status = SessionStatus::Completed;
        entry.record.final_hash = Some(final_hash.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session(id: &str, total_chunks: u32) -> NewSession {
        NewSession {
            id: id.into(),
            filename: "backup.zip".into(),
            total_size: total_chunks as i64 * 8,
            total_chunks,
        }
    }

    #[test]
    fn create_populates_full_chunk_set() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 4)).unwrap();

        let record = store.get_session("s1").unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Uploading);
        assert_eq!(record.total_chunks, 4);
        assert!(record.final_hash.is_none());

        assert!(store.uploaded_chunks("s1").unwrap().is_empty());
        for index in 0..4 {
            let chunk = store.chunk("s1", index).unwrap();
            assert_eq!(chunk.state, ChunkState::Pending);
            assert!(chunk.received_at.is_none());
        }
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 2)).unwrap();
        assert!(matches!(
            store.create_session(new_session("s1", 2)).unwrap_err(),
            StoreError::SessionExists(_)
        ));
    }

    #[test]
    fn missing_session_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_session("nope").unwrap().is_none());
        assert!(matches!(
            store.uploaded_chunks("nope").unwrap_err(),
            StoreError::SessionNotFound(_)
        ));
    }

    #[test]
    fn mark_chunk_records_timestamp_once() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 3)).unwrap();

        let first = Utc::now();
        store.mark_chunk_uploaded("s1", 1, first).unwrap();
        let chunk = store.chunk("s1", 1).unwrap();
        assert_eq!(chunk.state, ChunkState::Uploaded);
        assert_eq!(chunk.received_at, Some(first));

        // Re-marking keeps the original arrival time.
        let later = first + chrono::Duration::seconds(30);
        store.mark_chunk_uploaded("s1", 1, later).unwrap();
        assert_eq!(store.chunk("s1", 1).unwrap().received_at, Some(first));

        assert_eq!(store.uploaded_chunks("s1").unwrap(), vec![1]);
    }

    #[test]
    fn mark_chunk_rejects_out_of_range() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 2)).unwrap();
        assert!(matches!(
            store.mark_chunk_uploaded("s1", 2, Utc::now()).unwrap_err(),
            StoreError::ChunkOutOfRange { index: 2, total: 2 }
        ));
    }

    #[test]
    fn uploaded_chunks_ascending() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 5)).unwrap();
        for index in [4, 0, 2] {
            store.mark_chunk_uploaded("s1", index, Utc::now()).unwrap();
        }
        assert_eq!(store.uploaded_chunks("s1").unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn status_moves_forward_only() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 1)).unwrap();

        store.set_status("s1", SessionStatus::Processing).unwrap();
        // Re-entering the same status is allowed (finalize retry).
        store.set_status("s1", SessionStatus::Processing).unwrap();

        assert!(matches!(
            store.set_status("s1", SessionStatus::Uploading).unwrap_err(),
            StoreError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn complete_sets_status_and_hash_together() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 1)).unwrap();
        store.set_status("s1", SessionStatus::Processing).unwrap();

        store.complete("s1", &"ab".repeat(32)).unwrap();
        let record = store.get_session("s1").unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.final_hash, Some("ab".repeat(32)));
    }

    #[test]
    fn complete_writes_hash_at_most_once() {
        let store = MemoryStore::new();
        store.create_session(new_session("s1", 1)).unwrap();
        store.complete("s1", "first").unwrap();

        assert!(matches!(
            store.complete("s1", "second").unwrap_err(),
            StoreError::InvalidTransition { .. }
        ));
        let record = store.get_session("s1").unwrap().unwrap();
        assert_eq!(record.final_hash.as_deref(), Some("first"));
    }
}
