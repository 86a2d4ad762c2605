use serde::{Deserialize, Serialize};

/// Lifecycle of an upload session.
///
/// Strictly forward-moving: a session never returns to `Uploading` once
/// finalization has started. The variant order matters; stores compare
/// statuses to reject backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Uploading,
    Processing,
    Completed,
}

/// Server-side state of a single chunk. One-way: `Pending` → `Uploaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChunkState {
    Pending,
    Uploaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Uploading).unwrap(),
            "\"UPLOADING\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn chunk_state_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&ChunkState::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&ChunkState::Uploaded).unwrap(),
            "\"UPLOADED\""
        );
    }

    #[test]
    fn session_status_is_ordered_forward() {
        assert!(SessionStatus::Uploading < SessionStatus::Processing);
        assert!(SessionStatus::Processing < SessionStatus::Completed);
    }

    #[test]
    fn session_status_roundtrip() {
        let s: SessionStatus = serde_json::from_str("\"PROCESSING\"").unwrap();
        assert_eq!(s, SessionStatus::Processing);
    }
}
