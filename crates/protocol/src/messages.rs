use serde::{Deserialize, Serialize};

use crate::types::SessionStatus;

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Creates a new upload session or resumes an existing one.
///
/// `file_hash` is the client-derived fingerprint of the source file and
/// doubles as the upload id; `filename`, `total_size` and `total_chunks`
/// are immutable once the session exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    pub file_hash: String,
    pub filename: String,
    pub total_size: i64,
    pub total_chunks: u32,
}

/// Handshake result: whether the session already existed and which chunk
/// indices the server has. `status` is omitted for freshly created sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    pub upload_id: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    pub uploaded_chunks: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Chunk upload
// ---------------------------------------------------------------------------

/// Acknowledgement for a stored chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadAck {
    pub message: String,
    pub index: u32,
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

/// Requests one-time finalization of a fully uploaded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub upload_id: String,
}

/// Finalize result: lowercase-hex SHA-256 of the assembled file and up to
/// ten top-level archive entry names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub message: String,
    pub hash: String,
    pub files_in_zip: Vec<String>,
}
