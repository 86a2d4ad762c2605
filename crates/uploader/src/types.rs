//! Data types for the upload scheduler.

use serde::Serialize;

/// Client-side state of one chunk's transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// Not yet attempted.
    Pending,
    /// An attempt is in flight.
    Uploading,
    /// Waiting out a backoff delay before the next attempt.
    Retrying,
    /// Acknowledged by the server.
    Success,
    /// All attempts exhausted; needs caller intervention.
    Error,
}

/// Observational snapshot emitted by the progress reporter.
///
/// Percent complete comes from the success count; rate and ETA from
/// cumulative bytes transferred since the run started. None of it is used
/// for correctness.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub upload_id: String,
    pub total_chunks: u32,
    pub succeeded_chunks: u32,
    pub percent: f64,
    pub bytes_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<f64>,
}

/// Event emitted while an upload runs.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Periodic progress snapshot.
    Progress(UploadProgress),
    /// A chunk exhausted its retries.
    ChunkFailed { index: u32 },
    /// The server finalized and verified the upload.
    Completed {
        hash: String,
        files_in_zip: Vec<String>,
    },
    /// The upload did not complete.
    Failed { error: String },
}

/// Outcome of a finished upload: the server's verification result.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub hash: String,
    pub files_in_zip: Vec<String>,
}
