//! Wire protocol types for the zipgate resumable upload API.
//!
//! Three operations make up the protocol: handshake (create-or-resume a
//! session), chunk upload (binary payload addressed by upload id + chunk
//! index) and finalize (one-time verification and archive summary). All
//! JSON bodies use camelCase field names; the chunk payload itself is
//! carried out-of-band by the embedding HTTP layer.

pub mod messages;
pub mod types;

pub use messages::{
    ChunkUploadAck, FinalizeRequest, FinalizeResponse, HandshakeRequest, HandshakeResponse,
};
pub use types::{ChunkState, SessionStatus};
