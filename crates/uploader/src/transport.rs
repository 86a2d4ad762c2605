use std::future::Future;
use std::pin::Pin;

use zipgate_protocol::messages::{
    ChunkUploadAck, FinalizeResponse, HandshakeRequest, HandshakeResponse,
};

use crate::UploadError;

/// Abstract wire to the upload server.
///
/// The app implements this on top of its HTTP client; using a trait keeps
/// the scheduler decoupled from transport and testable with in-process
/// fakes. Handshake and chunk calls should carry short network timeouts,
/// while `finalize` needs a generous one: the server streams the whole
/// file through a hash before answering.
pub trait Transport: Send + Sync {
    /// Creates or resumes the server session for this file.
    fn handshake(
        &self,
        req: HandshakeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HandshakeResponse, UploadError>> + Send + '_>>;

    /// Sends one chunk's bytes for the given index.
    fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u32,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkUploadAck, UploadError>> + Send + '_>>;

    /// Requests finalization once every chunk is uploaded.
    fn finalize(
        &self,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<FinalizeResponse, UploadError>> + Send + '_>>;
}
