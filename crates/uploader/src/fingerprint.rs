use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::UploadError;

/// Stable fingerprint of a local file: `{name}-{size}-{mtimeMillis}`.
///
/// The same unmodified file always produces the same id, which is what lets
/// a handshake after a full client restart find the earlier session and
/// resume it. Path separators in the name are sanitized because the server
/// uses the id as a file name.
pub fn file_fingerprint(path: &Path) -> Result<String, UploadError> {
    let meta = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .replace(['/', '\\'], "_");
    let modified_ms = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(format!("{name}-{}-{modified_ms}", meta.len()))
}
