use crate::TransferError;

/// Validates a client-supplied upload id before it becomes a file name.
///
/// The id is joined into `<storage_dir>/<id>.zip`, so it must stay a single
/// path component. Rejects:
/// - Empty ids and ids over 200 bytes (the target name plus suffix must fit
///   common filename limits)
/// - Path separators (`/`, `\`) and NUL
/// - `.` and `..`
pub fn validate_upload_id(id: &str) -> Result<(), TransferError> {
    if id.is_empty() {
        return Err(TransferError::InvalidId("empty id".into()));
    }

    if id.len() > 200 {
        return Err(TransferError::InvalidId(format!(
            "id too long ({} bytes)",
            id.len()
        )));
    }

    if id == "." || id == ".." {
        return Err(TransferError::InvalidId(format!(
            "relative path component not allowed: {id}"
        )));
    }

    if id.chars().any(|c| c == '/' || c == '\\' || c == '\0') {
        return Err(TransferError::InvalidId(format!(
            "path separator not allowed: {id}"
        )));
    }

    Ok(())
}
