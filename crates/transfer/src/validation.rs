use crate::TransferError;

/// Validates a remote file name (the last path segment of an upload target).
///
/// Rejects:
/// - Empty names
/// - Names containing `/`
/// - `.` and `..`
pub fn validate_remote_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }
    if name.contains('/') {
        return Err(TransferError::InvalidName(format!(
            "separator not allowed: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(TransferError::InvalidName(format!(
            "relative component not allowed: {name}"
        )));
    }
    Ok(())
}

/// Joins a remote directory and a file name with exactly one `/`.
pub fn join_remote_path(directory: &str, name: &str) -> String {
    format!("{}/{}", directory.trim_end_matches('/'), name)
}
