//! Document upload rules: MIME allow-list, size ceiling, storage keys.

use crate::error::CoreError;
use crate::types::DbId;

/// Largest accepted upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types a client may upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/csv",
    "text/plain",
];

/// Longest file name kept in a storage key.
const MAX_FILE_NAME_LEN: usize = 100;

/// Reject uploads with a disallowed type, no content, or over the size limit.
pub fn validate_upload(mime_type: &str, size: usize) -> Result<(), CoreError> {
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(CoreError::Validation(format!(
            "File type '{mime_type}' is not allowed"
        )));
    }
    if size == 0 {
        return Err(CoreError::Validation("File is empty".into()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "File exceeds the maximum size of {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and cap the length.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build a random, collision-free storage key for a project document.
pub fn document_storage_key(project_id: DbId, file_name: &str) -> String {
    format!(
        "projects/{project_id}/{}-{}",
        uuid::Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_under_limit_is_accepted() {
        assert!(validate_upload("application/pdf", 1024).is_ok());
        assert!(validate_upload("text/csv", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn disallowed_type_is_rejected() {
        assert!(validate_upload("application/x-msdownload", 10).is_err());
    }

    #[test]
    fn oversize_and_empty_are_rejected() {
        assert!(validate_upload("application/pdf", MAX_UPLOAD_BYTES + 1).is_err());
        assert!(validate_upload("application/pdf", 0).is_err());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("My Contract (v2).pdf"), "My_Contract__v2_.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn storage_keys_are_unique_and_scoped() {
        let a = document_storage_key(7, "sow.pdf");
        let b = document_storage_key(7, "sow.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("projects/7/"));
        assert!(a.ends_with("-sow.pdf"));
    }
}
