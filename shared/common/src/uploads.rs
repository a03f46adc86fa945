use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::AppError;

/// Lowercased extension of an uploaded filename, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn content_type_matches(extension: &str, content_type: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => content_type == "image/jpeg",
        "png" => content_type == "image/png",
        "pdf" => content_type == "application/pdf",
        "mp4" => content_type == "video/mp4",
        _ => false,
    }
}

/// Validates an uploaded file against the configured limits and returns
/// its normalized extension.
pub fn validate_upload(
    filename: &str,
    content_type: &str,
    size_bytes: u64,
    config: &UploadConfig,
) -> Result<String, AppError> {
    let extension = file_extension(filename).ok_or_else(|| {
        AppError::Validation(format!("File '{}' has no extension", filename))
    })?;

    if !config.allowed_extensions.contains(&extension) {
        return Err(AppError::Validation(format!(
            "File type '{}' is not allowed (allowed: {})",
            extension,
            config.allowed_extensions.join(", ")
        )));
    }

    if !content_type_matches(&extension, content_type) {
        return Err(AppError::Validation(format!(
            "Content type '{}' does not match file extension '{}'",
            content_type, extension
        )));
    }

    if size_bytes > config.max_file_size_bytes() {
        return Err(AppError::Validation(format!(
            "File exceeds the {} MB limit",
            config.max_file_size_mb
        )));
    }

    Ok(extension)
}

/// Builds the on-disk name for an upload: `<prefix>-<user_id>-<millis>.<ext>`.
pub fn stored_filename(prefix: &str, user_id: Uuid, timestamp_millis: i64, extension: &str) -> String {
    format!("{}-{}-{}.{}", prefix, user_id, timestamp_millis, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_config() -> UploadConfig {
        UploadConfig {
            upload_dir: "uploads/test".to_string(),
            max_file_size_mb: 5,
            allowed_extensions: vec!["jpeg".to_string(), "jpg".to_string(), "png".to_string()],
        }
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn accepts_matching_image_upload() {
        let ext = validate_upload("avatar.png", "image/png", 1024, &image_config()).unwrap();
        assert_eq!(ext, "png");
    }

    #[test]
    fn rejects_disallowed_extension() {
        let err = validate_upload("notes.pdf", "application/pdf", 1024, &image_config());
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_mismatched_content_type() {
        let err = validate_upload("avatar.png", "application/octet-stream", 1024, &image_config());
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_oversized_file() {
        let too_big = 5 * 1024 * 1024 + 1;
        let err = validate_upload("avatar.jpg", "image/jpeg", too_big, &image_config());
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn stored_filename_embeds_owner_and_timestamp() {
        let user_id = Uuid::nil();
        let name = stored_filename("user", user_id, 1_700_000_000_000, "png");
        assert_eq!(
            name,
            "user-00000000-0000-0000-0000-000000000000-1700000000000.png"
        );
    }
}
