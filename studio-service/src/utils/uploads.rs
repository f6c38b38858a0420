//! Profile picture storage on the local filesystem.

use service_core::error::AppError;
use std::path::{Path, PathBuf};

/// Public URL prefix the upload directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Map an accepted image content type to its file extension.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Write the picture under `<dir>/avatars/` and return its public URL.
pub async fn save_profile_picture(
    dir: &Path,
    student_id: i64,
    extension: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    let avatars: PathBuf = dir.join("avatars");
    tokio::fs::create_dir_all(&avatars).await?;

    let file_name = format!("{}-{}.{}", student_id, uuid::Uuid::new_v4(), extension);
    tokio::fs::write(avatars.join(&file_name), bytes).await?;

    Ok(format!("{}/avatars/{}", UPLOADS_URL_PREFIX, file_name))
}
