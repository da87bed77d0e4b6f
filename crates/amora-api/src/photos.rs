use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use rand::Rng;
use tracing::error;

use amora_types::api::UploadResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// 10 MB upload limit for photos
pub const MAX_PHOTO_SIZE: usize = 10 * 1024 * 1024;

/// Reduce a photo reference (`/api/images/abc.jpg`, a bare name, or anything
/// a client cooked up) to its basename. Path traversal never reaches disk.
pub(crate) fn basename(reference: &str) -> Option<&str> {
    FsPath::new(reference).file_name().and_then(|n| n.to_str())
}

/// Collision-resistant sealed-file name: millisecond prefix, random suffix,
/// original extension.
fn unique_name(original: Option<&str>) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        suffix,
        file_extension(original)
    )
}

fn file_extension(name: Option<&str>) -> String {
    name.and_then(|n| FsPath::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn content_type_for(name: &str) -> &'static str {
    match FsPath::new(name).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// POST /api/upload — multipart `photo` field, sealed and written to the
/// upload dir. Returns a retrieval reference; attaching it to a profile is a
/// separate update call.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut uploaded = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed upload body".to_string()))?
    {
        if field.name() != Some("photo") {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Malformed upload body".to_string()))?;
        uploaded = Some((original_name, data));
        break;
    }

    let (original_name, data) =
        uploaded.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }
    if data.len() > MAX_PHOTO_SIZE {
        return Err(ApiError::BadRequest("Photo too large".to_string()));
    }

    let sealed = state.codec.seal_bytes(&data)?;
    let name = unique_name(original_name.as_deref());

    // Idempotent; a concurrent create is fine.
    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload dir: {}", e);
        ApiError::Internal(e.into())
    })?;

    let path = state.upload_dir.join(&name);
    tokio::fs::write(&path, &sealed).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("/api/images/{}", name),
        }),
    ))
}

/// GET /api/images/{filename} — open the sealed file and stream the bytes.
/// A missing file is 404; corruption is a hard 500.
pub async fn fetch_photo(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = basename(&filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid image reference".to_string()))?;

    let path = state.upload_dir.join(name);
    let sealed = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("Image not found".to_string()))?;

    let bytes = state.codec.open_bytes(&sealed)?;

    Ok(([(header::CONTENT_TYPE, content_type_for(name))], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_directories() {
        assert_eq!(basename("1712-42.jpg"), Some("1712-42.jpg"));
        assert_eq!(basename("/api/images/1712-42.jpg"), Some("1712-42.jpg"));
        assert_eq!(basename("../../etc/passwd"), Some("passwd"));
        assert_eq!(basename(".."), None);
        assert_eq!(basename(""), None);
    }

    #[test]
    fn unique_names_carry_the_extension() {
        let name = unique_name(Some("me.JPG"));
        assert!(name.ends_with(".jpg"));
        assert!(name.contains('-'));

        // No usable extension: bare name.
        let name = unique_name(Some("file.with weird ext!"));
        assert!(!name.contains('.'));
        assert!(!unique_name(None).contains('.'));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
