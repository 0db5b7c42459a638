use std::path::Path;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Router,
};
use image::ImageFormat;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{ok_with_message, ApiError, ApiResult};
use crate::generate_truncated_uuid;
use crate::AppState;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ACCEPT_TYPES: [&str; 5] = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];
pub const UPLOAD_ROUTE: &str = "/uploads";

/// Leaves room for multipart framing so oversized files reach our own check.
pub const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
}

/// Multipart `file` field as received.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Checks size, declared type and magic bytes; returns the file extension.
pub fn accept_image(content_type: Option<&str>, bytes: &[u8]) -> Result<&'static str, ApiError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::FileTooLarge);
    }
    let declared = content_type.unwrap_or_default();
    if !ACCEPT_TYPES.contains(&declared) {
        return Err(ApiError::InvalidFileType(declared.to_string()));
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok("jpg"),
        Ok(ImageFormat::Png) => Ok("png"),
        Ok(ImageFormat::Gif) => Ok("gif"),
        Ok(ImageFormat::WebP) => Ok("webp"),
        Ok(other) => Err(ApiError::InvalidFileType(format!("{:?}", other))),
        Err(_) => Err(ApiError::InvalidFileType(declared.to_string())),
    }
}

pub async fn read_file_field(multipart: &mut Multipart) -> Result<IncomingFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(IncomingFile {
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::Validation("multipart field `file` is required".to_string()))
}

/// Validates the file and writes it under `dir` with a random name.
pub async fn store_image(dir: &Path, file: IncomingFile, prefix: &str) -> Result<UploadedFile, ApiError> {
    let extension = accept_image(file.content_type.as_deref(), &file.bytes)?;
    let filename = format!("{}-{}.{}", prefix, generate_truncated_uuid(), extension);

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!("failed to create upload directory {:?}: {:?}", dir, e);
        return Err(ApiError::UploadFailed("cannot create upload directory".to_string()));
    }
    let path = dir.join(&filename);
    if let Err(e) = tokio::fs::write(&path, &file.bytes).await {
        error!("failed to write upload {:?}: {:?}", path, e);
        return Err(ApiError::UploadFailed("cannot write file".to_string()));
    }

    info!("image saved in: {:?}", path);
    Ok(UploadedFile {
        url: format!("{}/{}", UPLOAD_ROUTE, filename),
        filename,
        size: file.bytes.len(),
    })
}

pub async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<UploadedFile> {
    info!("upload_image started");
    let file = read_file_field(&mut multipart).await?;
    let stored = store_image(&state.config.upload_dir, file, "image").await?;
    Ok(ok_with_message(stored, "Image uploaded"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload/image", post(upload_image))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}
