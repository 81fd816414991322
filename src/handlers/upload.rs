use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::path::PathBuf;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

/// The maximum accepted file size, in bytes.
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Content types accepted for upload, with the extension each is stored
/// under. Detection is by magic bytes, never the client-supplied header.
const ALLOWED_MIMES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("application/pdf", "pdf"),
];

/// The response payload for a successful upload.
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
}

fn extension_for(mime: &str) -> Option<&'static str> {
    ALLOWED_MIMES
        .iter()
        .find(|(allowed, _)| *allowed == mime)
        .map(|(_, ext)| *ext)
}

/// Handles a single-file multipart upload.
///
/// Expects one field named `file`. The payload is size-capped, sniffed for
/// an allow-listed content type, and stored under a random hex filename so
/// a client-chosen name never touches the filesystem.
#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Parse error: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Multipart(format!("file field: {}", e)))?;
            file_bytes = Some(bytes.to_vec());
            break;
        }
    }

    let data = file_bytes.ok_or_else(|| AppError::BadRequest("No file received".to_string()))?;

    if data.is_empty() {
        return Err(AppError::BadRequest("No file was uploaded.".to_string()));
    }

    if data.len() > MAX_FILE_SIZE {
        let size_mb = data.len() as f64 / (1024.0 * 1024.0);
        return Err(AppError::BadRequest(format!(
            "File too large ({:.2} MB). Max allowed: 5 MB",
            size_mb
        )));
    }

    let detected_mime = infer::get(&data)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let extension = extension_for(&detected_mime).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid file type: {}. Allowed: JPG, PNG, PDF",
            detected_mime
        ))
    })?;

    let mut name_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut name_bytes);
    let filename = format!("{}.{}", hex::encode(name_bytes), extension);

    let upload_dir = PathBuf::from(&state.config.upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;

    let destination = upload_dir.join(&filename);
    tokio::fs::write(&destination, &data).await?;

    tracing::info!(
        "📦 File uploaded: {} ({} bytes, {})",
        filename,
        data.len(),
        detected_mime
    );

    let response = UploadResponse {
        success: true,
        message: "File uploaded successfully".to_string(),
        filename: filename.clone(),
        size: data.len(),
        content_type: detected_mime,
        url: format!("/uploads/{}", filename),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
