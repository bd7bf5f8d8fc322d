//! `POST /api/upload`: receive one document, extract, clean up.
//!
//! The file is streamed to a uniquely named file in the upload directory
//! and owned by a [`TransientUpload`] guard. The guard deletes the file
//! when it goes out of scope, so every exit path (success, validation
//! error, model error, or the client hanging up mid-request and the
//! handler future being dropped) leaves the directory as it found it.

use super::error::ApiError;
use super::AppState;
use crate::config::{ServerConfig, UPLOAD_FIELD};
use crate::error::{ExtractError, ValidationError};
use crate::output::ExtractionResult;
use crate::pipeline::validate;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub const SUCCESS_MESSAGE: &str = "Document processed successfully";

/// Body of a 200 reply: the result fields plus a status line.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<TransientUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring form field {:?}", field.name());
            continue;
        }
        if upload.is_some() {
            return Err(ValidationError::MultipleFiles {
                field: UPLOAD_FIELD.to_string(),
            }
            .into());
        }
        upload = Some(TransientUpload::receive(field, &state.server).await?);
    }

    let upload = upload.ok_or_else(|| ValidationError::MissingFile {
        field: UPLOAD_FIELD.to_string(),
    })?;

    info!(
        file_name = %upload.original_name,
        size = upload.size,
        mime_type = %upload.mime_type,
        "Received upload"
    );

    let result = state
        .extractor
        .extract_file(upload.path(), &upload.original_name)
        .await?;

    Ok(Json(UploadResponse {
        message: SUCCESS_MESSAGE,
        result,
    }))
}

/// An uploaded document on disk, deleted on drop.
#[derive(Debug)]
pub struct TransientUpload {
    path: Option<TempPath>,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl TransientUpload {
    /// Stream `field` into the upload directory.
    ///
    /// The declared MIME type is checked before any byte is written, and
    /// the size ceiling is checked per chunk so an oversized upload stops
    /// as soon as it crosses the limit.
    pub async fn receive(mut field: Field<'_>, config: &ServerConfig) -> Result<Self, ApiError> {
        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ValidationError::MissingFile {
                field: UPLOAD_FIELD.to_string(),
            })?;
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        validate::validate_mime_type(&mime_type, &config.allowed_mime_types)?;

        let (file, temp_path) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&config.upload_dir)
            .map_err(|e| io_error(&config.upload_dir, e))?
            .into_parts();

        // From here on the guard owns the file.
        let mut upload = Self {
            path: Some(temp_path),
            original_name,
            mime_type,
            size: 0,
        };
        let mut file = tokio::fs::File::from_std(file);

        while let Some(chunk) = field.chunk().await? {
            let size = upload.size + chunk.len() as u64;
            if size > config.max_upload_bytes {
                return Err(ValidationError::FileTooLarge {
                    size,
                    max: config.max_upload_bytes,
                }
                .into());
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error(upload.path(), e))?;
            upload.size = size;
        }
        file.flush().await.map_err(|e| io_error(upload.path(), e))?;

        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TransientUpload {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let removed: PathBuf = path.to_path_buf();
        match path.close() {
            Ok(()) => debug!("Removed transient upload {}", removed.display()),
            Err(e) => warn!(
                file_name = %self.original_name,
                stage = "cleanup",
                error = %e,
                "Failed to remove transient upload {}",
                removed.display()
            ),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ApiError {
    ApiError::Extract(ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_in(dir: &Path) -> (TransientUpload, PathBuf) {
        let temp_path = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)
            .unwrap()
            .into_temp_path();
        let on_disk = temp_path.to_path_buf();
        let upload = TransientUpload {
            path: Some(temp_path),
            original_name: "id.jpg".into(),
            mime_type: "image/jpeg".into(),
            size: 0,
        };
        (upload, on_disk)
    }

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, on_disk) = guard_in(dir.path());
        assert!(on_disk.exists());
        assert_eq!(upload.path(), on_disk.as_path());

        drop(upload);
        assert!(!on_disk.exists());
    }

    #[test]
    fn drop_tolerates_a_file_that_is_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, on_disk) = guard_in(dir.path());
        std::fs::remove_file(&on_disk).unwrap();

        drop(upload);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
