//! Presentation conversion endpoint
//!
//! `POST /convert/` takes a multipart form with a `file` field and answers
//! with `images.zip`, one JPEG per page.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::pipeline;
use crate::state::AppState;
use crate::workspace::Upload;

/// Multipart field holding the presentation
pub const UPLOAD_FIELD: &str = "file";

/// Download name of the returned archive, whatever the upload was called
pub const DOWNLOAD_NAME: &str = "images.zip";

/// POST /convert/
pub async fn convert_presentation(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidUpload(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;

    let archive = pipeline::convert_upload(&state, upload).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
            ),
        ],
        archive,
    )
        .into_response())
}

/// Take the first `file` field; other fields are skipped
async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(Upload::new(file_name.as_deref(), data));
    }

    Err(AppError::InvalidUpload(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}
