//! Error types for the Slide Render server

use std::path::PathBuf;
use std::process::ExitStatus;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid API Key")]
    Unauthorized,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Converter failed to start: {0}")]
    ConverterSpawn(#[source] std::io::Error),

    #[error("Subprocess failed ({status}) with error: {stderr}")]
    ConversionFailed { status: ExitStatus, stderr: String },

    #[error("Conversion timed out after {0} seconds")]
    ConversionTimeout(u64),

    #[error("Converter exited successfully but produced no PDF at {0}")]
    ConversionOutputMissing(PathBuf),

    #[error("Rasterization error: {0}")]
    Rasterize(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<mupdf::Error> for AppError {
    fn from(err: mupdf::Error) -> Self {
        AppError::Rasterize(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Rasterize(format!("JPEG encoding failed: {}", err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::InvalidUpload(err.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status.is_server_error() {
            tracing::error!(error = %self, "Conversion request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
