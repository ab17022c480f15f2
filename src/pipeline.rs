//! Conversion pipeline
//!
//! ```text
//! upload ──► job dir ──► converter ──► <stem>.pdf ──► rasterizer ──► slide_NNN.jpg ──► images.zip
//! ```
//!
//! Steps run strictly in sequence. The job directory lives exactly as long
//! as the pipeline future, so it is removed on every exit path (including a
//! dropped request) unless retention is configured.

use std::time::Instant;

use axum::body::Bytes;
use tracing::Instrument;

use crate::archive::build_archive;
use crate::error::Result;
use crate::state::AppState;
use crate::workspace::Upload;

/// Run one upload through conversion, rasterization and packaging.
///
/// Returns the archive bytes; nothing is returned on partial failure.
pub async fn convert_upload(state: &AppState, upload: Upload) -> Result<Bytes> {
    let job = state.workspace().create_job()?;
    let span = tracing::info_span!("conversion", job_id = %job.id());

    async move {
        let started = Instant::now();
        tracing::info!(
            file_name = %upload.file_name,
            size = upload.data.len(),
            work_dir = %job.path().display(),
            "Conversion started"
        );

        let input = job.persist_upload(&upload).await?;
        let pdf = state.converter().convert(&input, job.path()).await?;
        let images = state.rasterizer().rasterize(&pdf, job.path()).await?;
        let pages = images.len();
        let archive = build_archive(job.path(), images).await?;
        let body = Bytes::from(tokio::fs::read(&archive).await?);

        tracing::info!(
            pages,
            archive_size = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion finished"
        );

        Ok(body)
    }
    .instrument(span)
    .await
}
