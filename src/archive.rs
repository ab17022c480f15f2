//! Output archive packaging

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::{AppError, Result};

/// File name of the archive inside the job directory
pub const ARCHIVE_NAME: &str = "images.zip";

/// Write `images` into a zip at `archive_path`.
///
/// Entries keep the order of `images` and are stored under their base file
/// names without compression; JPEG data does not shrink further.
pub fn write_archive(archive_path: &Path, images: &[PathBuf]) -> Result<()> {
    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for image in images {
        let name = image
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AppError::Internal(format!("Bad image path: {}", image.display())))?;

        zip.start_file(name, options)?;
        let mut reader = BufReader::new(File::open(image)?);
        std::io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// Package `images` into `<job dir>/images.zip` on the blocking pool
pub async fn build_archive(job_dir: &Path, images: Vec<PathBuf>) -> Result<PathBuf> {
    let archive_path = job_dir.join(ARCHIVE_NAME);
    let target = archive_path.clone();

    tokio::task::spawn_blocking(move || write_archive(&target, &images))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(archive_path)
}
