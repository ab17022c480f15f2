//! Document-to-PDF conversion
//!
//! The conversion engine is an external collaborator. [`DocumentConverter`]
//! is the seam between the request pipeline and whatever produces the PDF;
//! [`LibreOfficeConverter`] drives a headless LibreOffice subprocess.

mod libreoffice;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub use libreoffice::LibreOfficeConverter;

/// Converts a stored upload into a PDF inside the same job directory
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` and return the path of the produced PDF.
    ///
    /// The PDF must be written into `out_dir`. Any failure of the underlying
    /// tool is an error; a missing output file is an error as well.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Where a converter is expected to place the PDF for `input`
pub fn expected_pdf_path(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(".pdf");
    out_dir.join(name)
}
