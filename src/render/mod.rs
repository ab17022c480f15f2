//! PDF rasterization
//!
//! Turns the intermediate PDF into one JPEG per page, written next to it in
//! the job directory. [`MupdfRasterizer`] is the production implementation.

mod pdf_raster;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub use pdf_raster::MupdfRasterizer;

/// Renders every page of a PDF to an image file
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render all pages of `pdf` into `out_dir`.
    ///
    /// Returns the written image paths in page order.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// File name for a 1-based page number.
///
/// Numbers are zero-padded to at least three digits and to the width of
/// `page_count`, so lexical order always equals page order.
pub fn page_file_name(page_number: usize, page_count: usize) -> String {
    let width = page_count.max(1).to_string().len().max(3);
    format!("slide_{:0width$}.jpg", page_number, width = width)
}
