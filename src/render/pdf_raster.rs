//! MuPDF-backed page rasterizer

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{page_file_name, PageRasterizer};
use crate::config::RenderConfig;
use crate::error::{AppError, Result};

/// PDF user space is 72 units per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Renders pages with MuPDF and encodes them as JPEG.
///
/// MuPDF is synchronous and its documents are not thread-safe, so each call
/// opens the PDF inside a blocking task and drops it there.
#[derive(Debug, Clone)]
pub struct MupdfRasterizer {
    dpi: u32,
}

impl MupdfRasterizer {
    pub fn new(config: &RenderConfig) -> Self {
        Self { dpi: config.dpi }
    }

    fn scale(&self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }
}

#[async_trait]
impl PageRasterizer for MupdfRasterizer {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let pdf = pdf.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        let scale = self.scale();

        tokio::task::spawn_blocking(move || render_all_pages(&pdf, &out_dir, scale))
            .await
            .map_err(|e| AppError::Rasterize(format!("Task join error: {}", e)))?
    }
}

fn render_all_pages(pdf: &Path, out_dir: &Path, scale: f32) -> Result<Vec<PathBuf>> {
    let started = Instant::now();
    let path_str = pdf
        .to_str()
        .ok_or_else(|| AppError::Rasterize(format!("Non UTF-8 PDF path: {}", pdf.display())))?;

    let doc = Document::open(path_str)?;
    let page_count = doc.page_count()? as usize;
    if page_count == 0 {
        return Err(AppError::Rasterize("PDF has no pages".to_string()));
    }

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let mut written = Vec::with_capacity(page_count);

    for index in 0..page_count {
        let page = doc.load_page(index as i32)?;
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        let jpeg = encode_jpeg(&pixmap)?;

        let path = out_dir.join(page_file_name(index + 1, page_count));
        std::fs::write(&path, jpeg)?;
        written.push(path);
    }

    tracing::debug!(
        pages = page_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Rasterized PDF"
    );

    Ok(written)
}

fn encode_jpeg(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let rgb_len = rgb_buffer_len(width, height)?;
    let pixels = rgb_len / 3;

    let rgb = if n == 3 && samples.len() == rgb_len {
        samples.to_vec()
    } else {
        let mut buffer = Vec::with_capacity(rgb_len);
        for pixel in 0..pixels {
            let offset = pixel * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            buffer.extend_from_slice(&[r, g, b]);
        }
        buffer
    };

    let img = RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| AppError::Rasterize("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut output), image::ImageFormat::Jpeg)?;

    Ok(output)
}

/// Bytes needed for a packed RGB image of the given size
fn rgb_buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| AppError::Rasterize(format!("Page too large: {}x{}", width, height)))
}
