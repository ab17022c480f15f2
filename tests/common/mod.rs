//! Shared helpers for router and pipeline tests

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use tempfile::TempDir;
use zip::ZipArchive;

use slide_render_server::config::{
    AuthPolicy, Config, ConverterConfig, RenderConfig, ServerConfig, WorkspaceConfig,
};
use slide_render_server::convert::{expected_pdf_path, DocumentConverter};
use slide_render_server::render::{page_file_name, PageRasterizer};
use slide_render_server::{AppError, AppState, Result};

pub const BOUNDARY: &str = "slide-render-test-boundary";
pub const API_KEY: &str = "test-key-123";

pub fn test_config(base_dir: &Path, auth: AuthPolicy) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 16 * 1024 * 1024,
        },
        workspace: WorkspaceConfig {
            base_dir: base_dir.to_path_buf(),
            keep_work_dirs: false,
            max_age: Duration::from_secs(3600),
            reap_interval: Duration::from_secs(300),
        },
        converter: ConverterConfig {
            program: "libreoffice".to_string(),
            leading_args: Vec::new(),
            timeout: Duration::from_secs(10),
        },
        render: RenderConfig { dpi: 300 },
        auth,
    }
}

/// Records every call and "converts" by copying the upload to `<stem>.pdf`
#[derive(Default)]
pub struct RecordingConverter {
    pub calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl RecordingConverter {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentConverter for RecordingConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), out_dir.to_path_buf()));

        let pdf = expected_pdf_path(input, out_dir);
        tokio::fs::copy(input, &pdf).await?;
        Ok(pdf)
    }
}

/// Treats each non-empty line of the "PDF" as one page; the page image
/// holds the line's text.
#[derive(Default)]
pub struct LinePageRasterizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PageRasterizer for LinePageRasterizer {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = tokio::fs::read_to_string(pdf).await?;
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Err(AppError::Rasterize("PDF has no pages".to_string()));
        }

        let mut written = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let path = out_dir.join(page_file_name(index + 1, lines.len()));
            tokio::fs::write(&path, line.as_bytes()).await?;
            written.push(path);
        }
        Ok(written)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub converter: Arc<RecordingConverter>,
    pub rasterizer: Arc<LinePageRasterizer>,
    pub work_dir: TempDir,
}

impl TestApp {
    pub fn new(auth: AuthPolicy) -> Self {
        Self::with_config(|config| config.auth = auth)
    }

    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let work_dir = TempDir::new().unwrap();
        let mut config = test_config(work_dir.path(), AuthPolicy::Disabled);
        customize(&mut config);

        let converter = Arc::new(RecordingConverter::default());
        let rasterizer = Arc::new(LinePageRasterizer::default());
        let state = AppState::with_components(config, converter.clone(), rasterizer.clone()).unwrap();

        Self {
            state,
            converter,
            rasterizer,
            work_dir,
        }
    }

    pub fn router(&self) -> axum::Router {
        slide_render_server::routes::router(self.state.clone())
    }

    /// Entries currently present in the work directory root
    pub fn work_dir_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// Multipart body with a single `file` part
pub fn multipart_body(file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
    multipart_body_with_field("file", file_name, data)
}

pub fn multipart_body_with_field(field: &str, file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {}\r\n", disposition).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn convert_request(api_key: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/convert/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

/// (entry name, entry bytes) in archive order
pub fn zip_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|index| {
            let mut entry = zip.by_index(index).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}

/// Minimal PDF with `pages` pages of 72x36 points, each filled with a
/// different gray level.
pub fn build_pdf(pages: usize) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages).map(|i| 3 + i * 2).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages),
    ];
    for (index, page_id) in page_ids.iter().enumerate() {
        let gray = (index % 10) as f32 / 10.0;
        let content = format!("{:.1} g 0 0 72 36 re f", gray);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 72 36] /Resources << >> /Contents {} 0 R >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, object).as_bytes());
    }

    let xref_offset = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    pdf
}
