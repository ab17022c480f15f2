//! Slide Render Server Library
//!
//! Converts uploaded presentations into a zip of per-page JPEG images by
//! driving a headless LibreOffice and rendering the resulting PDF with MuPDF.
//!
//! # Modules
//!
//! - `routes`: HTTP surface (`POST /convert/`, `GET /health`)
//! - `pipeline`: the per-request upload → PDF → images → zip sequence
//! - `convert` / `render`: seams over the external converter and rasterizer
//! - `workspace`: per-request job directories and the stale-directory reaper

pub mod archive;
pub mod auth;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod routes;
pub mod state;
pub mod workspace;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
