//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::convert::{DocumentConverter, LibreOfficeConverter};
use crate::render::{MupdfRasterizer, PageRasterizer};
use crate::workspace::Workspace;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to prepare work directory {path}: {source}")]
    WorkDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    workspace: Workspace,
    converter: Arc<dyn DocumentConverter>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl AppState {
    /// Create the production state: LibreOffice for conversion, MuPDF for rendering.
    ///
    /// Creates the work directory root if it is missing.
    pub fn new(config: Config) -> Result<Self, StateError> {
        let converter = Arc::new(LibreOfficeConverter::new(&config.converter));
        let rasterizer = Arc::new(MupdfRasterizer::new(&config.render));
        Self::with_components(config, converter, rasterizer)
    }

    /// Create a state with caller-supplied conversion components
    pub fn with_components(
        config: Config,
        converter: Arc<dyn DocumentConverter>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Result<Self, StateError> {
        let workspace = Workspace::init(&config.workspace).map_err(|source| StateError::WorkDir {
            path: config.workspace.base_dir.clone(),
            source,
        })?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                workspace,
                converter,
                rasterizer,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the job directory root
    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    /// Get the document converter
    pub fn converter(&self) -> &dyn DocumentConverter {
        self.inner.converter.as_ref()
    }

    /// Get the page rasterizer
    pub fn rasterizer(&self) -> &dyn PageRasterizer {
        self.inner.rasterizer.as_ref()
    }
}
