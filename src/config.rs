//! Configuration management for Slide Render Server

use std::env;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Fallback upload name when the client sends none
pub const DEFAULT_UPLOAD_NAME: &str = "unknown.pptx";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub converter: ConverterConfig,
    pub render: RenderConfig,
    pub auth: AuthPolicy,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Base root under which every job directory is created
    pub base_dir: PathBuf,
    /// Retain job directories after the response is sent
    pub keep_work_dirs: bool,
    /// Reaper removes job directories older than this
    pub max_age: Duration,
    /// Reaper sweep period
    pub reap_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Program to run, e.g. `libreoffice` or `soffice`
    pub program: String,
    /// Arguments placed before the conversion arguments
    pub leading_args: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub dpi: u32,
}

/// Access control for the conversion endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    Disabled,
    ApiKey(String),
}

// Keep the secret out of logs.
impl std::fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthPolicy::Disabled => f.write_str("Disabled"),
            AuthPolicy::ApiKey(_) => f.write_str("ApiKey(****)"),
        }
    }
}

impl AuthPolicy {
    /// Build a policy from an optional secret; empty secrets disable auth
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(key) if !key.is_empty() => AuthPolicy::ApiKey(key),
            _ => AuthPolicy::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AuthPolicy::ApiKey(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LIBREOFFICE_COMMAND is empty")]
    EmptyConverterCommand,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 500 * 1024 * 1024,
            },
            workspace: WorkspaceConfig {
                base_dir: default_base_dir(),
                keep_work_dirs: false,
                max_age: Duration::from_secs(3600),
                reap_interval: Duration::from_secs(300),
            },
            converter: ConverterConfig {
                program: "libreoffice".to_string(),
                leading_args: Vec::new(),
                timeout: Duration::from_secs(120),
            },
            render: RenderConfig { dpi: 300 },
            auth: AuthPolicy::Disabled,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let (program, leading_args) = match env::var("LIBREOFFICE_COMMAND") {
            Ok(command) => split_command(&command)?,
            Err(_) => (defaults.converter.program, defaults.converter.leading_args),
        };

        let config = Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes),
            },
            workspace: WorkspaceConfig {
                base_dir: env::var("WORK_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.workspace.base_dir),
                keep_work_dirs: env_parse("KEEP_WORK_DIRS", defaults.workspace.keep_work_dirs),
                max_age: env_secs("WORK_DIR_MAX_AGE_SECS", defaults.workspace.max_age),
                reap_interval: env_secs("REAPER_INTERVAL_SECS", defaults.workspace.reap_interval),
            },
            converter: ConverterConfig {
                program,
                leading_args,
                timeout: env_secs("CONVERSION_TIMEOUT_SECS", defaults.converter.timeout),
            },
            render: RenderConfig {
                dpi: env_parse("RENDER_DPI", defaults.render.dpi),
            },
            auth: AuthPolicy::from_secret(env::var("API_KEY").ok()),
        };

        if config.reaper_may_remove_active_jobs() {
            tracing::warn!(
                max_age_secs = config.workspace.max_age.as_secs(),
                timeout_secs = config.converter.timeout.as_secs(),
                "WORK_DIR_MAX_AGE_SECS does not exceed CONVERSION_TIMEOUT_SECS; \
                 the reaper may remove directories of running conversions"
            );
        }

        Ok(config)
    }

    /// A job may still be converting when the reaper considers it stale
    pub fn reaper_may_remove_active_jobs(&self) -> bool {
        self.workspace.max_age <= self.converter.timeout
    }
}

/// `<executable dir>/temp`, or `./temp` when the executable path is unknown
fn default_base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("temp")))
        .unwrap_or_else(|| PathBuf::from("temp"))
}

fn split_command(command: &str) -> Result<(String, Vec<String>), ConfigError> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or(ConfigError::EmptyConverterCommand)?;
    Ok((program, parts.collect()))
}

/// Positive whole seconds; zero or unparseable values fall back to `default`
fn env_secs(key: &str, default: Duration) -> Duration {
    parse_secs(key, env::var(key).ok().as_deref(), default)
}

fn parse_secs(key: &str, raw: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<NonZeroU64>() {
        Ok(secs) => Duration::from_secs(secs.get()),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Expected a positive number of seconds, using default");
            default
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            default
        }),
        Err(_) => default,
    }
}
