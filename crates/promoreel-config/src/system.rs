//! Engine configuration parsing.
//!
//! Example `promoreel.kdl`:
//!
//! ```kdl
//! server host="0.0.0.0" port=8000
//! workers 4
//! output-dir "./output"
//! renderer "promoreel-render" {
//!     arg "--preset"
//!     arg "fast"
//! }
//! publisher base-url="https://graph.facebook.com/v18.0" publish-delay=15
//! credentials "BR" account-id="1784..." access-token="EAAG..."
//! ```

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use promoreel_core::{CredentialSet, Credentials, Region};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "promoreel.kdl";

/// Env var pointing at a config file.
pub const CONFIG_PATH_ENV: &str = "PROMOREEL_CONFIG";

const DEFAULT_MAX_WORKERS: usize = 2;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// External render program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "promoreel-render".to_string(),
            args: Vec::new(),
        }
    }
}

/// Publishing endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// API root for container creation and `media_publish`.
    pub base_url: String,
    /// API root for resumable video uploads.
    pub upload_base_url: String,
    /// Seconds to wait between upload and publish while the platform
    /// processes the video.
    pub publish_delay_secs: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com/v18.0".to_string(),
            upload_base_url: "https://graph-video.facebook.com/v18.0".to_string(),
            publish_delay_secs: 15,
        }
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub server: ServerConfig,
    /// Maximum number of jobs executing at once.
    pub max_workers: usize,
    /// Directory rendered videos are written to.
    pub output_dir: PathBuf,
    pub renderer: RendererConfig,
    pub publisher: PublisherConfig,
    pub credentials: CredentialSet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            output_dir: PathBuf::from("./output"),
            renderer: RendererConfig::default(),
            publisher: PublisherConfig::default(),
            credentials: CredentialSet::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from defaults, an optional KDL file, and the process
    /// environment.
    ///
    /// When `path` is `None`, `PROMOREEL_CONFIG` is consulted, then
    /// `promoreel.kdl` in the working directory. A missing default file is not
    /// an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        if !config.credentials.any() {
            warn!("No publishing credentials configured; publish requests will fail");
        }

        Ok(config)
    }

    /// Parse a KDL config file on top of the defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        debug!(path = %path.display(), "Reading config file");
        let content = std::fs::read_to_string(path)?;
        parse_engine_config(&content)
    }

    /// Apply environment overrides. `lookup` returns the value of a variable.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_number("API_PORT", &port)?;
        }
        if let Some(workers) = lookup("MAX_WORKERS") {
            self.max_workers = parse_number("MAX_WORKERS", &workers)?;
        }
        if let Some(dir) = lookup("VIDEO_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup("RENDER_PROGRAM") {
            self.renderer.program = program;
        }
        if let Some(base_url) = lookup("PUBLISH_BASE_URL") {
            self.publisher.base_url = base_url;
        }
        if let Some(upload_url) = lookup("PUBLISH_UPLOAD_URL") {
            self.publisher.upload_base_url = upload_url;
        }
        if let Some(delay) = lookup("PUBLISH_DELAY_SECS") {
            self.publisher.publish_delay_secs = parse_number("PUBLISH_DELAY_SECS", &delay)?;
        }

        for (region, token_key, account_key) in [
            (
                Region::Br,
                "INSTAGRAM_ACCESS_TOKEN_BR",
                "INSTAGRAM_ACCOUNT_ID_BR",
            ),
            (
                Region::Global,
                "INSTAGRAM_ACCESS_TOKEN_GLOBAL",
                "INSTAGRAM_ACCOUNT_ID_GLOBAL",
            ),
        ] {
            let token = lookup(token_key);
            let account = lookup(account_key);
            if token.is_none() && account.is_none() {
                continue;
            }
            let existing = self.credentials.for_region(region);
            let account = account.or_else(|| existing.map(|c| c.account_id.clone()));
            let token = token.or_else(|| existing.map(|c| c.access_token().to_string()));
            let merged = match (account, token) {
                (Some(account), Some(token)) => Credentials::new(account, token),
                _ => None,
            };
            self.credentials.set(region, merged);
        }

        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.renderer.program.trim().is_empty() {
            return Err(ConfigError::MissingField("renderer program".to_string()));
        }
        Ok(())
    }
}

/// Parse engine configuration from KDL text. Unset fields keep their defaults.
pub fn parse_engine_config(kdl: &str) -> ConfigResult<EngineConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = EngineConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "server" => {
                if let Some(host) = get_string_prop(node, "host") {
                    config.server.host = host;
                }
                if let Some(port) = get_int_prop(node, "port") {
                    config.server.port = to_number("server port", port)?;
                }
            }
            "workers" => {
                let workers = get_first_int_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("workers count".to_string()))?;
                config.max_workers = to_number("workers", workers)?;
            }
            "output-dir" => {
                let dir = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("output-dir path".to_string()))?;
                config.output_dir = PathBuf::from(dir);
            }
            "renderer" => {
                config.renderer = parse_renderer(node)?;
            }
            "publisher" => {
                if let Some(base_url) = get_string_prop(node, "base-url") {
                    config.publisher.base_url = base_url;
                }
                if let Some(upload_url) = get_string_prop(node, "upload-url") {
                    config.publisher.upload_base_url = upload_url;
                }
                if let Some(delay) = get_int_prop(node, "publish-delay") {
                    config.publisher.publish_delay_secs = to_number("publish-delay", delay)?;
                }
            }
            "credentials" => {
                let (region, credentials) = parse_credentials(node)?;
                config.credentials.set(region, Some(credentials));
            }
            _ => {} // Ignore unknown nodes
        }
    }

    config.validate()?;
    Ok(config)
}

fn parse_renderer(node: &KdlNode) -> ConfigResult<RendererConfig> {
    let program = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("renderer program".to_string()))?;

    let mut args = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "arg" {
                args.extend(get_all_string_args(child));
            }
        }
    }

    Ok(RendererConfig { program, args })
}

fn parse_credentials(node: &KdlNode) -> ConfigResult<(Region, Credentials)> {
    let region_name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("credentials region".to_string()))?;
    let region = match region_name.to_ascii_uppercase().as_str() {
        "BR" => Region::Br,
        "GLOBAL" => Region::Global,
        _ => {
            return Err(ConfigError::InvalidValue {
                field: "credentials region".to_string(),
                message: format!("unknown region: {}", region_name),
            });
        }
    };

    let account_id = get_string_prop(node, "account-id").unwrap_or_default();
    let access_token = get_string_prop(node, "access-token").unwrap_or_default();
    let credentials = Credentials::new(account_id, access_token).ok_or_else(|| {
        ConfigError::MissingField(format!(
            "account-id and access-token for region {}",
            region
        ))
    })?;

    Ok((region, credentials))
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("not a valid number: {}", raw),
    })
}

fn to_number<T: TryFrom<i128>>(field: &str, value: i128) -> ConfigResult<T> {
    T::try_from(value).map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("out of range: {}", value),
    })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_first_int_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_int_prop(node: &KdlNode, name: &str) -> Option<i128> {
    node.get(name).and_then(|v| v.as_integer())
}
