//! Client configuration.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `KEYWARD_*` environment variables, then command-line flags. Certificates
//! and keys are always referenced by path, never embedded.

use anyhow::{Context, Result};
use keyward_auth::Environment;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost:9000";
pub const DEFAULT_SERVER_NAME: &str = "knox";
pub const DEFAULT_KEY_FOLDER: &str = "/var/lib/knox/v0/keys/";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth.token.endpoint.used.for/knox/login";

/// Everything needed to assemble a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    /// Key service address (`host:port`)
    pub host: String,
    /// Name used for SNI and server certificate validation
    pub server_name: String,
    /// PEM certificate chain presented for mutual TLS
    pub cert_path: Option<PathBuf>,
    /// PEM private key matching `cert_path`
    pub key_path: Option<PathBuf>,
    /// PEM CA bundle replacing the native trust store
    pub ca_path: Option<PathBuf>,
    /// Skip server certificate verification (development only)
    pub insecure_skip_verify: bool,
    /// Directory where fetched keys are cached
    pub key_folder: PathBuf,
    /// Cached user token file; defaults to `~/.knox_user_auth`
    pub cached_token_path: Option<PathBuf>,
    /// OAuth token endpoint used by the login flow
    pub token_endpoint: String,
    /// OAuth client id used by the login flow
    pub client_id: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            cert_path: None,
            key_path: None,
            ca_path: None,
            insecure_skip_verify: false,
            key_folder: PathBuf::from(DEFAULT_KEY_FOLDER),
            cached_token_path: None,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            client_id: String::new(),
        }
    }
}

impl ClientSettings {
    /// Load settings from `path`, or from the default location if it exists.
    ///
    /// An explicit path must exist and parse; a missing default file is not an error.
    pub fn load(path: Option<&Path>, env: &dyn Environment) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env(env)?;
        Ok(settings)
    }

    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let settings: ClientSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    /// Get the path to the default config file.
    pub fn default_path() -> Option<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "keyward", "keyward")?;
        Some(dirs.config_dir().join("config.toml"))
    }

    /// Apply `KEYWARD_*` overrides.
    pub fn apply_env(&mut self, env: &dyn Environment) -> Result<()> {
        if let Some(host) = non_empty(env, "KEYWARD_HOST") {
            self.host = host;
        }
        if let Some(name) = non_empty(env, "KEYWARD_SERVER_NAME") {
            self.server_name = name;
        }
        if let Some(path) = non_empty(env, "KEYWARD_CERT") {
            self.cert_path = Some(path.into());
        }
        if let Some(path) = non_empty(env, "KEYWARD_KEY") {
            self.key_path = Some(path.into());
        }
        if let Some(path) = non_empty(env, "KEYWARD_CA") {
            self.ca_path = Some(path.into());
        }
        if let Some(path) = non_empty(env, "KEYWARD_KEY_FOLDER") {
            self.key_folder = path.into();
        }
        if let Some(path) = non_empty(env, "KEYWARD_CACHED_TOKEN") {
            self.cached_token_path = Some(path.into());
        }
        if let Some(flag) = non_empty(env, "KEYWARD_INSECURE_SKIP_VERIFY") {
            self.insecure_skip_verify = parse_bool(&flag)
                .with_context(|| format!("Invalid KEYWARD_INSECURE_SKIP_VERIFY value {flag:?}"))?;
        }
        Ok(())
    }
}

fn non_empty(env: &dyn Environment, name: &str) -> Option<String> {
    env.var(name).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
