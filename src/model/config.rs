use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Minimum length for a client id to count as configured
pub const MIN_CLIENT_ID_LEN: usize = 10;

/// Minimum length for a client secret to count as configured
pub const MIN_CLIENT_SECRET_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// Relay configuration
///
/// Loaded once at startup, then shared read-only with every handler.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// OAuth App client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth App client secret, never leaves the server
    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_scope")]
    pub scope: String,

    /// Provider name used in the popup message protocol
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Public path the relay is reachable under, must end in `/auth`
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Token exchange timeout in seconds
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,

    /// Check the returned `state` against a cookie set during authorize
    #[serde(default)]
    pub validate_state: bool,

    /// `postMessage` target origin used by the callback popup
    #[serde(default = "default_message_target_origin")]
    pub message_target_origin: String,

    #[serde(default)]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL for the token exchange (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    #[serde(default)]
    pub proxy_username: Option<String>,

    #[serde(default)]
    pub proxy_password: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scope() -> String {
    "public_repo".to_string()
}

fn default_provider() -> String {
    "github".to_string()
}

fn default_authorize_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_mount_path() -> String {
    "/.netlify/functions/auth".to_string()
}

fn default_exchange_timeout_secs() -> u64 {
    10
}

fn default_message_target_origin() -> String {
    "*".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: default_scope(),
            provider: default_provider(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            mount_path: default_mount_path(),
            exchange_timeout_secs: default_exchange_timeout_secs(),
            validate_state: false,
            message_target_origin: default_message_target_origin(),
            tls_backend: TlsBackend::default(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
        }
    }
}

// Secrets stay out of `{:?}` so the config can be logged safely.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id_present", &self.client_id_present())
            .field("client_secret_present", &self.client_secret_present())
            .field("scope", &self.scope)
            .field("provider", &self.provider)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("mount_path", &self.mount_path)
            .field("exchange_timeout_secs", &self.exchange_timeout_secs)
            .field("validate_state", &self.validate_state)
            .field("message_target_origin", &self.message_target_origin)
            .field("tls_backend", &self.tls_backend)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl RelayConfig {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// A missing file is not an error: defaults plus environment are used.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str::<RelayConfig>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OAUTH_RELAY_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("OAUTH_RELAY_PORT") {
            self.port = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid OAUTH_RELAY_PORT: {}", v))?;
        }
        if let Some(v) = lookup("GITHUB_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = lookup("GITHUB_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Some(v) = lookup("GITHUB_SCOPE") {
            self.scope = v;
        }
        if let Some(v) = lookup("OAUTH_VALIDATE_STATE") {
            self.validate_state = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(())
    }

    /// Client id is set and long enough to be plausible
    pub fn client_id_present(&self) -> bool {
        self.client_id.trim().len() >= MIN_CLIENT_ID_LEN
    }

    /// Client secret is set and long enough to be plausible
    pub fn client_secret_present(&self) -> bool {
        self.client_secret.trim().len() >= MIN_CLIENT_SECRET_LEN
    }

    /// Mount path without a trailing slash
    pub fn mount_path(&self) -> &str {
        let trimmed = self.mount_path.trim_end_matches('/');
        if trimmed.is_empty() { "/auth" } else { trimmed }
    }

    /// Non-fatal configuration problems worth reporting at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.client_id_present() {
            warnings.push("clientId is missing or too short (set GITHUB_CLIENT_ID)".to_string());
        }
        if !self.client_secret_present() {
            warnings.push(
                "clientSecret is missing or too short (set GITHUB_CLIENT_SECRET)".to_string(),
            );
        }
        if !self.mount_path().ends_with("/auth") {
            warnings.push(format!(
                "mountPath {} does not end in /auth, authorize requests will not be routed",
                self.mount_path()
            ));
        }
        if self.exchange_timeout_secs == 0 {
            warnings.push("exchangeTimeoutSecs is 0, token exchanges will fail".to_string());
        }
        warnings
    }
}
