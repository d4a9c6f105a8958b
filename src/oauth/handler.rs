//! OAuth relay handler
//!
//! Builds authorization redirects and performs the code exchange

use std::sync::Arc;

use axum::http::{HeaderMap, Uri, header};

use crate::common::auth;
use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::RelayConfig;

use super::github::GitHubOAuthClient;
use super::templates;
use super::types::*;

/// Cookie holding the authorize `state` when state validation is on
pub const STATE_COOKIE_NAME: &str = "cms_oauth_state";

/// Lifetime of the state cookie, in seconds
const STATE_COOKIE_MAX_AGE: u32 = 600;

/// OAuth relay
pub struct OAuthRelay {
    config: Arc<RelayConfig>,
    github: GitHubOAuthClient,
}

impl OAuthRelay {
    pub fn new(config: Arc<RelayConfig>) -> anyhow::Result<Self> {
        let proxy = ProxyConfig::from_config(&config);
        let client = build_client(
            proxy.as_ref(),
            config.exchange_timeout_secs,
            config.tls_backend,
        )?;
        let github = GitHubOAuthClient::new(client, config.token_url.clone());
        Ok(Self { config, github })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Generate a random, single-use state value
    pub fn generate_state() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Callback URL registered with the provider
    pub fn redirect_uri(&self, origin: &str) -> String {
        format!("{}{}/callback", origin, self.config.mount_path())
    }

    /// Provider authorization URL for this origin and state
    pub fn authorize_url(&self, origin: &str, state: &str) -> String {
        let redirect_uri = self.redirect_uri(origin);
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
            ("state", state),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.config.authorize_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.config.authorize_url, separator, query)
    }

    /// Where unmatched paths are sent
    pub fn entry_url(&self, origin: &str) -> String {
        format!("{}{}", origin, self.config.mount_path())
    }

    /// `Set-Cookie` value carrying the state to the callback
    pub fn state_cookie(&self, state: &str, secure: bool) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
            STATE_COOKIE_NAME,
            state,
            self.config.mount_path(),
            STATE_COOKIE_MAX_AGE
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the state cookie
    pub fn clear_state_cookie(&self) -> String {
        format!(
            "{}=; Path={}; Max-Age=0; HttpOnly; SameSite=Lax",
            STATE_COOKIE_NAME,
            self.config.mount_path()
        )
    }

    /// Check the returned state against the cookie set during authorize
    pub fn verify_state(&self, headers: &HeaderMap, returned: Option<&str>) -> bool {
        let Some(returned) = returned.filter(|s| !s.is_empty()) else {
            return false;
        };
        match auth::extract_cookie(headers, STATE_COOKIE_NAME) {
            Some(expected) if !expected.is_empty() => auth::constant_time_eq(&expected, returned),
            _ => false,
        }
    }

    /// Exchange the code; never fails, every problem becomes an outcome
    pub async fn exchange(&self, code: &str) -> ExchangeOutcome {
        let result = self
            .github
            .exchange_code(&self.config.client_id, &self.config.client_secret, code)
            .await;

        match result {
            Ok(resp) => {
                let description = resp.error_description.clone();
                let outcome = ExchangeOutcome::from(resp);
                match &outcome {
                    ExchangeOutcome::Granted { .. } => {
                        tracing::info!("OAuth callback: token exchange succeeded");
                    }
                    other => {
                        tracing::warn!(
                            "OAuth callback: provider rejected code: {} ({})",
                            other.label(),
                            description.as_deref().unwrap_or("no description")
                        );
                    }
                }
                outcome
            }
            Err(e) => {
                tracing::error!("OAuth callback: token exchange failed: {:#}", e);
                let message = format!("{:#}", e);
                ExchangeOutcome::Failed {
                    message: if message.trim().is_empty() {
                        DEFAULT_FAILURE_MESSAGE.to_string()
                    } else {
                        message
                    },
                }
            }
        }
    }

    /// Popup document for an outcome
    pub fn render_popup(&self, outcome: &ExchangeOutcome) -> String {
        templates::render_callback_page(
            &self.config.provider,
            &self.config.message_target_origin,
            outcome,
        )
    }

    /// Presence of the configured secrets, never their values
    pub fn debug_report(&self) -> DebugResponse {
        let client_id_present = self.config.client_id_present();
        let client_secret_present = self.config.client_secret_present();
        DebugResponse {
            env_ok: client_id_present && client_secret_present,
            client_id_present,
            client_secret_present,
        }
    }
}

/// Public origin (`scheme://host`) of the current request
///
/// Scheme comes from `X-Forwarded-Proto`, defaulting to https.
pub fn site_origin(headers: &HeaderMap, uri: &Uri) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("https");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{}://{}", proto, host)
}
