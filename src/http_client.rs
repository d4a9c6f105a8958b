//! Outbound HTTP client for the token exchange

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{RelayConfig, TlsBackend};

/// Upstream proxy for the token exchange
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// http://, https:// or socks5:// URL
    pub url: String,
    /// Basic auth, applied only when both halves are set
    pub credentials: Option<(String, String)>,
}

impl ProxyConfig {
    /// Proxy settings from relay configuration, if a proxy URL is set
    pub fn from_config(config: &RelayConfig) -> Option<Self> {
        let url = config.proxy_url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let credentials = config
            .proxy_username
            .clone()
            .zip(config.proxy_password.clone());
        Some(Self {
            url: url.to_string(),
            credentials,
        })
    }
}

/// Client shared by every callback; `timeout_secs` bounds connect and the whole exchange
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);
    let mut builder = Client::builder().timeout(timeout).connect_timeout(timeout);

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = proxy {
        let mut upstream = Proxy::all(&proxy_config.url)?;
        if let Some((username, password)) = &proxy_config.credentials {
            upstream = upstream.basic_auth(username, password);
        }
        builder = builder.proxy(upstream);
        tracing::debug!("Token exchange via proxy: {}", proxy_config.url);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_with_proxy(url: Option<&str>) -> RelayConfig {
        let mut relay = RelayConfig::default();
        relay.proxy_url = url.map(str::to_string);
        relay
    }

    #[test]
    fn test_proxy_from_config() {
        assert!(ProxyConfig::from_config(&relay_with_proxy(None)).is_none());
        assert!(ProxyConfig::from_config(&relay_with_proxy(Some("  "))).is_none());

        let mut relay = relay_with_proxy(Some(" socks5://127.0.0.1:1080 "));
        relay.proxy_username = Some("user".to_string());
        relay.proxy_password = Some("pass".to_string());
        let proxy = ProxyConfig::from_config(&relay).unwrap();
        assert_eq!(proxy.url, "socks5://127.0.0.1:1080");
        assert_eq!(
            proxy.credentials,
            Some(("user".to_string(), "pass".to_string()))
        );
    }

    #[test]
    fn test_proxy_username_without_password_is_ignored() {
        let mut relay = relay_with_proxy(Some("http://127.0.0.1:7890"));
        relay.proxy_username = Some("user".to_string());
        let proxy = ProxyConfig::from_config(&relay).unwrap();
        assert!(proxy.credentials.is_none());
    }

    #[test]
    fn test_build_client_without_proxy() {
        assert!(build_client(None, 10, TlsBackend::Rustls).is_ok());
    }

    #[test]
    fn test_build_client_with_proxy() {
        let relay = relay_with_proxy(Some("http://127.0.0.1:7890"));
        let proxy = ProxyConfig::from_config(&relay);
        assert!(build_client(proxy.as_ref(), 10, TlsBackend::Rustls).is_ok());
    }
}
