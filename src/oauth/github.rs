//! GitHub OAuth token endpoint client

use anyhow::{Context, Result, bail};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::types::{TokenExchangeRequest, TokenExchangeResponse};

const RELAY_USER_AGENT: &str = concat!("cms-oauth-relay/", env!("CARGO_PKG_VERSION"));

/// Client for the provider's code-for-token exchange
#[derive(Clone)]
pub struct GitHubOAuthClient {
    client: Client,
    token_url: String,
}

impl GitHubOAuthClient {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }

    /// Exchange an authorization code for an access token
    ///
    /// A provider-side rejection comes back as `Ok` with `error` set.
    /// `Err` means the exchange produced no usable answer.
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<TokenExchangeResponse> {
        let payload = TokenExchangeRequest {
            client_id,
            client_secret,
            code,
        };

        let response = self
            .client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, RELAY_USER_AGENT)
            .json(&payload)
            .send()
            .await
            .context("Token request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read token response")?;

        match serde_json::from_str::<TokenExchangeResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.error.is_some() => Ok(parsed),
            Ok(_) => bail!("Token endpoint returned status {}", status),
            Err(e) if status.is_success() => bail!("Invalid token response: {}", e),
            Err(_) => bail!("Token endpoint returned status {}", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn test_client(base: &str) -> GitHubOAuthClient {
        GitHubOAuthClient::new(
            Client::new(),
            format!("{}/login/oauth/access_token", base),
        )
    }

    #[tokio::test]
    async fn test_exchange_posts_json_and_parses_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_header("accept", "application/json")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "client_id": "id",
                "client_secret": "secret",
                "code": "abc"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"gho_token","token_type":"bearer","scope":"public_repo"}"#)
            .create_async()
            .await;

        let resp = test_client(&server.url())
            .exchange_code("id", "secret", "abc")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resp.access_token.as_deref(), Some("gho_token"));
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_exchange_error_body_is_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"bad_verification_code"}"#)
            .create_async()
            .await;

        let resp = test_client(&server.url())
            .exchange_code("id", "secret", "used")
            .await
            .unwrap();
        assert!(resp.access_token.is_none());
        assert_eq!(resp.error.as_deref(), Some("bad_verification_code"));
    }

    #[tokio::test]
    async fn test_exchange_error_status_with_json_error_is_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"incorrect_client_credentials"}"#)
            .create_async()
            .await;

        let resp = test_client(&server.url())
            .exchange_code("id", "wrong", "abc")
            .await
            .unwrap();
        assert_eq!(resp.error.as_deref(), Some("incorrect_client_credentials"));
    }

    #[tokio::test]
    async fn test_exchange_server_error_is_err() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = test_client(&server.url())
            .exchange_code("id", "secret", "abc")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_exchange_non_json_success_is_err() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/login/oauth/access_token")
            .with_status(200)
            .with_body("access_token=gho_token&scope=repo")
            .create_async()
            .await;

        let err = test_client(&server.url())
            .exchange_code("id", "secret", "abc")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid token response"));
    }

    #[tokio::test]
    async fn test_exchange_connection_refused_is_err() {
        let client = GitHubOAuthClient::new(Client::new(), "http://127.0.0.1:1/token");
        assert!(client.exchange_code("id", "secret", "abc").await.is_err());
    }
}
