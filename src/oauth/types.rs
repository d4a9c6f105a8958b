//! OAuth relay types

use serde::{Deserialize, Serialize};

/// Body of the server-to-server code exchange
#[derive(Debug, Serialize)]
pub struct TokenExchangeRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
}

/// GitHub token endpoint response
///
/// GitHub answers `200 OK` for rejected codes too, so both halves are optional.
#[derive(Debug, Default, Deserialize)]
pub struct TokenExchangeResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Error code reported when the provider gives neither a token nor an error
pub const DEFAULT_ERROR_CODE: &str = "oauth_error";

/// Error code reported when a transport failure carries no message
pub const DEFAULT_FAILURE_MESSAGE: &str = "oauth_exchange_failed";

/// Error code reported when the returned `state` does not match
pub const INVALID_STATE_ERROR: &str = "invalid_state";

/// Result of one code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Provider issued an access token
    Granted { access_token: String },
    /// Provider answered without a token
    Denied { error: String },
    /// The exchange never produced a usable answer (network, timeout, bad body)
    Failed { message: String },
}

impl From<TokenExchangeResponse> for ExchangeOutcome {
    fn from(resp: TokenExchangeResponse) -> Self {
        match resp.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => ExchangeOutcome::Granted { access_token },
            None => ExchangeOutcome::Denied {
                error: resp
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_CODE.to_string()),
            },
        }
    }
}

impl ExchangeOutcome {
    /// Short label for logs, never includes the token
    pub fn label(&self) -> &str {
        match self {
            ExchangeOutcome::Granted { .. } => "granted",
            ExchangeOutcome::Denied { error } => error,
            ExchangeOutcome::Failed { .. } => "failed",
        }
    }
}

/// Token-compat echo response
#[derive(Debug, Serialize)]
pub struct TokenEchoResponse {
    pub token: String,
}

/// Configuration presence report, never carries secret values
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub env_ok: bool,
    pub client_id_present: bool,
    pub client_secret_present: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_token_response() {
        let resp: TokenExchangeResponse =
            serde_json::from_str(r#"{"access_token":"gho_abc","token_type":"bearer","scope":"repo"}"#)
                .unwrap();
        assert_eq!(
            ExchangeOutcome::from(resp),
            ExchangeOutcome::Granted {
                access_token: "gho_abc".to_string()
            }
        );
    }

    #[test]
    fn test_outcome_from_error_response() {
        let resp: TokenExchangeResponse = serde_json::from_str(
            r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#,
        )
        .unwrap();
        assert_eq!(
            ExchangeOutcome::from(resp),
            ExchangeOutcome::Denied {
                error: "bad_verification_code".to_string()
            }
        );
    }

    #[test]
    fn test_outcome_defaults_error_code() {
        let resp: TokenExchangeResponse = serde_json::from_str(r#"{"access_token":""}"#).unwrap();
        assert_eq!(
            ExchangeOutcome::from(resp),
            ExchangeOutcome::Denied {
                error: DEFAULT_ERROR_CODE.to_string()
            }
        );

        let resp: TokenExchangeResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            ExchangeOutcome::from(resp),
            ExchangeOutcome::Denied { error } if error == "oauth_error"
        ));
    }

    #[test]
    fn test_label_hides_token() {
        let outcome = ExchangeOutcome::Granted {
            access_token: "gho_secret".to_string(),
        };
        assert_eq!(outcome.label(), "granted");
    }

    #[test]
    fn test_debug_response_camel_case() {
        let resp = DebugResponse {
            env_ok: false,
            client_id_present: true,
            client_secret_present: false,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"envOk":false,"clientIdPresent":true,"clientSecretPresent":false}"#
        );
    }
}
