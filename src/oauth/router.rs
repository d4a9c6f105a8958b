//! OAuth relay router
//!
//! The relay is mounted under whatever prefix the hosting platform assigns,
//! so requests are classified by path suffix instead of fixed routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use tower_http::trace::TraceLayer;

use super::handler::{OAuthRelay, site_origin};
use super::types::{ExchangeOutcome, INVALID_STATE_ERROR, TokenEchoResponse};

/// Relay state for handlers
#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<OAuthRelay>,
}

/// Handler selected for a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Debug,
    Authorize,
    Callback,
    Token,
    Fallback,
}

impl Route {
    /// Classify by exact path suffix, first match wins
    pub fn classify(path: &str) -> Self {
        let path = path
            .strip_suffix('/')
            .filter(|p| !p.is_empty())
            .unwrap_or(path);

        const TABLE: [(&str, Route); 4] = [
            ("/debug", Route::Debug),
            ("/auth", Route::Authorize),
            ("/callback", Route::Callback),
            ("/token", Route::Token),
        ];

        TABLE
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, route)| *route)
            .unwrap_or(Route::Fallback)
    }
}

/// Query parameters for the callback endpoint
#[derive(Debug, Default)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

/// Query parameters for the token-compat endpoint
#[derive(Debug, Default)]
pub struct TokenParams {
    token: Option<String>,
}

/// Decoded query pairs; repeated keys resolve to their first value
#[derive(Debug, Default)]
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn from_uri(uri: &Uri) -> Self {
        match Query::<Vec<(String, String)>>::try_from_uri(uri) {
            Ok(Query(pairs)) => Self(pairs),
            Err(e) => {
                tracing::debug!("Unparseable query string: {}", e);
                Self::default()
            }
        }
    }

    fn first(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl From<&QueryPairs> for CallbackParams {
    fn from(query: &QueryPairs) -> Self {
        Self {
            code: query.first("code"),
            state: query.first("state"),
        }
    }
}

impl From<&QueryPairs> for TokenParams {
    fn from(query: &QueryPairs) -> Self {
        Self {
            token: query.first("token"),
        }
    }
}

/// Create OAuth relay router
///
/// # Endpoints (relative to the mount path)
/// - `GET /auth` - Redirect to the provider's authorize page
/// - `GET /auth/callback` - Exchange the code, answer with the popup page
/// - `GET /auth/token` - Echo a token (legacy clients)
/// - `GET /auth/debug` - Report whether secrets are configured
/// - anything else - Redirect to `/auth`
pub fn create_relay_router(relay: Arc<OAuthRelay>) -> Router {
    let state = RelayState { relay };

    Router::new()
        .fallback(dispatch)
        .layer(cors_layer())
        .layer(
            // Path only: the query carries authorization codes and tokens
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::debug_span!("request", method = %req.method(), path = %req.uri().path())
            }),
        )
        .with_state(state)
}

/// CORS layer, lets the CMS origin call the token-compat endpoint
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn dispatch(State(state): State<RelayState>, request: Request<Body>) -> Response {
    let (parts, _body) = request.into_parts();
    let route = Route::classify(parts.uri.path());
    tracing::debug!("Dispatching {} {} to {:?}", parts.method, parts.uri.path(), route);

    match route {
        Route::Debug => handle_debug(&state),
        Route::Authorize => handle_authorize(&state, &parts.headers, &parts.uri),
        Route::Callback => {
            let params = CallbackParams::from(&QueryPairs::from_uri(&parts.uri));
            handle_callback(&state, &parts.headers, params).await
        }
        Route::Token => handle_token(TokenParams::from(&QueryPairs::from_uri(&parts.uri))),
        Route::Fallback => {
            let origin = site_origin(&parts.headers, &parts.uri);
            redirect(&state.relay.entry_url(&origin), None)
        }
    }
}

/// Handle authorize (GET {mount})
fn handle_authorize(state: &RelayState, headers: &HeaderMap, uri: &Uri) -> Response {
    let relay = &state.relay;
    let origin = site_origin(headers, uri);
    let oauth_state = OAuthRelay::generate_state();
    let url = relay.authorize_url(&origin, &oauth_state);

    let cookie = relay
        .config()
        .validate_state
        .then(|| relay.state_cookie(&oauth_state, origin.starts_with("https://")));

    tracing::info!("OAuth authorize: redirecting to provider");
    redirect(&url, cookie)
}

/// Handle callback (GET {mount}/callback)
async fn handle_callback(state: &RelayState, headers: &HeaderMap, params: CallbackParams) -> Response {
    let relay = &state.relay;
    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => return plain_text(StatusCode::BAD_REQUEST, "Missing code"),
    };

    let mut clear_cookie = None;
    if relay.config().validate_state {
        clear_cookie = Some(relay.clear_state_cookie());
        if !relay.verify_state(headers, params.state.as_deref()) {
            tracing::warn!("OAuth callback: state mismatch, exchange skipped");
            let outcome = ExchangeOutcome::Denied {
                error: INVALID_STATE_ERROR.to_string(),
            };
            return popup(relay.render_popup(&outcome), clear_cookie);
        }
    }

    let outcome = relay.exchange(code).await;
    popup(relay.render_popup(&outcome), clear_cookie)
}

/// Handle token-compat (GET {mount}/token)
fn handle_token(params: TokenParams) -> Response {
    match params.token.filter(|t| !t.is_empty()) {
        Some(token) => Json(TokenEchoResponse { token }).into_response(),
        None => plain_text(StatusCode::BAD_REQUEST, "Missing token"),
    }
}

/// Handle debug (GET {mount}/debug)
fn handle_debug(state: &RelayState) -> Response {
    Json(state.relay.debug_report()).into_response()
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn redirect(location: &str, cookie: Option<String>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(e) => {
            tracing::error!("Invalid redirect location: {}", e);
            return plain_text(StatusCode::BAD_REQUEST, "Invalid redirect location");
        }
    }
    append_cookie(&mut response, cookie);
    response
}

fn popup(html: String, cookie: Option<String>) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Html(html),
    )
        .into_response();
    append_cookie(&mut response, cookie);
    response
}

fn append_cookie(response: &mut Response, cookie: Option<String>) {
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}
