//! OAuth relay module
//!
//! Lets a static-site CMS sign editors in with GitHub without shipping the
//! client secret to the browser.
//! Supports:
//! - Authorization redirect with a fresh `state`
//! - Server-side code exchange, result delivered to the opener window
//! - Token echo for legacy CMS integrations
//! - Configuration presence report
//! - Optional `state` validation through a short-lived cookie

mod github;
mod handler;
mod router;
mod templates;
mod types;

pub use handler::OAuthRelay;
pub use router::create_relay_router;
