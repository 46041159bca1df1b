//! Fetchp - request orchestration library
//!
//! Runs every call through a fixed lifecycle
//! (`Idle → Preparing → Fetching → Loading → Success`, or `Error` /
//! `Canceled` from anywhere) and lets callers observe and steer it:
//!
//! - [`HookRegistry`] - lifecycle hooks, global or scoped to a method + URL
//! - [`MockRegistry`] - canned responses consulted before the network
//! - [`CacheRegistry`] - single-flight sharing of in-flight responses
//! - [`Transport`] - the network seam ([`ReqwestTransport`] by default)
//!
//! All three registries match requests through one [`UrlCollection`], whose
//! patterns are exact URLs, regular expressions, or [`UrlTemplate`]s.
//!
//! ## Example
//!
//! ```no_run
//! use fetchp::{Fetchp, RequestOptions, RequestState, Response};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), fetchp::FetchpError> {
//! let client = Fetchp::builder().base_url("https://api.example.com").build()?;
//! client.mocks().add("GET", "/health", Response::json(json!({"ok": true})));
//!
//! let call = client.request::<serde_json::Value>("GET", "/health", RequestOptions::new());
//! assert_eq!(call.data().await, Some(json!({"ok": true})));
//! assert_eq!(call.status(), RequestState::Success);
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod client;
mod error;
pub mod hooks;
mod mocks;
mod options;
mod pipeline;
mod result;
pub mod transport;
mod types;
pub mod uris;
mod url_collection;

use std::sync::OnceLock;

pub use cache::{share, CacheRegistry, SharedResponse};
pub use client::{Fetchp, FetchpBuilder};
pub use error::{FetchpError, HookError};
pub use hooks::{Hook, HookEvent, HookKind, HookRegistry, HookResult};
pub use mocks::{MockRegistry, MockResponder};
pub use options::RequestOptions;
pub use result::ResultHandle;
pub use transport::{FnTransport, ReqwestTransport, Transport};
pub use types::{Request, RequestState, Response};
pub use uris::{UrlPattern, UrlResolver, UrlTemplate};
pub use url_collection::{MethodSet, UrlCollection, UrlCollectionItem};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Fetchp/0.1";

/// Process-wide engine, created on first use
///
/// A convenience for code without an engine of its own; it has no base URL
/// and uses the reqwest transport. Prefer [`Fetchp::builder`] elsewhere.
pub fn global() -> &'static Fetchp {
    static GLOBAL: OnceLock<Fetchp> = OnceLock::new();
    GLOBAL.get_or_init(Fetchp::new)
}
