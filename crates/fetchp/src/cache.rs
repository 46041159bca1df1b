//! In-flight response cache
//!
//! Not a TTL or LRU cache: a single-flight map from method + URL to the
//! shared response future of the call that first asked for caching. The
//! entry is registered before the network settles, so a second identical
//! call joins the first one instead of issuing its own request.
//!
//! Entries are never evicted; [`CacheRegistry::clear`] is the only way to
//! drop them. Keys ignore headers and body, so two POSTs with different
//! bodies to the same URL share a slot.

use crate::error::FetchpError;
use crate::types::{Request, Response};
use crate::uris::{UrlPattern, UrlResolver};
use crate::url_collection::{MethodSet, UrlCollection};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;

/// Response future that any number of calls can await
pub type SharedResponse = Shared<BoxFuture<'static, Result<Response, FetchpError>>>;

/// Make `future` shareable
pub fn share<F>(future: F) -> SharedResponse
where
    F: Future<Output = Result<Response, FetchpError>> + Send + 'static,
{
    future.boxed().shared()
}

/// Registry of cached in-flight responses
#[derive(Default)]
pub struct CacheRegistry {
    items: RwLock<UrlCollection<SharedResponse>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response future under `methods` and `pattern`
    pub fn add(
        &self,
        methods: impl Into<MethodSet>,
        pattern: impl Into<UrlPattern>,
        response: SharedResponse,
    ) {
        self.items.write().add(methods, pattern, response);
    }

    /// Register the response of `request` under its exact method and URL
    pub fn insert(&self, request: &Request, response: SharedResponse) {
        tracing::debug!(method = %request.method(), url = %request.url(), "Caching response");
        self.add(request.method().clone(), request.url(), response);
    }

    /// Join the cached response for `request`, or register the one `make` builds
    ///
    /// Lookup and registration happen under one lock, so concurrent calls
    /// for the same key agree on a single response. The flag is true when
    /// an existing entry was joined.
    pub fn find_or_insert_with(
        &self,
        request: &Request,
        resolver: Option<&UrlResolver>,
        make: impl FnOnce() -> SharedResponse,
    ) -> (SharedResponse, bool) {
        let mut items = self.items.write();
        if let Some(item) = items.first_by_request(request, resolver) {
            return (item.data.clone(), true);
        }

        tracing::debug!(method = %request.method(), url = %request.url(), "Caching response");
        let response = make();
        items.add(request.method().clone(), request.url(), response.clone());
        (response, false)
    }

    /// First cached response matching `request`
    pub fn find(&self, request: &Request, resolver: Option<&UrlResolver>) -> Option<SharedResponse> {
        self.items
            .read()
            .first_by_request(request, resolver)
            .map(|item| item.data.clone())
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("len", &self.len())
            .finish()
    }
}
