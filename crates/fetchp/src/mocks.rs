//! Mock response registry
//!
//! Mocks are consulted before the cache and before the network. The first
//! registered mock matching the request's method and URL answers it.

use crate::error::FetchpError;
use crate::types::{Request, Response};
use crate::uris::{UrlPattern, UrlResolver};
use crate::url_collection::{MethodSet, UrlCollection};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

type ResponderFn = dyn Fn(Request) -> BoxFuture<'static, Result<Response, FetchpError>> + Send + Sync;

/// Produces the response for a mocked request
#[derive(Clone)]
pub struct MockResponder(Arc<ResponderFn>);

impl MockResponder {
    /// Answer with whatever `f` produces for each request
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchpError>> + Send + 'static,
    {
        MockResponder(Arc::new(move |request| f(request).boxed()))
    }

    /// Run the responder
    pub fn respond(&self, request: Request) -> BoxFuture<'static, Result<Response, FetchpError>> {
        (self.0)(request)
    }
}

/// A static response is served as-is on every call.
///
/// Clones share the body buffer, so every call observes the same bytes.
impl From<Response> for MockResponder {
    fn from(response: Response) -> Self {
        MockResponder::from_fn(move |_| {
            let response = response.clone();
            async move { Ok(response) }
        })
    }
}

impl std::fmt::Debug for MockResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MockResponder")
    }
}

/// Registry of mocked method/URL pairs
#[derive(Debug, Default)]
pub struct MockRegistry {
    items: RwLock<UrlCollection<MockResponder>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mock
    ///
    /// `response` is either a [`Response`] or a [`MockResponder`].
    pub fn add(
        &self,
        methods: impl Into<MethodSet>,
        pattern: impl Into<UrlPattern>,
        response: impl Into<MockResponder>,
    ) {
        let pattern = pattern.into();
        tracing::debug!(pattern = ?pattern, "Registering mock");
        self.items.write().add(methods, pattern, response.into());
    }

    /// Register a mock answered by `f`
    pub fn add_fn<F, Fut>(&self, methods: impl Into<MethodSet>, pattern: impl Into<UrlPattern>, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchpError>> + Send + 'static,
    {
        self.add(methods, pattern, MockResponder::from_fn(f));
    }

    /// First registered mock matching `request`
    pub fn find(&self, request: &Request, resolver: Option<&UrlResolver>) -> Option<MockResponder> {
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
