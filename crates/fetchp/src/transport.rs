//! Network transports
//!
//! Design: the engine never talks to the network directly. It hands each
//! constructed [`Request`] to a [`Transport`], which turns it into a
//! [`Response`] or fails. Transports should abort the exchange once the
//! request's cancellation signal fires.

use crate::error::FetchpError;
use crate::types::{Request, Response};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Turns a request into a response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Execute the request
    async fn fetch(&self, request: Request) -> Result<Response, FetchpError>;
}

/// HTTP transport backed by reqwest
///
/// Buffers the whole body. The request's own `User-Agent` header wins over
/// the configured one.
pub struct ReqwestTransport {
    client: Result<reqwest::Client, FetchpError>,
}

impl ReqwestTransport {
    /// Transport with the default User-Agent
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Transport with a custom User-Agent
    ///
    /// A client that fails to build is reported by every later fetch.
    pub fn with_user_agent(user_agent: impl AsRef<str>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.as_ref())
            .build()
            .map_err(|e| FetchpError::ClientBuildError(e.to_string()));
        Self { client }
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client: Ok(client) }
    }

    async fn send(client: &reqwest::Client, request: &Request) -> Result<Response, FetchpError> {
        let mut builder = client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(FetchpError::from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(FetchpError::from_reqwest)?;

        Ok(Response::new(status).with_headers(headers).with_body(body))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn fetch(&self, request: Request) -> Result<Response, FetchpError> {
        let client = self.client.as_ref().map_err(Clone::clone)?;

        tokio::select! {
            biased;

            _ = request.signal().cancelled() => {
                tracing::debug!(url = %request.url(), "Transport aborted by cancellation");
                Err(FetchpError::Canceled)
            }
            result = Self::send(client, &request) => {
                if let Err(ref e) = result {
                    tracing::warn!(url = %request.url(), error = %e, "Request failed");
                }
                result
            }
        }
    }
}

type FetchFn = dyn Fn(Request) -> BoxFuture<'static, Result<Response, FetchpError>> + Send + Sync;

/// Transport answering every request with a closure
///
/// Useful in tests, or to route requests through a custom client.
#[derive(Clone)]
pub struct FnTransport {
    f: Arc<FetchFn>,
}

impl FnTransport {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchpError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |request| f(request).boxed()),
        }
    }
}

/// Answers every request with an empty 200
impl Default for FnTransport {
    fn default() -> Self {
        Self::new(|_| async { Ok(Response::default()) })
    }
}

#[async_trait]
impl Transport for FnTransport {
    fn name(&self) -> &'static str {
        "fn"
    }

    async fn fetch(&self, request: Request) -> Result<Response, FetchpError> {
        (self.f)(request).await
    }
}
