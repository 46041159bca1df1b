//! Per-call options

use crate::error::FetchpError;
use crate::types::RequestState;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;

type StatusCallback = Arc<dyn Fn(RequestState) + Send + Sync>;
type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&FetchpError) + Send + Sync>;
type CancelCallback = Arc<dyn Fn() + Send + Sync>;

/// Options for a single call
///
/// `T` is the type the response body is decoded into.
pub struct RequestOptions<T = serde_json::Value> {
    pub(crate) immediate: bool,
    pub(crate) cache_request: bool,
    pub(crate) method: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) raw_headers: Vec<(String, String)>,
    pub(crate) body: Option<Bytes>,
    pub(crate) status_callback: Option<StatusCallback>,
    pub(crate) success_callback: Option<SuccessCallback<T>>,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) cancel_callback: Option<CancelCallback>,
}

impl<T> Default for RequestOptions<T> {
    fn default() -> Self {
        Self {
            immediate: true,
            cache_request: false,
            method: None,
            headers: HeaderMap::new(),
            raw_headers: Vec::new(),
            body: None,
            status_callback: None,
            success_callback: None,
            error_callback: None,
            cancel_callback: None,
        }
    }
}

impl<T> Clone for RequestOptions<T> {
    fn clone(&self) -> Self {
        Self {
            immediate: self.immediate,
            cache_request: self.cache_request,
            method: self.method.clone(),
            headers: self.headers.clone(),
            raw_headers: self.raw_headers.clone(),
            body: self.body.clone(),
            status_callback: self.status_callback.clone(),
            success_callback: self.success_callback.clone(),
            error_callback: self.error_callback.clone(),
            cancel_callback: self.cancel_callback.clone(),
        }
    }
}

impl<T> std::fmt::Debug for RequestOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("immediate", &self.immediate)
            .field("cache_request", &self.cache_request)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("raw_headers", &self.raw_headers)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl<T> RequestOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the pipeline right away (default) or wait for `exec()`
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Alias of [`RequestOptions::immediate`]
    pub fn auto_fetch(self, auto_fetch: bool) -> Self {
        self.immediate(auto_fetch)
    }

    /// Share the in-flight response with identical later calls
    pub fn cache_request(mut self, cache_request: bool) -> Self {
        self.cache_request = cache_request;
        self
    }

    /// Override the method passed to `request()`
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header; malformed names or values fail the call
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw_headers.push((name.into(), value.into()));
        self
    }

    /// Merge typed headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with an `application/json` content type
    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(value.to_string()));
        self
    }

    /// Called on every state transition
    pub fn status_callback(mut self, f: impl Fn(RequestState) + Send + Sync + 'static) -> Self {
        self.status_callback = Some(Arc::new(f));
        self
    }

    /// Called with the decoded body
    pub fn success_callback(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.success_callback = Some(Arc::new(f));
        self
    }

    pub fn error_callback(mut self, f: impl Fn(&FetchpError) + Send + Sync + 'static) -> Self {
        self.error_callback = Some(Arc::new(f));
        self
    }

    pub fn cancel_callback(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel_callback = Some(Arc::new(f));
        self
    }

    /// Headers the call starts from, before header hooks run
    ///
    /// Content-Type defaults to `application/json` unless already set.
    pub(crate) fn initial_headers(&self) -> Result<HeaderMap, FetchpError> {
        let mut headers = self.headers.clone();

        for (name, value) in &self.raw_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchpError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| FetchpError::InvalidHeader(name.clone()))?;
            headers.append(header_name, header_value);
        }

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }
}
