//! Core types for Fetchp

use crate::error::FetchpError;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Lifecycle state of a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Handle created, pipeline not started
    #[default]
    Idle,
    /// Building headers and the request, looking up mocks and cache
    Preparing,
    /// Network call issued
    Fetching,
    /// Response available, decoding the body
    Loading,
    /// Body decoded
    Success,
    /// A pipeline step failed
    Error,
    /// The cancellation signal was observed
    Canceled,
}

impl RequestState {
    /// Success, Error and Canceled are final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Success | RequestState::Error | RequestState::Canceled
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Error) | (_, Canceled) => true,
            (Idle, Preparing) => true,
            (Preparing, Fetching) | (Preparing, Loading) => true,
            (Fetching, Loading) => true,
            (Loading, Success) => true,
            _ => false,
        }
    }

    pub fn is_idle(self) -> bool {
        self == RequestState::Idle
    }

    pub fn is_fetching(self) -> bool {
        self == RequestState::Fetching
    }

    pub fn is_loading(self) -> bool {
        self == RequestState::Loading
    }

    pub fn is_success(self) -> bool {
        self == RequestState::Success
    }

    pub fn is_error(self) -> bool {
        self == RequestState::Error
    }

    pub fn is_canceled(self) -> bool {
        self == RequestState::Canceled
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestState::Idle => "idle",
            RequestState::Preparing => "preparing",
            RequestState::Fetching => "fetching",
            RequestState::Loading => "loading",
            RequestState::Success => "success",
            RequestState::Error => "error",
            RequestState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// A fully constructed request, as handed to hooks, mocks and the transport
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    signal: CancellationToken,
}

impl Request {
    /// Create a request with no headers, no body and a fresh cancellation signal
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            signal: CancellationToken::new(),
        }
    }

    /// Replace the headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach the call's cancellation signal
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = signal;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Cancellation signal of the call that built this request
    ///
    /// Transports are expected to abort the underlying exchange once it fires.
    pub fn signal(&self) -> &CancellationToken {
        &self.signal
    }
}

/// A buffered HTTP response
///
/// The body is held as [`Bytes`], so clones share the same buffer and every
/// consumer of a cached response can read it.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    /// Create an empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 response with a JSON body and `application/json` content type
    pub fn json(value: serde_json::Value) -> Self {
        Self::new(StatusCode::OK)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(value.to_string())
    }

    /// 200 response with a plain text body
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )
            .with_body(body.into())
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Content-Type header value, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Body as text, with invalid UTF-8 replaced
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body according to its content type
    ///
    /// `application/json*` bodies are parsed as JSON; anything else becomes
    /// a JSON string holding the body text.
    pub fn decode(&self) -> Result<serde_json::Value, FetchpError> {
        let is_json = self
            .content_type()
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            Ok(serde_json::from_slice(&self.body)?)
        } else {
            Ok(serde_json::Value::String(self.text_lossy()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_transitions() {
        use RequestState::*;

        assert!(Idle.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Fetching));
        assert!(Preparing.can_transition_to(Loading));
        assert!(Fetching.can_transition_to(Loading));
        assert!(Loading.can_transition_to(Success));
        assert!(Fetching.can_transition_to(Canceled));
        assert!(Preparing.can_transition_to(Error));

        assert!(!Idle.can_transition_to(Success));
        assert!(!Fetching.can_transition_to(Success));
        assert!(!Success.can_transition_to(Error));
        assert!(!Canceled.can_transition_to(Preparing));
        assert!(!Error.can_transition_to(Canceled));
    }

    #[test]
    fn test_state_display_and_serialization() {
        assert_eq!(RequestState::Canceled.to_string(), "canceled");
        assert_eq!(
            serde_json::to_string(&RequestState::Success).unwrap(),
            "\"success\""
        );
        assert!(RequestState::Error.is_terminal());
        assert!(!RequestState::Loading.is_terminal());
        assert!(RequestState::default().is_idle());
    }

    #[test]
    fn test_response_decode_json() {
        let resp = Response::json(json!({"hello": "world"}));
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.decode().unwrap(), json!({"hello": "world"}));
    }

    #[test]
    fn test_response_decode_json_with_charset() {
        let resp = Response::new(StatusCode::OK)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )
            .with_body("[1,2,3]");
        assert_eq!(resp.decode().unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_response_decode_text() {
        let resp = Response::text("{\"not\": \"parsed\"}");
        assert_eq!(
            resp.decode().unwrap(),
            json!("{\"not\": \"parsed\"}")
        );

        let no_type = Response::new(StatusCode::OK).with_body("plain");
        assert_eq!(no_type.decode().unwrap(), json!("plain"));
    }

    #[test]
    fn test_response_decode_invalid_json() {
        let resp = Response::new(StatusCode::OK)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{broken");
        assert!(matches!(resp.decode(), Err(FetchpError::Deserialize(_))));
    }

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://example.com/items").unwrap();
        let signal = CancellationToken::new();
        let req = Request::new(Method::POST, url.clone())
            .with_body("payload")
            .with_signal(signal.clone());

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.url(), &url);
        assert_eq!(req.body().map(|b| b.as_ref()), Some(&b"payload"[..]));

        signal.cancel();
        assert!(req.signal().is_cancelled());
    }
}
