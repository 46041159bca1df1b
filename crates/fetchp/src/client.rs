//! Request engine
//!
//! A [`Fetchp`] owns the hook, mock and cache registries and the transport.
//! Every call made through it sees the same registries; separate engines
//! share nothing.

use crate::cache::CacheRegistry;
use crate::error::FetchpError;
use crate::hooks::HookRegistry;
use crate::mocks::MockRegistry;
use crate::options::RequestOptions;
use crate::pipeline::Pipeline;
use crate::result::{CallState, ResultHandle};
use crate::transport::{FnTransport, ReqwestTransport, Transport};
use crate::types::{Request, Response};
use crate::uris::UrlResolver;
use parking_lot::RwLock;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// Shared state behind a [`Fetchp`]
pub(crate) struct Engine {
    pub(crate) base_url: RwLock<UrlResolver>,
    pub(crate) hooks: HookRegistry,
    pub(crate) mocks: MockRegistry,
    pub(crate) cache: CacheRegistry,
    pub(crate) transport: Arc<dyn Transport>,
}

/// Request engine
///
/// Cheap to clone; clones share registries, base URL and transport.
///
/// # Example
///
/// ```no_run
/// use fetchp::{Fetchp, RequestOptions};
///
/// # async fn example() -> Result<(), fetchp::FetchpError> {
/// let client = Fetchp::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let posts = client.request::<serde_json::Value>("GET", "/posts", RequestOptions::new());
/// if let Some(data) = posts.data().await {
///     println!("{data}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Fetchp {
    engine: Arc<Engine>,
}

impl Default for Fetchp {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetchp {
    /// Engine with no base URL and the reqwest transport
    pub fn new() -> Self {
        Self::from_parts(UrlResolver::default(), Arc::new(ReqwestTransport::new()))
    }

    pub fn builder() -> FetchpBuilder {
        FetchpBuilder::new()
    }

    fn from_parts(resolver: UrlResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            engine: Arc::new(Engine {
                base_url: RwLock::new(resolver),
                hooks: HookRegistry::new(),
                mocks: MockRegistry::new(),
                cache: CacheRegistry::new(),
                transport,
            }),
        }
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.engine.hooks
    }

    pub fn mocks(&self) -> &MockRegistry {
        &self.engine.mocks
    }

    pub fn cache(&self) -> &CacheRegistry {
        &self.engine.cache
    }

    pub fn base_url(&self) -> Option<Url> {
        self.engine.base_url.read().base().cloned()
    }

    /// Replace the base URL relative request URLs resolve against
    ///
    /// `None` removes it. Calls already made keep the base they started with.
    pub fn set_base_url(&self, base_url: Option<&str>) -> Result<(), FetchpError> {
        let resolver = match base_url {
            Some(base) => UrlResolver::parse(base)?,
            None => UrlResolver::default(),
        };
        tracing::debug!(base_url = ?base_url, "Base URL set");
        *self.engine.base_url.write() = resolver;
        Ok(())
    }

    /// Resolve `url` against the current base URL
    pub fn resolve_url(&self, url: &str) -> Result<Url, FetchpError> {
        self.engine.base_url.read().resolve(url)
    }

    /// Issue a call
    ///
    /// Never fails up front: a malformed method or URL makes the call end in
    /// Error, observable through the returned handle. Unless the options say
    /// otherwise the call starts right away, which needs a Tokio runtime.
    pub fn request<T>(&self, method: &str, url: &str, options: RequestOptions<T>) -> ResultHandle<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let resolver = self.engine.base_url.read().clone();
        let resolved = resolver.resolve(url);

        let method = options.method.as_deref().unwrap_or(method);
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| FetchpError::InvalidMethod(method.to_string()));

        let target = match (method, resolved.clone()) {
            (Ok(method), Ok(url)) => Ok((method, url)),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        let immediate = options.immediate;
        let call = Arc::new(CallState::new());
        let pipeline = Pipeline::new(self.engine.clone(), call.clone(), resolver, options);
        let handle = ResultHandle::prepared(call, resolved.ok(), pipeline.run(target));

        if immediate {
            handle.exec();
        }
        handle
    }
}

impl std::fmt::Debug for Fetchp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetchp")
            .field("base_url", &self.base_url().map(String::from))
            .field("transport", &self.engine.transport.name())
            .field("hooks", &self.engine.hooks)
            .field("mocks", &self.engine.mocks)
            .field("cache", &self.engine.cache)
            .finish()
    }
}

/// Builder for configuring a [`Fetchp`]
#[derive(Default)]
pub struct FetchpBuilder {
    /// Base URL for relative request URLs
    base_url: Option<String>,
    /// Custom User-Agent for the default transport
    user_agent: Option<String>,
    /// Replaces the default transport
    transport: Option<Arc<dyn Transport>>,
}

impl FetchpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set custom User-Agent
    ///
    /// Ignored when a custom transport is set.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Send requests through `transport`
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Send requests through a closure
    pub fn transport_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchpError>> + Send + 'static,
    {
        self.transport(FnTransport::new(f))
    }

    /// Build the engine
    pub fn build(self) -> Result<Fetchp, FetchpError> {
        let resolver = match &self.base_url {
            Some(base) => UrlResolver::parse(base)?,
            None => UrlResolver::default(),
        };

        let transport: Arc<dyn Transport> = match (self.transport, self.user_agent) {
            (Some(transport), _) => transport,
            (None, Some(user_agent)) => Arc::new(ReqwestTransport::with_user_agent(user_agent)),
            (None, None) => Arc::new(ReqwestTransport::new()),
        };

        Ok(Fetchp::from_parts(resolver, transport))
    }
}

impl std::fmt::Debug for FetchpBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchpBuilder")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Hook;
    use crate::types::RequestState;
    use crate::uris::UrlTemplate;
    use parking_lot::Mutex;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine whose transport counts calls and answers `{"ok": true}`
    fn counting_client() -> (Fetchp, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = Fetchp::builder()
            .transport_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Response::json(json!({"ok": true}))) }
            })
            .build()
            .unwrap();
        (client, calls)
    }

    #[test]
    fn test_builder_defaults() {
        let client = Fetchp::builder().build().unwrap();
        assert!(client.base_url().is_none());
        assert!(client.mocks().is_empty());
        assert!(client.cache().is_empty());
        assert!(client.hooks().is_empty());
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        let result = Fetchp::builder().base_url("not a url").build();
        assert!(matches!(result, Err(FetchpError::InvalidUrl { .. })));
    }

    #[test]
    fn test_base_url_resolution() {
        let client = Fetchp::builder().build().unwrap();
        client.set_base_url(Some("https://api.example.com")).unwrap();

        assert_eq!(
            client.resolve_url("/posts").unwrap().as_str(),
            "https://api.example.com/posts"
        );
        assert_eq!(
            client.resolve_url("http://other.example.com").unwrap().as_str(),
            "http://other.example.com/"
        );

        client.set_base_url(None).unwrap();
        assert!(client.base_url().is_none());
        assert!(client.resolve_url("/posts").is_err());
    }

    #[tokio::test]
    async fn test_constructed_request_uses_base_url() {
        let (client, _) = counting_client();
        client.set_base_url(Some("https://api.example.com")).unwrap();

        let relative = client.request::<Value>("GET", "/posts", RequestOptions::new());
        assert_eq!(
            relative.request_url().map(Url::as_str),
            Some("https://api.example.com/posts")
        );
        relative.finished().await;
        assert_eq!(
            relative.request().unwrap().url().as_str(),
            "https://api.example.com/posts"
        );

        let absolute = client.request::<Value>("GET", "http://other.example.com", RequestOptions::new());
        absolute.finished().await;
        assert_eq!(
            absolute.request().unwrap().url().as_str(),
            "http://other.example.com/"
        );
    }

    #[tokio::test]
    async fn test_mocked_response() {
        let (client, calls) = counting_client();
        client
            .mocks()
            .add("GET", "http://x/test", Response::json(json!({"hello": "world"})));

        let handle = client.request::<Value>("GET", "http://x/test", RequestOptions::new());
        assert_eq!(handle.data().await, Some(json!({"hello": "world"})));
        assert_eq!(handle.status(), RequestState::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mock_requires_exact_method() {
        let (client, calls) = counting_client();
        client.set_base_url(Some("http://x")).unwrap();
        client
            .mocks()
            .add("GET", "/items", Response::json(json!(["mocked"])));

        let get = client.request::<Value>("GET", "/items", RequestOptions::new());
        assert_eq!(get.data().await, Some(json!(["mocked"])));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let post = client.request::<Value>("POST", "/items", RequestOptions::new());
        assert_eq!(post.data().await, Some(json!({"ok": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mock_by_template() {
        let (client, _) = counting_client();
        client.mocks().add_fn(
            "GET",
            UrlTemplate::new("http://x/users/:id").unwrap(),
            |req: Request| async move {
                let id = req.url().path().trim_start_matches("/users/").to_string();
                Ok(Response::json(json!({ "id": id })))
            },
        );

        let handle = client.request::<Value>("GET", "http://x/users/42", RequestOptions::new());
        assert_eq!(handle.data().await, Some(json!({"id": "42"})));
    }

    #[tokio::test]
    async fn test_single_flight_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = Fetchp::builder()
            .transport_fn(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Response::json(json!({ "n": n })))
                }
            })
            .build()
            .unwrap();

        let options = RequestOptions::new().cache_request(true);
        let first = client.request::<Value>("GET", "http://x/slow", options.clone());
        let second = client.request::<Value>("GET", "http://x/slow", options);

        let (a, b) = tokio::join!(first.data(), second.data());
        assert_eq!(a, Some(json!({"n": 0})));
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.cache().len(), 1);

        client.cache().clear();
        let third = client.request::<Value>("GET", "http://x/slow", RequestOptions::new());
        assert_eq!(third.data().await, Some(json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_uncached_calls_do_not_register() {
        let (client, calls) = counting_client();
        let a = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        let b = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        a.finished().await;
        b.finished().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_abort_before_network_settles() {
        let client = Fetchp::builder()
            .transport_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(Response::json(json!({"late": true})))
            })
            .build()
            .unwrap();

        let canceled = Arc::new(AtomicUsize::new(0));
        let counter = canceled.clone();
        let handle = client.request::<Value>(
            "GET",
            "http://x/slow",
            RequestOptions::new().cancel_callback(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();

        assert_eq!(handle.data().await, None);
        assert_eq!(handle.status(), RequestState::Canceled);
        assert!(handle.error().is_none());
        assert_eq!(canceled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aborted_cached_call_leaves_entry_usable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = Fetchp::builder()
            .transport_fn(move |req: Request| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::select! {
                        _ = req.signal().cancelled() => Err(FetchpError::Canceled),
                        _ = tokio::time::sleep(Duration::from_millis(100)) => {
                            Ok(Response::json(json!({"ok": true})))
                        }
                    }
                }
            })
            .build()
            .unwrap();

        let first = client.request::<Value>(
            "GET",
            "http://x/shared",
            RequestOptions::new().cache_request(true),
        );
        first
            .subscribe()
            .wait_for(|state| *state == RequestState::Fetching)
            .await
            .unwrap();
        first.abort();
        assert_eq!(first.finished().await, RequestState::Canceled);

        let second = client.request::<Value>("GET", "http://x/shared", RequestOptions::new());
        assert_eq!(second.data().await, Some(json!({"ok": true})));
        assert_eq!(second.status(), RequestState::Success);
        assert!(second.error().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_before_exec() {
        let (client, calls) = counting_client();
        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new().immediate(false));
        handle.abort();
        handle.exec();

        assert_eq!(handle.data().await, None);
        assert_eq!(handle.status(), RequestState::Canceled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_ends_in_error() {
        let (client, calls) = counting_client();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();

        let handle = client.request::<Value>(
            "GET",
            "/no-base",
            RequestOptions::new().error_callback(move |e| seen.lock().push(e.to_string())),
        );

        assert_eq!(handle.data().await, None);
        assert_eq!(handle.status(), RequestState::Error);
        assert!(matches!(handle.error(), Some(FetchpError::InvalidUrl { .. })));
        assert!(handle.request_url().is_none());
        assert!(handle.request().is_none());
        assert_eq!(errors.lock().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_method_ends_in_error() {
        let (client, _) = counting_client();
        let handle = client.request::<Value>("BAD METHOD", "http://x/a", RequestOptions::new());
        assert_eq!(handle.finished().await, RequestState::Error);
        assert!(matches!(handle.error(), Some(FetchpError::InvalidMethod(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_ends_in_error() {
        let client = Fetchp::builder()
            .transport_fn(|_| async { Err(FetchpError::ConnectError("refused".to_string())) })
            .build()
            .unwrap();

        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        assert_eq!(handle.data().await, None);
        assert_eq!(handle.status(), RequestState::Error);
        assert!(matches!(handle.error(), Some(FetchpError::ConnectError(_))));
    }

    #[tokio::test]
    async fn test_header_hook_visible_to_new_request_hook() {
        let (client, _) = counting_client();
        let seen = Arc::new(Mutex::new(None));

        client.hooks().add(Hook::build_request_headers(|mut headers| async move {
            headers.insert("x-custom", HeaderValue::from_static("yes"));
            Ok(headers)
        }));
        let observed = seen.clone();
        client.hooks().add(Hook::new_request(move |req: Request| {
            *observed.lock() = req.headers().get("x-custom").cloned();
            async { Ok(()) }
        }));

        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        handle.finished().await;

        assert_eq!(seen.lock().clone(), Some(HeaderValue::from_static("yes")));
        let request = handle.request().unwrap();
        assert_eq!(request.headers()["x-custom"], "yes");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_failing_hook_ends_in_error() {
        let (client, calls) = counting_client();
        client
            .hooks()
            .add(Hook::new_request(|_| async { Err("nope".into()) }));

        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        assert_eq!(handle.data().await, None);
        assert_eq!(handle.status(), RequestState::Error);
        assert!(matches!(
            handle.error(),
            Some(FetchpError::Hook { message, .. }) if message == "nope"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_success_hook_keeps_success() {
        let (client, _) = counting_client();
        client
            .hooks()
            .add(Hook::success(|_, _| async { Err("reject".into()) }));

        let successes = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let (on_success, on_error) = (successes.clone(), errors.clone());

        let handle = client.request::<Value>(
            "GET",
            "http://x/a",
            RequestOptions::new()
                .success_callback(move |_| {
                    on_success.fetch_add(1, Ordering::SeqCst);
                })
                .error_callback(move |_| {
                    on_error.fetch_add(1, Ordering::SeqCst);
                }),
        );

        assert_eq!(handle.data().await, Some(json!({"ok": true})));
        assert_eq!(handle.status(), RequestState::Success);
        assert!(handle.error().is_none());
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hooks_run_one_after_another() {
        let (client, _) = counting_client();
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow = log.clone();
        client.hooks().add(Hook::new_request(move |_| {
            let slow = slow.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                slow.lock().push("slow");
                Ok(())
            }
        }));
        let fast = log.clone();
        client.hooks().add(Hook::new_request(move |_| {
            let fast = fast.clone();
            async move {
                fast.lock().push("fast");
                Ok(())
            }
        }));

        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new());
        assert_eq!(handle.finished().await, RequestState::Success);
        assert_eq!(*log.lock(), vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_url_scoped_hooks() {
        let (client, _) = counting_client();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        client.hooks().add_for_url(
            "GET",
            "http://x/watched",
            Hook::success(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            }),
        );

        client
            .request::<Value>("GET", "http://x/watched", RequestOptions::new())
            .data()
            .await;
        client
            .request::<Value>("GET", "http://x/other", RequestOptions::new())
            .data()
            .await;
        client
            .request::<Value>("POST", "http://x/watched", RequestOptions::new())
            .data()
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deferred_exec() {
        let (client, calls) = counting_client();
        let handle = client.request::<Value>("GET", "http://x/a", RequestOptions::new().auto_fetch(false));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.status(), RequestState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.exec();
        handle.exec();
        assert_eq!(handle.data().await, Some(json!({"ok": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_sequence() {
        let (client, _) = counting_client();
        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = states.clone();

        let handle = client.request::<Value>(
            "GET",
            "http://x/a",
            RequestOptions::new().status_callback(move |state| seen.lock().push(state)),
        );
        handle.data().await;

        assert_eq!(
            *states.lock(),
            vec![
                RequestState::Preparing,
                RequestState::Fetching,
                RequestState::Loading,
                RequestState::Success,
            ]
        );
    }

    #[tokio::test]
    async fn test_mocked_status_skips_fetching() {
        let (client, _) = counting_client();
        client.mocks().add("GET", "http://x/a", Response::text("hi"));
        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = states.clone();

        let handle = client.request::<String>(
            "GET",
            "http://x/a",
            RequestOptions::new().status_callback(move |state| seen.lock().push(state)),
        );
        assert_eq!(handle.data().await, Some("hi".to_string()));
        assert_eq!(
            *states.lock(),
            vec![RequestState::Preparing, RequestState::Loading, RequestState::Success]
        );
    }

    #[tokio::test]
    async fn test_success_callback_and_typed_body() {
        #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
        struct Post {
            id: u32,
            title: String,
        }

        let client = Fetchp::builder()
            .transport_fn(|_| async { Ok(Response::json(json!({"id": 1, "title": "hello"}))) })
            .build()
            .unwrap();
        let titles = Arc::new(Mutex::new(Vec::new()));
        let seen = titles.clone();

        let handle = client.request::<Post>(
            "GET",
            "http://x/posts/1",
            RequestOptions::new().success_callback(move |post: &Post| seen.lock().push(post.title.clone())),
        );

        let post = handle.data().await.unwrap();
        assert_eq!(post.id, 1);
        assert_eq!(*titles.lock(), vec!["hello".to_string()]);
        assert_eq!(handle.response().await.unwrap().status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_type_mismatch_ends_in_error() {
        let client = Fetchp::builder()
            .transport_fn(|_| async { Ok(Response::json(json!(["not", "a", "number"]))) })
            .build()
            .unwrap();

        let handle = client.request::<u64>("GET", "http://x/a", RequestOptions::new());
        assert_eq!(handle.data().await, None);
        assert!(matches!(handle.error(), Some(FetchpError::Deserialize(_))));
    }

    #[tokio::test]
    async fn test_request_carries_body_and_method_override() {
        let client = Fetchp::builder()
            .transport_fn(|req: Request| async move {
                let body = req.body().map(|b| String::from_utf8_lossy(b).into_owned());
                Ok(Response::json(json!({
                    "method": req.method().as_str(),
                    "body": body,
                })))
            })
            .build()
            .unwrap();

        let handle = client.request::<Value>(
            "GET",
            "http://x/a",
            RequestOptions::new().method("PUT").json(&json!({"a": 1})),
        );
        assert_eq!(
            handle.data().await,
            Some(json!({"method": "PUT", "body": "{\"a\":1}"}))
        );
    }
}
