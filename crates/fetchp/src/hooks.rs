//! Lifecycle hooks
//!
//! Each [`HookKind`] owns a list of global callbacks and a [`UrlCollection`]
//! of callbacks scoped to a method + URL pattern. Dispatch runs the global
//! callbacks first, then the scoped ones matching the request, awaiting each
//! before starting the next. The first failing callback stops the dispatch
//! and its error is returned to the pipeline step that triggered it.
//!
//! Callbacks are typed per event: a [`Hook`] is a tagged union holding one
//! callback signature per kind, and a [`HookEvent`] carries the matching
//! payload.

use crate::error::{FetchpError, HookError};
use crate::types::{Request, RequestState};
use crate::uris::{UrlPattern, UrlResolver};
use crate::url_collection::{MethodSet, UrlCollection};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Result of a hook callback
pub type HookResult<T = ()> = Result<T, HookError>;

/// Lifecycle points hooks can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKind {
    /// Headers are built but the request is not; callbacks may rewrite them
    BuildRequestHeaders,
    /// The request has been constructed
    NewRequest,
    /// The call moved to a new state
    StateChange,
    /// The body was decoded
    Success,
    /// A pipeline step failed
    Error,
    /// The call was canceled
    Cancel,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HookKind::BuildRequestHeaders => "BuildRequestHeaders",
            HookKind::NewRequest => "NewRequest",
            HookKind::StateChange => "StateChange",
            HookKind::Success => "Success",
            HookKind::Error => "Error",
            HookKind::Cancel => "Cancel",
        };
        f.write_str(name)
    }
}

type HeadersFn = dyn Fn(HeaderMap) -> BoxFuture<'static, HookResult<HeaderMap>> + Send + Sync;
type RequestFn = dyn Fn(Request) -> BoxFuture<'static, HookResult> + Send + Sync;
type StateFn = dyn Fn(Option<Request>, RequestState) -> BoxFuture<'static, HookResult> + Send + Sync;
type SuccessFn =
    dyn Fn(Option<Request>, serde_json::Value) -> BoxFuture<'static, HookResult> + Send + Sync;
type ErrorFn = dyn Fn(Option<Request>, FetchpError) -> BoxFuture<'static, HookResult> + Send + Sync;
type CancelFn = dyn Fn(Option<Request>) -> BoxFuture<'static, HookResult> + Send + Sync;

/// A lifecycle callback, tagged with the event it handles
#[derive(Clone)]
pub enum Hook {
    BuildRequestHeaders(Arc<HeadersFn>),
    NewRequest(Arc<RequestFn>),
    StateChange(Arc<StateFn>),
    Success(Arc<SuccessFn>),
    Error(Arc<ErrorFn>),
    Cancel(Arc<CancelFn>),
}

impl Hook {
    /// Receives the headers and returns the headers to build the request with
    pub fn build_request_headers<F, Fut>(f: F) -> Self
    where
        F: Fn(HeaderMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<HeaderMap>> + Send + 'static,
    {
        Hook::BuildRequestHeaders(Arc::new(move |headers| f(headers).boxed()))
    }

    pub fn new_request<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::NewRequest(Arc::new(move |request| f(request).boxed()))
    }

    pub fn state_change<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Request>, RequestState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::StateChange(Arc::new(move |request, state| f(request, state).boxed()))
    }

    /// Receives the decoded body (JSON, or a JSON string for text bodies)
    pub fn success<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Request>, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::Success(Arc::new(move |request, data| f(request, data).boxed()))
    }

    pub fn error<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Request>, FetchpError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::Error(Arc::new(move |request, err| f(request, err).boxed()))
    }

    pub fn cancel<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Request>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::Cancel(Arc::new(move |request| f(request).boxed()))
    }

    pub fn kind(&self) -> HookKind {
        match self {
            Hook::BuildRequestHeaders(_) => HookKind::BuildRequestHeaders,
            Hook::NewRequest(_) => HookKind::NewRequest,
            Hook::StateChange(_) => HookKind::StateChange,
            Hook::Success(_) => HookKind::Success,
            Hook::Error(_) => HookKind::Error,
            Hook::Cancel(_) => HookKind::Cancel,
        }
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hook::{}", self.kind())
    }
}

/// Payload handed to the hooks of one kind
#[derive(Debug, Clone)]
pub enum HookEvent {
    BuildRequestHeaders(HeaderMap),
    NewRequest(Request),
    StateChange(RequestState),
    Success(serde_json::Value),
    Error(FetchpError),
    Cancel,
}

impl HookEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            HookEvent::BuildRequestHeaders(_) => HookKind::BuildRequestHeaders,
            HookEvent::NewRequest(_) => HookKind::NewRequest,
            HookEvent::StateChange(_) => HookKind::StateChange,
            HookEvent::Success(_) => HookKind::Success,
            HookEvent::Error(_) => HookKind::Error,
            HookEvent::Cancel => HookKind::Cancel,
        }
    }
}

#[derive(Default)]
struct HookSet {
    global: Vec<Hook>,
    scoped: UrlCollection<Hook>,
}

/// Registry of lifecycle hooks, shared by every call of one engine
#[derive(Default)]
pub struct HookRegistry {
    items: RwLock<HashMap<HookKind, HookSet>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global hook
    pub fn add(&self, hook: Hook) {
        self.items
            .write()
            .entry(hook.kind())
            .or_default()
            .global
            .push(hook);
    }

    /// Register a hook that only fires for requests matching `methods` and `pattern`
    pub fn add_for_url(
        &self,
        methods: impl Into<MethodSet>,
        pattern: impl Into<UrlPattern>,
        hook: Hook,
    ) {
        self.items
            .write()
            .entry(hook.kind())
            .or_default()
            .scoped
            .add(methods, pattern, hook);
    }

    /// Remove every hook of every kind
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Remove every hook of one kind
    pub fn clear_kind(&self, kind: HookKind) {
        self.items.write().remove(&kind);
    }

    /// Number of hooks registered for `kind`, global and scoped
    pub fn len(&self, kind: HookKind) -> usize {
        self.items
            .read()
            .get(&kind)
            .map(|set| set.global.len() + set.scoped.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items
            .read()
            .values()
            .all(|set| set.global.is_empty() && set.scoped.is_empty())
    }

    /// Dispatch `event` to the global hooks of its kind
    pub async fn call_global_hooks(&self, event: HookEvent) -> Result<HookEvent, FetchpError> {
        self.call_hooks_with_request(event, None, None).await
    }

    /// Dispatch `event` to the global hooks, then to the scoped hooks matching `request`
    ///
    /// The (possibly rewritten) event is returned so a header-building
    /// dispatch hands back the final headers.
    pub async fn call_hooks_with_request(
        &self,
        event: HookEvent,
        request: Option<&Request>,
        resolver: Option<&UrlResolver>,
    ) -> Result<HookEvent, FetchpError> {
        let hooks = self.snapshot(event.kind(), request, resolver);
        if hooks.is_empty() {
            return Ok(event);
        }

        tracing::debug!(kind = %event.kind(), count = hooks.len(), "Dispatching hooks");

        let mut event = event;
        for hook in &hooks {
            event = invoke(hook, event, request).await?;
        }
        Ok(event)
    }

    /// Hooks to run for one dispatch, cloned so no lock is held across awaits
    fn snapshot(
        &self,
        kind: HookKind,
        request: Option<&Request>,
        resolver: Option<&UrlResolver>,
    ) -> Vec<Hook> {
        let items = self.items.read();
        let Some(set) = items.get(&kind) else {
            return Vec::new();
        };

        let mut hooks = set.global.clone();
        if let Some(request) = request {
            hooks.extend(
                set.scoped
                    .filter_by_request(request, resolver)
                    .into_iter()
                    .map(|item| item.data.clone()),
            );
        }
        hooks
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.items.read();
        let mut map = f.debug_map();
        for (kind, set) in items.iter() {
            map.entry(kind, &(set.global.len() + set.scoped.len()));
        }
        map.finish()
    }
}

async fn invoke(
    hook: &Hook,
    event: HookEvent,
    request: Option<&Request>,
) -> Result<HookEvent, FetchpError> {
    let kind = hook.kind();
    let wrap = |err| FetchpError::from_hook(kind, err);

    match (hook, event) {
        (Hook::BuildRequestHeaders(f), HookEvent::BuildRequestHeaders(headers)) => {
            let headers = f(headers).await.map_err(wrap)?;
            Ok(HookEvent::BuildRequestHeaders(headers))
        }
        (Hook::NewRequest(f), HookEvent::NewRequest(req)) => {
            f(req.clone()).await.map_err(wrap)?;
            Ok(HookEvent::NewRequest(req))
        }
        (Hook::StateChange(f), HookEvent::StateChange(state)) => {
            f(request.cloned(), state).await.map_err(wrap)?;
            Ok(HookEvent::StateChange(state))
        }
        (Hook::Success(f), HookEvent::Success(data)) => {
            f(request.cloned(), data.clone()).await.map_err(wrap)?;
            Ok(HookEvent::Success(data))
        }
        (Hook::Error(f), HookEvent::Error(err)) => {
            f(request.cloned(), err.clone()).await.map_err(wrap)?;
            Ok(HookEvent::Error(err))
        }
        (Hook::Cancel(f), HookEvent::Cancel) => {
            f(request.cloned()).await.map_err(wrap)?;
            Ok(HookEvent::Cancel)
        }
        // snapshots are keyed by kind, so a mismatch is skipped
        (_, event) => Ok(event),
    }
}
