//! Result handle returned by `Fetchp::request`

use crate::error::FetchpError;
use crate::types::{Request, RequestState, Response};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

/// State of one call, written by its pipeline and read through the handle
pub(crate) struct CallState {
    status: watch::Sender<RequestState>,
    request: OnceLock<Request>,
    error: OnceLock<FetchpError>,
    signal: CancellationToken,
}

impl CallState {
    pub(crate) fn new() -> Self {
        let (status, _) = watch::channel(RequestState::Idle);
        Self {
            status,
            request: OnceLock::new(),
            error: OnceLock::new(),
            signal: CancellationToken::new(),
        }
    }

    pub(crate) fn status(&self) -> RequestState {
        *self.status.borrow()
    }

    /// Move to `next` if the state machine allows it
    ///
    /// Returns false for repeated or backward moves, and for any move out
    /// of a terminal state.
    pub(crate) fn advance(&self, next: RequestState) -> bool {
        self.status.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn request(&self) -> Option<&Request> {
        self.request.get()
    }

    pub(crate) fn set_request(&self, request: Request) {
        let _ = self.request.set(request);
    }

    pub(crate) fn set_error(&self, error: FetchpError) {
        let _ = self.error.set(error);
    }

    pub(crate) fn signal(&self) -> &CancellationToken {
        &self.signal
    }
}

/// What a finished call resolved to
pub(crate) struct Outcome<T> {
    pub(crate) response: Option<Response>,
    pub(crate) data: Option<T>,
}

impl<T> Default for Outcome<T> {
    fn default() -> Self {
        Self {
            response: None,
            data: None,
        }
    }
}

impl<T: Clone> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        Self {
            response: self.response.clone(),
            data: self.data.clone(),
        }
    }
}

type SharedOutcome<T> = Shared<BoxFuture<'static, Outcome<T>>>;

/// Handle to one call
///
/// Created prepared; the pipeline runs on a Tokio task once
/// [`ResultHandle::exec`] is called (or right away for immediate calls).
/// `response()` and `data()` can be awaited any number of times and never
/// fail: they resolve to `None` when the call ends in Error or Canceled,
/// and [`ResultHandle::status`] tells the two apart.
pub struct ResultHandle<T> {
    call: Arc<CallState>,
    url: Option<Url>,
    start: Arc<Mutex<Option<BoxFuture<'static, ()>>>>,
    outcome: SharedOutcome<T>,
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            url: self.url.clone(),
            start: self.start.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("status", &self.status())
            .field("started", &self.is_started())
            .finish()
    }
}

impl<T> ResultHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a prepared handle around `pipeline`
    pub(crate) fn prepared<F>(call: Arc<CallState>, url: Option<Url>, pipeline: F) -> Self
    where
        F: std::future::Future<Output = Outcome<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let start = async move {
            let _ = tx.send(pipeline.await);
        }
        .boxed();

        Self {
            call,
            url,
            start: Arc::new(Mutex::new(Some(start))),
            outcome: rx.map(|outcome| outcome.unwrap_or_default()).boxed().shared(),
        }
    }

    /// The raw response; `None` on Error or Canceled
    pub async fn response(&self) -> Option<Response> {
        self.outcome.clone().await.response
    }

    /// The decoded body; `None` on Error or Canceled
    pub async fn data(&self) -> Option<T> {
        self.outcome.clone().await.data
    }
}

impl<T> ResultHandle<T> {
    /// Start the pipeline
    ///
    /// Only the first call starts anything; later calls are no-ops. Outside
    /// a Tokio runtime nothing is started and a later `exec()` can retry.
    pub fn exec(&self) -> &Self {
        let mut start = self.start.lock();
        let Some(pipeline) = start.take() else {
            return self;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(pipeline);
            }
            Err(_) => {
                tracing::warn!("exec() called outside a Tokio runtime; call not started");
                *start = Some(pipeline);
            }
        }
        self
    }

    /// Whether `exec()` has started the pipeline
    pub fn is_started(&self) -> bool {
        self.start.lock().is_none()
    }

    /// Current lifecycle state
    pub fn status(&self) -> RequestState {
        self.call.status()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.call.status.subscribe()
    }

    /// Wait until the call reaches Success, Error or Canceled
    ///
    /// Never returns for a call that is never started. Callbacks and hooks
    /// for the terminal state may still be running; await `data()` or
    /// `response()` to wait for the whole call.
    pub async fn finished(&self) -> RequestState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.status(),
        };
        state
    }

    /// The constructed request, once the pipeline has built it
    pub fn request(&self) -> Option<Request> {
        self.call.request.get().cloned()
    }

    /// The resolved request URL, or `None` when it failed to resolve
    pub fn request_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The error that ended the call, if any
    pub fn error(&self) -> Option<FetchpError> {
        self.call.error.get().cloned()
    }

    /// Cancel the call
    pub fn abort(&self) {
        self.call.signal().cancel();
    }

    /// The call's cancellation signal
    pub fn cancellation_token(&self) -> CancellationToken {
        self.call.signal().clone()
    }
}
