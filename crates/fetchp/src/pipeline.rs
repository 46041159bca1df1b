//! Per-call pipeline
//!
//! Design: a call is an explicit state machine. Each step consumes the
//! current [`Stage`] and returns the next one, so no step writes state that
//! another step captured. The externally visible [`RequestState`] is only
//! published through [`Pipeline::transition`], which also runs the status
//! callback and the StateChange hooks.
//!
//! ```text
//! Start ─► Built ─┬─ mock / cache hit ─► Loading ──┐
//!                 └─ network ──────────► Fetching ─┴─► Decoding ─► Decoded ─► Finished
//!        any step error ─► Failed ─► Finished      signal fired ─► Canceled ─► Finished
//! ```

use crate::cache::share;
use crate::client::Engine;
use crate::error::FetchpError;
use crate::hooks::HookEvent;
use crate::options::RequestOptions;
use crate::result::{CallState, Outcome};
use crate::types::{Request, RequestState, Response};
use crate::uris::UrlResolver;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

type ResponseFuture = BoxFuture<'static, Result<Response, FetchpError>>;

enum Stage<T> {
    /// Resolved method and URL, or why they failed to resolve
    Start(Result<(Method, Url), FetchpError>),
    /// Request constructed and announced to NewRequest hooks
    Built(Request),
    /// Network call in flight
    Fetching(Request, ResponseFuture),
    /// Mock or cache hit, response pending
    Loading(Request, ResponseFuture),
    Decoding(Request, Response),
    Decoded {
        request: Request,
        response: Response,
        value: serde_json::Value,
        data: T,
    },
    Failed(FetchpError),
    Canceled,
    Finished(Outcome<T>),
}

pub(crate) struct Pipeline<T> {
    engine: Arc<Engine>,
    call: Arc<CallState>,
    resolver: UrlResolver,
    options: RequestOptions<T>,
}

impl<T> Pipeline<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        engine: Arc<Engine>,
        call: Arc<CallState>,
        resolver: UrlResolver,
        options: RequestOptions<T>,
    ) -> Self {
        Self {
            engine,
            call,
            resolver,
            options,
        }
    }

    /// Drive the call to a terminal state
    pub(crate) async fn run(self, target: Result<(Method, Url), FetchpError>) -> Outcome<T> {
        let mut stage = Stage::Start(target);
        loop {
            stage = match stage {
                Stage::Finished(outcome) => return outcome,
                stage => match self.step(stage).await {
                    Ok(next) => next,
                    Err(error) => Stage::Failed(error),
                },
            };
        }
    }

    async fn step(&self, stage: Stage<T>) -> Result<Stage<T>, FetchpError> {
        match stage {
            Stage::Start(target) => self.prepare(target).await,
            Stage::Built(request) => self.dispatch(request).await,
            Stage::Fetching(request, response) => self.fetch(request, response).await,
            Stage::Loading(request, response) => self.load(request, response).await,
            Stage::Decoding(request, response) => self.decode(request, response),
            Stage::Decoded {
                request,
                response,
                value,
                data,
            } => self.succeed(request, response, value, data).await,
            Stage::Failed(error) => Ok(self.fail(error).await),
            Stage::Canceled => Ok(self.cancel().await),
            Stage::Finished(outcome) => Ok(Stage::Finished(outcome)),
        }
    }

    /// Build headers, run header hooks, construct the request, run NewRequest hooks
    async fn prepare(
        &self,
        target: Result<(Method, Url), FetchpError>,
    ) -> Result<Stage<T>, FetchpError> {
        self.transition(RequestState::Preparing).await?;

        let (method, url) = target?;
        let headers = self.options.initial_headers()?;
        let headers = self.build_headers(headers).await?;

        let mut request = Request::new(method, url)
            .with_headers(headers)
            .with_signal(self.call.signal().clone());
        if let Some(body) = &self.options.body {
            request = request.with_body(body.clone());
        }
        self.call.set_request(request.clone());

        self.engine
            .hooks
            .call_hooks_with_request(
                HookEvent::NewRequest(request.clone()),
                Some(&request),
                Some(&self.resolver),
            )
            .await?;

        Ok(Stage::Built(request))
    }

    async fn build_headers(&self, headers: HeaderMap) -> Result<HeaderMap, FetchpError> {
        match self
            .engine
            .hooks
            .call_global_hooks(HookEvent::BuildRequestHeaders(headers))
            .await?
        {
            HookEvent::BuildRequestHeaders(headers) => Ok(headers),
            other => Err(FetchpError::Hook {
                kind: other.kind(),
                message: "header hooks returned a different event".to_string(),
            }),
        }
    }

    /// Answer from a mock, join a cached response, or go to the network
    async fn dispatch(&self, request: Request) -> Result<Stage<T>, FetchpError> {
        if let Some(mock) = self.engine.mocks.find(&request, Some(&self.resolver)) {
            debug!(method = %request.method(), url = %request.url(), "Serving mocked response");
            let response = mock.respond(request.clone());
            self.transition(RequestState::Loading).await?;
            return Ok(Stage::Loading(request, response));
        }

        if let Some(cached) = self.engine.cache.find(&request, Some(&self.resolver)) {
            debug!(method = %request.method(), url = %request.url(), "Joining cached response");
            self.transition(RequestState::Loading).await?;
            return Ok(Stage::Loading(request, cached.boxed()));
        }

        if self.call.signal().is_cancelled() {
            return Ok(Stage::Canceled);
        }

        // Shared entries outlive their creator; every caller races its own signal in `settle`
        let outgoing = if self.options.cache_request {
            request.clone().with_signal(CancellationToken::new())
        } else {
            request.clone()
        };
        let transport = self.engine.transport.clone();
        let network = async move { transport.fetch(outgoing).await };

        let response = if self.options.cache_request {
            let (shared, joined) = self.engine.cache.find_or_insert_with(
                &request,
                Some(&self.resolver),
                || share(network),
            );
            if joined {
                self.transition(RequestState::Loading).await?;
                return Ok(Stage::Loading(request, shared.boxed()));
            }
            shared.boxed()
        } else {
            network.boxed()
        };

        debug!(
            transport = self.engine.transport.name(),
            method = %request.method(),
            url = %request.url(),
            "Fetching"
        );
        self.transition(RequestState::Fetching).await?;
        Ok(Stage::Fetching(request, response))
    }

    async fn fetch(&self, request: Request, response: ResponseFuture) -> Result<Stage<T>, FetchpError> {
        let Some(response) = self.settle(response).await? else {
            return Ok(Stage::Canceled);
        };
        self.transition(RequestState::Loading).await?;
        Ok(Stage::Decoding(request, response))
    }

    async fn load(&self, request: Request, response: ResponseFuture) -> Result<Stage<T>, FetchpError> {
        match self.settle(response).await? {
            Some(response) => Ok(Stage::Decoding(request, response)),
            None => Ok(Stage::Canceled),
        }
    }

    /// Await a response, giving up as soon as the call is canceled
    async fn settle(&self, response: ResponseFuture) -> Result<Option<Response>, FetchpError> {
        tokio::select! {
            biased;

            _ = self.call.signal().cancelled() => Ok(None),
            response = response => response.map(Some),
        }
    }

    fn decode(&self, request: Request, response: Response) -> Result<Stage<T>, FetchpError> {
        let value = response.decode()?;
        let data: T = serde_json::from_value(value.clone())?;

        if self.call.signal().is_cancelled() {
            return Ok(Stage::Canceled);
        }

        Ok(Stage::Decoded {
            request,
            response,
            value,
            data,
        })
    }

    /// Publish Success, then notify
    ///
    /// The outcome is settled before any success side effect runs, so a
    /// failing Success hook is only logged.
    async fn succeed(
        &self,
        request: Request,
        response: Response,
        value: serde_json::Value,
        data: T,
    ) -> Result<Stage<T>, FetchpError> {
        if self.call.signal().is_cancelled() {
            return Ok(Stage::Canceled);
        }

        self.finish_transition(RequestState::Success).await;

        if let Some(callback) = &self.options.success_callback {
            callback(&data);
        }

        if let Err(e) = self
            .engine
            .hooks
            .call_hooks_with_request(HookEvent::Success(value), Some(&request), Some(&self.resolver))
            .await
        {
            warn!(url = %request.url(), error = %e, "Success hook failed");
        }

        Ok(Stage::Finished(Outcome {
            response: Some(response),
            data: Some(data),
        }))
    }

    async fn fail(&self, error: FetchpError) -> Stage<T> {
        if self.call.signal().is_cancelled() {
            return self.cancel().await;
        }

        let request = self.call.request().cloned();
        warn!(
            url = request.as_ref().map(|r| r.url().as_str()).unwrap_or(""),
            error = %error,
            "Request pipeline failed"
        );

        self.call.set_error(error.clone());
        self.finish_transition(RequestState::Error).await;

        if let Some(callback) = &self.options.error_callback {
            callback(&error);
        }

        if let Err(e) = self
            .engine
            .hooks
            .call_hooks_with_request(HookEvent::Error(error), request.as_ref(), Some(&self.resolver))
            .await
        {
            warn!(error = %e, "Error hook failed");
        }

        Stage::Finished(Outcome::default())
    }

    async fn cancel(&self) -> Stage<T> {
        let request = self.call.request().cloned();
        debug!(
            url = request.as_ref().map(|r| r.url().as_str()).unwrap_or(""),
            "Request canceled"
        );

        self.finish_transition(RequestState::Canceled).await;

        if let Some(callback) = &self.options.cancel_callback {
            callback();
        }

        if let Err(e) = self
            .engine
            .hooks
            .call_hooks_with_request(HookEvent::Cancel, request.as_ref(), Some(&self.resolver))
            .await
        {
            warn!(error = %e, "Cancel hook failed");
        }

        Stage::Finished(Outcome::default())
    }

    /// Publish `next`, then run the status callback and StateChange hooks
    ///
    /// Repeated or disallowed moves are ignored.
    async fn transition(&self, next: RequestState) -> Result<(), FetchpError> {
        if !self.call.advance(next) {
            return Ok(());
        }

        let request = self.call.request().cloned();
        debug!(
            state = %next,
            url = request.as_ref().map(|r| r.url().as_str()).unwrap_or(""),
            "State change"
        );

        if let Some(callback) = &self.options.status_callback {
            callback(next);
        }

        self.engine
            .hooks
            .call_hooks_with_request(
                HookEvent::StateChange(next),
                request.as_ref(),
                Some(&self.resolver),
            )
            .await?;
        Ok(())
    }

    /// Terminal transitions cannot be undone, so hook failures are only logged
    async fn finish_transition(&self, next: RequestState) {
        if let Err(e) = self.transition(next).await {
            warn!(state = %next, error = %e, "StateChange hook failed");
        }
    }
}
