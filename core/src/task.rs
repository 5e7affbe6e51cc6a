//! Deferred, cancellable HTTP computations.
//!
//! # Design
//! A `Task<T>` holds two steps: `dispatch`, which issues the transport call,
//! and `finish`, which turns the raw response into a `T` (normally by running
//! the request's decoder). Nothing runs until the task is resolved, and
//! resolving consumes it, so one task issues at most one call and decodes at
//! most once.
//!
//! Cancellation goes through a `CancelHandle` backed by a `watch` channel.
//! While the call is in flight the dispatch future is raced against the
//! handle and dropped when cancellation wins; the transport's own drop logic
//! aborts the connection. The flag is checked again after the call completes,
//! so `finish` never runs once a cancellation request has been honored.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, warn, Instrument, Span};

use crate::error::{HttpError, TransportError, TransportErrorKind};
use crate::http::HttpResponse;

type Dispatch = Box<dyn FnOnce() -> BoxFuture<'static, Result<HttpResponse, TransportError>> + Send>;
type Finish<T> = Box<dyn FnOnce(HttpResponse) -> Result<T, HttpError> + Send>;

/// Requests cancellation of one task. Cheap to clone; any clone may cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Ask the task to stop. Has no effect once the task has settled.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once `cancel` has been called.
    async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let signalled = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !signalled {
            // The sender lives as long as `self`, so this is unreachable in practice.
            std::future::pending::<()>().await;
        }
    }
}

/// A deferred HTTP call that settles once, to a `T` or an `HttpError`.
pub struct Task<T> {
    dispatch: Dispatch,
    finish: Finish<T>,
    cancel: CancelHandle,
    span: Span,
}

impl<T> Task<T> {
    pub(crate) fn new<D, Fut, F>(dispatch: D, finish: F, span: Span) -> Self
    where
        D: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<HttpResponse, TransportError>> + Send + 'static,
        F: FnOnce(HttpResponse) -> Result<T, HttpError> + Send + 'static,
    {
        Self {
            dispatch: Box::new(move || dispatch().boxed()),
            finish: Box::new(finish),
            cancel: CancelHandle::new(),
            span,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Transform the success value. Runs nothing.
    pub fn map<U, F>(self, f: F) -> Task<U>
    where
        T: 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let finish = self.finish;
        Task {
            dispatch: self.dispatch,
            finish: Box::new(move |response| finish(response).map(f)),
            cancel: self.cancel,
            span: self.span,
        }
    }

    /// Drive the task: issue the call, wait for it, then decode.
    pub async fn resolve(self) -> Result<T, HttpError> {
        let Task {
            dispatch,
            finish,
            cancel,
            span,
        } = self;

        async move {
            if cancel.is_cancelled() {
                debug!("cancelled before dispatch");
                return Err(TransportError::cancelled().into());
            }

            debug!("dispatching");
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::cancelled()),
                outcome = dispatch() => outcome,
            };

            let response = match outcome {
                Ok(response) => response,
                Err(e) if e.kind == TransportErrorKind::Cancelled => {
                    debug!("cancelled in flight");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "transport failed");
                    return Err(e.into());
                }
            };

            if cancel.is_cancelled() {
                debug!(status = response.status, "cancelled after completion, not decoding");
                return Err(TransportError::cancelled().into());
            }

            debug!(status = response.status, "response received");
            let result = finish(response);
            if let Err(HttpError::Decode(message)) = &result {
                debug!(%message, "decoder rejected body");
            }
            result
        }
        .instrument(span)
        .await
    }
}

impl<T: Send + 'static> IntoFuture for Task<T> {
    type Output = Result<T, HttpError>;
    type IntoFuture = BoxFuture<'static, Result<T, HttpError>>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve().boxed()
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ok_response() -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: json!({"status": "ok"}),
        }
    }

    fn counting_task(
        calls: Arc<AtomicUsize>,
        decodes: Arc<AtomicUsize>,
        delay: Duration,
    ) -> Task<Value> {
        Task::new(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(ok_response())
            },
            move |response| {
                decodes.fetch_add(1, Ordering::SeqCst);
                Ok(response.body)
            },
            Span::none(),
        )
    }

    #[tokio::test]
    async fn construction_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let decodes = Arc::new(AtomicUsize::new(0));
        let task = counting_task(calls.clone(), decodes.clone(), Duration::ZERO);

        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let body = task.resolve().await.unwrap();
        assert_eq!(body, json!({"status": "ok"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_before_resolve_never_dispatches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let decodes = Arc::new(AtomicUsize::new(0));
        let task = counting_task(calls.clone(), decodes.clone(), Duration::ZERO);

        task.cancel();
        let err = task.resolve().await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_in_flight_skips_the_decoder() {
        let calls = Arc::new(AtomicUsize::new(0));
        let decodes = Arc::new(AtomicUsize::new(0));
        let task = counting_task(calls.clone(), decodes.clone(), Duration::from_secs(30));
        let handle = task.cancel_handle();

        let running = tokio::spawn(task.resolve());
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let err = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("cancellation should settle the task")
            .unwrap()
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_during_the_call_wins_over_completion() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let counter = decodes.clone();
        let handle_slot: Arc<std::sync::Mutex<Option<CancelHandle>>> = Default::default();
        let slot = handle_slot.clone();

        // The transport cancels the task itself and then reports success.
        let task = Task::new(
            move || async move {
                if let Some(handle) = slot.lock().unwrap().as_ref() {
                    handle.cancel();
                }
                Ok(ok_response())
            },
            move |response| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(response.status)
            },
            Span::none(),
        );
        *handle_slot.lock().unwrap() = Some(task.cancel_handle());

        let err = task.resolve().await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_errors_bypass_finish() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let counter = decodes.clone();
        let task: Task<u16> = Task::new(
            || async { Err(TransportError::connect("connection refused")) },
            move |response| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(response.status)
            },
            Span::none(),
        );

        let err = task.await.unwrap_err();
        assert_eq!(
            err,
            HttpError::Transport(TransportError::connect("connection refused"))
        );
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decode_failures_surface_as_decode_errors() {
        let task: Task<u16> = Task::new(
            || async { Ok(ok_response()) },
            |_| Err(HttpError::Decode("Bad mojo".to_string())),
            Span::none(),
        );
        assert_eq!(
            task.resolve().await,
            Err(HttpError::Decode("Bad mojo".to_string()))
        );
    }

    #[tokio::test]
    async fn map_post_processes_the_value() {
        let task = Task::new(
            || async { Ok(ok_response()) },
            |response| Ok(response.status),
            Span::none(),
        )
        .map(|status| status + 1);
        assert_eq!(task.await, Ok(201));
    }

    #[test]
    fn cancel_handle_reports_state() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_cancelled());
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
