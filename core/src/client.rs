//! The execution engine: turns requests into tasks.
//!
//! # Design
//! `Http` holds only a shared transport and carries no state between calls.
//! `to_http_task` and `to_http_response_task` copy the request into a `Task`
//! without touching the network; the call is issued when the task is
//! resolved. The decoder runs exactly once, on whatever body the transport
//! produced, whatever the status code was.

use std::sync::Arc;

use tracing::debug_span;
use uuid::Uuid;

use crate::error::HttpError;
use crate::http::{HttpRequest, HttpResponse, Response};
use crate::request::Request;
use crate::task::Task;
use crate::transport::{HyperTransport, Transport};

/// Stateless engine that turns requests into tasks over one transport.
#[derive(Clone)]
pub struct Http {
    transport: Arc<dyn Transport>,
}

impl Http {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// A task resolving to the decoded body.
    pub fn to_http_task<A>(&self, request: impl Into<Request<A>>) -> Task<A>
    where
        A: 'static,
    {
        self.task(request.into(), |_, value| value)
    }

    /// A task resolving to the decoded body plus status and headers.
    pub fn to_http_response_task<A>(&self, request: impl Into<Request<A>>) -> Task<Response<A>>
    where
        A: 'static,
    {
        self.task(request.into(), |response, value| Response { response, value })
    }

    fn task<A, T, F>(&self, request: Request<A>, assemble: F) -> Task<T>
    where
        A: 'static,
        F: FnOnce(HttpResponse, A) -> T + Send + 'static,
    {
        let span = debug_span!(
            "http_task",
            task_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        let call = HttpRequest::from_request(&request);
        let decoder = request.decoder;
        let transport = Arc::clone(&self.transport);

        Task::new(
            move || transport.send(call),
            move |response| {
                let value = decoder.decode_any(&response.body).map_err(HttpError::Decode)?;
                Ok(assemble(response, value))
            },
            span,
        )
    }
}

impl Default for Http {
    fn default() -> Self {
        Self::new(HyperTransport::default())
    }
}

impl std::fmt::Debug for Http {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http").finish_non_exhaustive()
    }
}

/// `Http::default().to_http_task(request)`.
pub fn to_http_task<A: 'static>(request: impl Into<Request<A>>) -> Task<A> {
    Http::default().to_http_task(request)
}

/// `Http::default().to_http_response_task(request)`.
pub fn to_http_response_task<A: 'static>(request: impl Into<Request<A>>) -> Task<Response<A>> {
    Http::default().to_http_response_task(request)
}
