//! Typed HTTP requests with lazy, cancellable execution.
//!
//! # Overview
//! A `Request<A>` describes one HTTP call and how to interpret its body as an
//! `A`. `RequestBuilder<A>` builds requests fluently without ever mutating a
//! value in place. The `Http` engine turns either into a `Task`, which issues
//! the call only when resolved and can be cancelled at any point before it
//! settles.
//!
//! # Design
//! - Requests and builders are plain owned values; every builder operation
//!   returns a new builder.
//! - The decoder is a capability value carried by the request; it validates
//!   the raw body after the transport has finished.
//! - Failures are split in two: `HttpError::Transport` when the call did not
//!   complete, `HttpError::Decode` when it did but the body was unexpected.
//! - I/O lives behind the `Transport` trait; `HyperTransport` is the default.
//!
//! ```no_run
//! use typed_request::{decoder, get, to_http_task};
//!
//! # async fn run() -> Result<(), typed_request::HttpError> {
//! let status = to_http_task(
//!     get("http://localhost:3000/").with_decoder(decoder::field("status", decoder::string())),
//! )
//! .resolve()
//! .await?;
//! assert_eq!(status, "ok");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod decoder;
pub mod error;
pub mod http;
pub mod request;
pub mod task;
pub mod transport;

pub use builder::{del, get, head, options, patch, post, put, RequestBuilder};
pub use client::{to_http_response_task, to_http_task, Http};
pub use decoder::Decoder;
pub use error::{HttpError, TransportError, TransportErrorKind};
pub use http::{Header, HttpRequest, HttpResponse, Method, Response};
pub use request::Request;
pub use task::{CancelHandle, Task};
pub use transport::{HyperTransport, HyperTransportBuilder, Transport};
