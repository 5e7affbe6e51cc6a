//! Wire-level HTTP types shared by requests, the engine and transports.
//!
//! # Design
//! These types describe one HTTP call and its raw outcome as plain data.
//! `Request<A>` knows how to interpret a response; `HttpRequest` and
//! `HttpResponse` only carry what crosses the transport boundary, so a
//! `Transport` implementation never sees a decoder.
//!
//! Bodies of unknown shape are `serde_json::Value`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::Request;

/// HTTP method for a request. Closed set; nothing else can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Head,
    Options,
    Delete,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Head,
        Method::Options,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Head => "head",
            Method::Options => "options",
            Method::Delete => "delete",
        }
    }

    /// Whether the method carries its data in the query string rather than a body.
    pub fn is_bodyless(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// A single header name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub field: String,
    pub value: String,
}

impl Header {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One HTTP call as handed to a `Transport`.
///
/// Built from a `Request<A>` by `HttpRequest::from_request`; everything except
/// the decoder is copied over untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Value,
    /// Milliseconds; `0` leaves the transport default in place.
    pub timeout: u64,
    pub headers: Vec<Header>,
    pub with_credentials: bool,
}

impl HttpRequest {
    pub fn from_request<A>(request: &Request<A>) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            body: request.data.clone(),
            timeout: request.timeout,
            headers: request.headers.clone(),
            with_credentials: request.with_credentials,
        }
    }
}

/// The raw outcome of a completed transport call.
///
/// Any status counts as completed, 4xx and 5xx included; only the decoder
/// decides whether the body is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: Value,
}

impl HttpResponse {
    /// First header matching `field`, compared case-insensitively.
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.field.eq_ignore_ascii_case(field))
            .map(|h| h.value.as_str())
    }
}

/// A decoded value together with the response it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<A> {
    pub response: HttpResponse,
    pub value: A,
}
