//! The declarative request record.

use std::fmt;

use serde_json::{json, Value};

use crate::decoder::{succeed, Decoder};
use crate::http::{Header, Method};

/// Everything needed to perform one HTTP call and interpret its body as an `A`.
///
/// A plain owned value: "changing" a request means building a new one, either
/// with struct update syntax or through `RequestBuilder`. Clones share only the
/// immutable decoder.
pub struct Request<A> {
    /// Passed to the transport as-is; no validation happens here.
    pub url: String,
    pub method: Method,
    /// Request body, or query parameters for `get`/`head`.
    pub data: Value,
    /// Milliseconds; `0` means no explicit timeout.
    pub timeout: u64,
    /// Sent in order, duplicates included.
    pub headers: Vec<Header>,
    pub with_credentials: bool,
    pub decoder: Decoder<A>,
}

impl Request<Value> {
    /// A request with the factory defaults for `method`.
    ///
    /// `data` is `""` for `get` and `{}` otherwise; the decoder accepts any body
    /// and yields `{}`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let data = match method {
            Method::Get => Value::String(String::new()),
            _ => json!({}),
        };
        Self {
            url: url.into(),
            method,
            data,
            timeout: 0,
            headers: Vec::new(),
            with_credentials: true,
            decoder: succeed(json!({})),
        }
    }
}

impl<A> Clone for Request<A> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method,
            data: self.data.clone(),
            timeout: self.timeout,
            headers: self.headers.clone(),
            with_credentials: self.with_credentials,
            decoder: self.decoder.clone(),
        }
    }
}

impl<A> fmt::Debug for Request<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("with_credentials", &self.with_credentials)
            .field("decoder", &self.decoder)
            .finish()
    }
}
