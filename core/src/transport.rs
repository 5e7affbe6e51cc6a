//! The network boundary.
//!
//! # Design
//! `Transport` is the only place I/O happens. It receives an `HttpRequest`
//! and returns a boxed future that settles with the raw `HttpResponse` or a
//! `TransportError`. Dropping that future is the cancellation signal, which
//! lets a `Task` abort an in-flight call by simply not polling it again.
//!
//! `HyperTransport` is the default implementation: a hyper-util client over a
//! rustls `HttpsConnector` wrapping `HttpConnector`, so both `http` and
//! `https` URLs work. It owns connection pooling and TLS; everything above it
//! treats the transport as opaque.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::TransportError;
use crate::http::{Header, HttpRequest, HttpResponse};

type Connector = HttpsConnector<HttpConnector>;

pub trait Transport: Send + Sync {
    /// Perform one call. Any status the server answers with is a success here.
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;
}

#[derive(Clone)]
pub struct HyperTransport {
    client: Client<Connector, Full<Bytes>>,
    default_headers: Vec<Header>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    fn prepare(&self, request: &HttpRequest) -> Result<http::Request<Full<Bytes>>, TransportError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| TransportError::invalid_url(format!("{}: {e}", request.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::invalid_url(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                request.url
            )));
        }

        let (content_type, body) = if request.method.is_bodyless() {
            append_query(&mut url, &request.body);
            (None, Bytes::new())
        } else {
            encode_body(&request.body)
        };

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(url.as_str());
        for header in self.default_headers.iter().chain(&request.headers) {
            builder = builder.header(header.field.as_str(), header.value.as_str());
        }

        let has_content_type = self
            .default_headers
            .iter()
            .chain(&request.headers)
            .any(|h| h.field.eq_ignore_ascii_case("content-type"));
        if let (Some(content_type), false) = (content_type, has_content_type) {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }

        builder
            .body(Full::new(body))
            .map_err(|e| TransportError::other(format!("cannot build request: {e}")))
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        let prepared = self.prepare(&request);
        let client = self.client.clone();
        let timeout = request.timeout;
        let with_credentials = request.with_credentials;

        async move {
            let prepared = prepared?;
            trace!(uri = %prepared.uri(), with_credentials, "sending request");
            if timeout == 0 {
                return exchange(client, prepared).await;
            }
            tokio::time::timeout(Duration::from_millis(timeout), exchange(client, prepared))
                .await
                .map_err(|_| TransportError::timeout(timeout))?
        }
        .boxed()
    }
}

#[derive(Debug, Default)]
pub struct HyperTransportBuilder {
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    default_headers: Vec<Header>,
}

impl HyperTransportBuilder {
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// `0` disables keep-alive pooling.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Sent on every request, ahead of the request's own headers.
    pub fn default_header(mut self, header: Header) -> Self {
        self.default_headers.push(header);
        self
    }

    pub fn build(self) -> HyperTransport {
        let mut builder = Client::builder(TokioExecutor::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder.pool_max_idle_per_host(max);
        }
        HyperTransport {
            client: builder.build(connector()),
            default_headers: self.default_headers,
        }
    }
}

/// TLS over the platform's trust store, falling back to the bundled webpki roots.
fn connector() -> Connector {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        debug!(%error, "skipping native certificate source");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    trace!(added, ignored, "loaded native root certificates");
    if roots.is_empty() {
        warn!("no native root certificates found, using webpki roots");
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    let tls = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http)
}

async fn exchange(
    client: Client<Connector, Full<Bytes>>,
    request: http::Request<Full<Bytes>>,
) -> Result<HttpResponse, TransportError> {
    let response = client.request(request).await.map_err(|e| {
        let message = describe(&e);
        if e.is_connect() {
            TransportError::connect(message)
        } else {
            TransportError::other(message)
        }
    })?;

    let status = response.status().as_u16();
    let headers: Vec<Header> = response
        .headers()
        .iter()
        .map(|(name, value)| Header::new(name.as_str(), String::from_utf8_lossy(value.as_bytes())))
        .collect();
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|e| TransportError::body(describe(&e)))?
        .to_bytes();
    debug!(status, len = bytes.len(), "response body read");

    Ok(HttpResponse {
        status,
        headers,
        body: parse_body(content_type.as_deref(), &bytes),
    })
}

/// Object members become query parameters; anything else is not sent.
fn append_query(url: &mut Url, data: &Value) {
    let Value::Object(map) = data else {
        return;
    };
    let pairs: Vec<(&str, String)> = map
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.as_str(), s.clone())),
            other => Some((key.as_str(), other.to_string())),
        })
        .collect();
    if pairs.is_empty() {
        return;
    }
    url.query_pairs_mut().extend_pairs(pairs);
}

fn encode_body(data: &Value) -> (Option<&'static str>, Bytes) {
    match data {
        Value::Null => (None, Bytes::new()),
        Value::String(s) if s.is_empty() => (None, Bytes::new()),
        Value::String(s) => (Some("text/plain; charset=utf-8"), Bytes::from(s.clone())),
        other => (Some("application/json"), Bytes::from(other.to_string())),
    }
}

/// A JSON content type is parsed; anything unparseable arrives as text for the decoder to judge.
fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json")) {
        match serde_json::from_slice(bytes) {
            Ok(value) => return value,
            Err(e) => debug!(error = %e, "JSON body did not parse, passing it on as text"),
        }
    }
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

/// Flatten an error and its sources into one line.
fn describe(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
