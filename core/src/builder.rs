//! Immutable, fluent construction of requests.
//!
//! # Design
//! `RequestBuilder<A>` wraps exactly one `Request<A>`. Every transformation
//! takes `&self`, copies the backing record, replaces one field and returns a
//! new builder, so a builder can be shared and extended from several places
//! without either side observing the other's changes.

use serde_json::Value;

use crate::decoder::Decoder;
use crate::http::{Header, Method};
use crate::request::Request;

pub struct RequestBuilder<A> {
    request: Request<A>,
}

impl<A> RequestBuilder<A> {
    pub fn new(request: Request<A>) -> Self {
        Self { request }
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn data(&self) -> &Value {
        &self.request.data
    }

    pub fn timeout(&self) -> u64 {
        self.request.timeout
    }

    pub fn headers(&self) -> &[Header] {
        &self.request.headers
    }

    pub fn with_credentials(&self) -> bool {
        self.request.with_credentials
    }

    pub fn decoder(&self) -> &Decoder<A> {
        &self.request.decoder
    }

    /// The backing record, read-only.
    pub fn request(&self) -> &Request<A> {
        &self.request
    }

    pub fn into_request(self) -> Request<A> {
        self.request
    }

    pub fn with_data(&self, data: impl Into<Value>) -> RequestBuilder<A> {
        RequestBuilder::new(Request {
            data: data.into(),
            ..self.request.clone()
        })
    }

    /// No bounds checking; the value goes to the transport untouched.
    pub fn with_timeout(&self, timeout: u64) -> RequestBuilder<A> {
        RequestBuilder::new(Request {
            timeout,
            ..self.request.clone()
        })
    }

    pub fn set_with_credentials(&self, with_credentials: bool) -> RequestBuilder<A> {
        RequestBuilder::new(Request {
            with_credentials,
            ..self.request.clone()
        })
    }

    /// Replace the decoder, changing the type the request resolves to.
    pub fn with_decoder<B>(&self, decoder: Decoder<B>) -> RequestBuilder<B> {
        let request = &self.request;
        RequestBuilder::new(Request {
            url: request.url.clone(),
            method: request.method,
            data: request.data.clone(),
            timeout: request.timeout,
            headers: request.headers.clone(),
            with_credentials: request.with_credentials,
            decoder,
        })
    }

    /// Append `header`; earlier headers with the same field are kept.
    pub fn with_header(&self, header: Header) -> RequestBuilder<A> {
        let mut headers = self.request.headers.clone();
        headers.push(header);
        RequestBuilder::new(Request {
            headers,
            ..self.request.clone()
        })
    }
}

impl<A> Clone for RequestBuilder<A> {
    fn clone(&self) -> Self {
        Self::new(self.request.clone())
    }
}

impl<A> std::fmt::Debug for RequestBuilder<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RequestBuilder").field(&self.request).finish()
    }
}

impl<A> From<Request<A>> for RequestBuilder<A> {
    fn from(request: Request<A>) -> Self {
        Self::new(request)
    }
}

impl<A> From<RequestBuilder<A>> for Request<A> {
    fn from(builder: RequestBuilder<A>) -> Self {
        builder.request
    }
}

impl<A> From<&RequestBuilder<A>> for Request<A> {
    fn from(builder: &RequestBuilder<A>) -> Self {
        builder.request.clone()
    }
}

impl<A> From<&Request<A>> for Request<A> {
    fn from(request: &Request<A>) -> Self {
        request.clone()
    }
}

/// A basic `get` request: empty-string data, decoder yielding `{}`.
pub fn get(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Get, url))
}

pub fn post(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Post, url))
}

pub fn put(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Put, url))
}

pub fn patch(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Patch, url))
}

/// A basic `delete` request. Named `del` to sit beside `get`/`post`/`put`.
pub fn del(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Delete, url))
}

pub fn head(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Head, url))
}

pub fn options(url: impl Into<String>) -> RequestBuilder<Value> {
    RequestBuilder::new(Request::new(Method::Options, url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{fail, succeed};
    use serde_json::json;

    const URL: &str = "http://example.com";

    fn assert_defaults(builder: &RequestBuilder<Value>, method: Method, data: Value) {
        assert_eq!(builder.url(), URL);
        assert_eq!(builder.method(), method);
        assert_eq!(builder.data(), &data);
        assert_eq!(builder.timeout(), 0);
        assert!(builder.headers().is_empty());
        assert!(builder.with_credentials());
        assert_eq!(builder.decoder().decode_any(&json!({})), Ok(json!({})));
        assert_eq!(builder.decoder().decode_any(&json!([1, "x"])), Ok(json!({})));
    }

    #[test]
    fn get_defaults() {
        assert_defaults(&get(URL), Method::Get, json!(""));
    }

    #[test]
    fn post_put_delete_defaults() {
        assert_defaults(&post(URL), Method::Post, json!({}));
        assert_defaults(&put(URL), Method::Put, json!({}));
        assert_defaults(&del(URL), Method::Delete, json!({}));
    }

    #[test]
    fn remaining_factories_follow_the_same_defaults() {
        assert_defaults(&patch(URL), Method::Patch, json!({}));
        assert_defaults(&head(URL), Method::Head, json!({}));
        assert_defaults(&options(URL), Method::Options, json!({}));
    }

    #[test]
    fn with_data_replaces_only_data() {
        let before = get(URL).with_timeout(10).with_header(Header::new("A", "1"));
        let after = before.with_data(json!({"key": "value"}));

        assert_eq!(after.data(), &json!({"key": "value"}));
        assert_eq!(before.data(), &json!(""));
        assert_eq!(after.url(), before.url());
        assert_eq!(after.method(), before.method());
        assert_eq!(after.timeout(), before.timeout());
        assert_eq!(after.headers(), before.headers());
        assert_eq!(after.with_credentials(), before.with_credentials());
    }

    #[test]
    fn with_timeout_passes_any_value_through() {
        let builder = get(URL).with_timeout(10_000);
        assert_eq!(builder.timeout(), 10_000);
        assert_eq!(get(URL).with_timeout(u64::MAX).timeout(), u64::MAX);
        assert_eq!(builder.data(), &json!(""));
    }

    #[test]
    fn set_with_credentials_replaces_only_the_flag() {
        let before = post(URL);
        let after = before.set_with_credentials(false);
        assert!(!after.with_credentials());
        assert!(before.with_credentials());
        assert_eq!(after.data(), before.data());
        assert_eq!(after.method(), before.method());
    }

    #[test]
    fn with_decoder_changes_type_and_nothing_else() {
        let before = post(URL)
            .with_data(json!({"a": 1}))
            .with_timeout(500)
            .set_with_credentials(false)
            .with_header(Header::new("Accept", "application/json"));
        let after: RequestBuilder<String> = before.with_decoder(succeed("new".to_string()));

        assert_eq!(after.decoder().decode_any(&json!("new")), Ok("new".to_string()));
        assert_eq!(after.url(), before.url());
        assert_eq!(after.method(), before.method());
        assert_eq!(after.data(), before.data());
        assert_eq!(after.timeout(), before.timeout());
        assert_eq!(after.headers(), before.headers());
        assert_eq!(after.with_credentials(), before.with_credentials());
        assert_eq!(before.decoder().decode_any(&json!("new")), Ok(json!({})));
    }

    #[test]
    fn with_header_appends_in_order() {
        let h1 = Header::new("Content-Type", "application/json");
        let h2 = Header::new("Authorization", "Bearer token");
        let builder = get(URL).with_header(h1.clone()).with_header(h2.clone());
        assert_eq!(builder.headers(), &[h1, h2]);
    }

    #[test]
    fn with_header_keeps_duplicates() {
        let builder = get(URL)
            .with_header(Header::new("X-Tag", "a"))
            .with_header(Header::new("X-Tag", "b"));
        assert_eq!(
            builder.headers(),
            &[Header::new("X-Tag", "a"), Header::new("X-Tag", "b")]
        );
    }

    #[test]
    fn derived_builders_do_not_alias() {
        let base = get(URL).with_header(Header::new("A", "1"));
        let left = base.with_header(Header::new("B", "2"));
        let right = base.with_header(Header::new("C", "3"));

        assert_eq!(base.headers().len(), 1);
        assert_eq!(left.headers()[1], Header::new("B", "2"));
        assert_eq!(right.headers()[1], Header::new("C", "3"));
    }

    #[test]
    fn chaining_applies_every_change() {
        let header = Header::new("Content-Type", "application/json");
        let builder = get(URL)
            .with_data(json!({"key": "value"}))
            .with_timeout(10_000)
            .set_with_credentials(false)
            .with_header(header.clone())
            .with_decoder(succeed(123));

        assert_eq!(builder.data(), &json!({"key": "value"}));
        assert_eq!(builder.timeout(), 10_000);
        assert!(!builder.with_credentials());
        assert_eq!(builder.headers(), &[header]);
        assert_eq!(builder.decoder().decode_any(&json!(123)), Ok(123));
    }

    #[test]
    fn failing_decoder_through_the_builder() {
        let builder = get(URL).with_decoder(fail::<String>("Failed to decode"));
        assert_eq!(
            builder.decoder().decode_any(&json!("anything")),
            Err("Failed to decode".to_string())
        );
    }

    #[test]
    fn converts_to_and_from_the_record() {
        let builder = put(URL).with_timeout(7);
        let request: Request<Value> = (&builder).into();
        assert_eq!(request.timeout, 7);

        let again = RequestBuilder::from(request);
        assert_eq!(again.method(), Method::Put);
        assert_eq!(again.into_request().url, URL);
    }

    #[test]
    fn builders_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        let builder = get(URL);
        assert_send_sync(&builder);

        let handle = {
            let builder = builder.clone();
            std::thread::spawn(move || builder.with_timeout(1).timeout())
        };
        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(builder.timeout(), 0);
    }
}
