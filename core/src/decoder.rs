//! Decoders: turn a body of unknown shape into a typed value.
//!
//! A `Decoder<A>` is a capability value, not just a type parameter: it carries
//! the function that validates a `serde_json::Value` and yields either an `A`
//! or a textual error. Decoders are immutable and cheap to clone, so requests
//! that share one never interfere with each other.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

type DecodeFn<A> = dyn Fn(&Value) -> Result<A, String> + Send + Sync;

pub struct Decoder<A> {
    run: Arc<DecodeFn<A>>,
}

impl<A> Clone for Decoder<A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<A> fmt::Debug for Decoder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("output", &std::any::type_name::<A>())
            .finish()
    }
}

impl<A: 'static> Decoder<A> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<A, String> + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// Attempt to decode `value`. Never panics; failure is the `Err` message.
    pub fn decode_any(&self, value: &Value) -> Result<A, String> {
        (self.run)(value)
    }

    pub fn map<B, F>(self, f: F) -> Decoder<B>
    where
        B: 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Decoder::from_fn(move |value| self.decode_any(value).map(&f))
    }

    /// Chain a decoder chosen from the first decoded value, run on the same input.
    pub fn and_then<B, F>(self, f: F) -> Decoder<B>
    where
        B: 'static,
        F: Fn(A) -> Decoder<B> + Send + Sync + 'static,
    {
        Decoder::from_fn(move |value| {
            let first = self.decode_any(value)?;
            f(first).decode_any(value)
        })
    }
}

/// Always yields `value`, whatever the input.
pub fn succeed<A>(value: A) -> Decoder<A>
where
    A: Clone + Send + Sync + 'static,
{
    Decoder::from_fn(move |_| Ok(value.clone()))
}

/// Always fails with `message`, whatever the input.
pub fn fail<A: 'static>(message: impl Into<String>) -> Decoder<A> {
    let message = message.into();
    Decoder::from_fn(move |_| Err(message.clone()))
}

/// Accepts any input and yields it unchanged.
pub fn value() -> Decoder<Value> {
    Decoder::from_fn(|value| Ok(value.clone()))
}

/// Structural decode through serde.
pub fn json<T>() -> Decoder<T>
where
    T: DeserializeOwned + 'static,
{
    Decoder::from_fn(|value| {
        T::deserialize(value).map_err(|e| format!("I expected {}: {e}", std::any::type_name::<T>()))
    })
}

pub fn string() -> Decoder<String> {
    Decoder::from_fn(|value| match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("I expected to find a string but instead found {other}")),
    })
}

/// Decode the member `name` of an object with `decoder`.
pub fn field<A: 'static>(name: impl Into<String>, decoder: Decoder<A>) -> Decoder<A> {
    let name = name.into();
    Decoder::from_fn(move |value| match value.get(&name) {
        Some(member) => decoder
            .decode_any(member)
            .map_err(|e| format!("I found the following problem decoding field '{name}': {e}")),
        None => Err(format!(
            "I expected to find an object with property '{name}' but instead found {value}"
        )),
    })
}
