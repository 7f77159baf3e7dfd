//! Payload shapes used for persistence and for the context channel.
//!
//! A [`Payload`] is a flat mapping, e.g. `{"count": 12}`. An
//! [`ApplicationContext`] is what travels between the two devices: a mapping
//! from a wire key to a payload, e.g. `{"clicker": {"count": 12}}`. Unknown
//! keys are ignored on both levels.

use serde_json::{Map, Value};

use crate::DecodeError;

/// Flat key/value mapping for one entity.
pub type Payload = Map<String, Value>;

/// Mapping of wire key to payload, exchanged with the peer.
pub type ApplicationContext = Map<String, Value>;

/// Wrap a payload under `key`, producing a one-entry application context.
pub fn wrap_context(key: &str, payload: Payload) -> ApplicationContext {
    let mut context = ApplicationContext::new();
    context.insert(key.to_string(), Value::Object(payload));
    context
}

/// Look up the payload stored under `key`.
///
/// Returns `None` if the key is absent, so unrelated messages sharing the
/// channel can be skipped. A present key whose value is not an object is a
/// [`DecodeError::NotAnObject`].
pub fn context_entry<'a>(
    context: &'a ApplicationContext,
    key: &str,
) -> Option<Result<&'a Payload, DecodeError>> {
    context
        .get(key)
        .map(|value| value.as_object().ok_or(DecodeError::NotAnObject))
}
