//! Response body parsing.
//!
//! The API sometimes returns two JSON objects glued together, for example
//! `{"error": ...}{"response": ...}`. The first object that carries either
//! envelope key decides the outcome; later objects are never inspected.

use serde_json::{Deserializer, Value};
use thiserror::Error;

use super::errors::ApiError;

/// Outcome of a single response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Error(ApiError),
}

/// The body held no `response` or `error` envelope.
#[derive(Debug, Error)]
#[error("malformed api response: {reason}")]
pub struct ProtocolError {
    pub reason: String,
    pub body: String,
}

/// Lazily yields consecutive JSON values from `body`, stopping silently at
/// the first fragment that does not parse.
pub fn json_iter_parse(body: &str) -> impl Iterator<Item = Value> + '_ {
    Deserializer::from_str(body)
        .into_iter::<Value>()
        .map_while(Result::ok)
}

/// Picks the authoritative envelope out of `body`.
pub fn classify(body: &str) -> Result<Envelope, ProtocolError> {
    let mut seen = 0usize;
    for value in json_iter_parse(body) {
        seen += 1;
        let Value::Object(mut object) = value else {
            continue;
        };
        if let Some(payload) = object.remove("response") {
            return Ok(Envelope::Success(payload));
        }
        if let Some(error) = object.remove("error") {
            return Ok(Envelope::Error(ApiError::from_value(error)));
        }
    }

    let reason = if seen == 0 {
        "no json object in body".to_string()
    } else {
        format!("none of {seen} json value(s) carry `response` or `error`")
    };
    Err(ProtocolError {
        reason,
        body: body.chars().take(256).collect(),
    })
}
