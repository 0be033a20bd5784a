//! Turns whatever a failed call produced into one line of text for the user.
//!
//! Error bodies from the API (and from anything in front of it) have no fixed
//! shape, so the message is found by searching the JSON tree for the first
//! string `message` field. When none exists, the HTTP status phrase is used.

use reqwest::StatusCode;
use serde_json::Value;

pub const UNKNOWN_ERROR: &str = "Unknown Error";
pub const GENERIC_ERROR: &str = "An unexpected error occurred. Please try again later.";

/// Nesting levels searched before giving up on a body.
pub const MAX_SEARCH_DEPTH: usize = 32;

/// A failure whose shape is known only loosely.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpFailure {
    /// An HTTP client error, possibly carrying the response status and body.
    Transport {
        status: Option<u16>,
        body: Option<Value>,
    },
    /// Any structured value, e.g. a parsed error payload.
    Structured(Value),
    /// A plain error or a primitive, with at most a message.
    Opaque { message: Option<String> },
}

impl HttpFailure {
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        HttpFailure::Opaque {
            message: Some(err.to_string()),
        }
    }
}

impl From<Value> for HttpFailure {
    fn from(value: Value) -> Self {
        HttpFailure::Structured(value)
    }
}

/// Never panics; always yields some text.
pub fn handle_http_error(err: &HttpFailure) -> String {
    match err {
        HttpFailure::Transport { status, body } => error_message(body.as_ref(), *status),
        HttpFailure::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
            let status = value
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok());
            let target = value.get("response").filter(|r| is_truthy(r)).unwrap_or(value);
            error_message(Some(target), status)
        }
        HttpFailure::Structured(_) => GENERIC_ERROR.to_string(),
        HttpFailure::Opaque { message } => handle_generic_error(message.as_deref()),
    }
}

pub fn handle_generic_error(message: Option<&str>) -> String {
    message
        .filter(|m| !m.is_empty())
        .unwrap_or(GENERIC_ERROR)
        .to_string()
}

fn error_message(body: Option<&Value>, status: Option<u16>) -> String {
    if let Some(message) = body.and_then(|b| find_message(b, 0)) {
        return message.to_string();
    }
    status
        .and_then(reason_phrase)
        .unwrap_or(UNKNOWN_ERROR)
        .to_string()
}

fn find_message(value: &Value, depth: usize) -> Option<&str> {
    if depth >= MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if let Some(Value::String(message)) = map.get("message") {
                return Some(message.as_str());
            }
            first_nested_message(map.values(), depth)
        }
        Value::Array(items) => first_nested_message(items.iter(), depth),
        _ => None,
    }
}

fn first_nested_message<'a>(
    children: impl Iterator<Item = &'a Value>,
    depth: usize,
) -> Option<&'a str> {
    children
        .filter(|child| child.is_object() || child.is_array())
        .find_map(|child| find_message(child, depth + 1).filter(|m| !m.is_empty()))
}

fn reason_phrase(status: u16) -> Option<&'static str> {
    StatusCode::from_u16(status).ok()?.canonical_reason()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
