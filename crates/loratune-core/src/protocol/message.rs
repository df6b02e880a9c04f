//! Wire message encoding/decoding
//!
//! Message format (one message per line, CRLF on the wire):
//! - `COMMAND` for a bare command
//! - `COMMAND;KEY=VALUE,KEY=VALUE,...` for a command with parameters
//!
//! Inbound values are numeric whenever they parse as a float, otherwise they
//! are kept as opaque text. Outbound integers are written exactly. No escaping is performed, so keys and values must
//! not contain `;`, `,` or `=`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DecodeError;

/// A parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer written by the host; never produced by [`decode`]
    Integer(i64),
    /// Anything that parses as a float
    Number(f64),
    /// Everything else, verbatim
    Text(String),
}

impl Value {
    /// Parse a raw wire value, preferring a number
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value. Text is parsed on demand so that
    /// `"-10"` and `-10.0` read the same.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view, truncating toward zero
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => self.as_f64().filter(|n| n.is_finite()).map(|n| n.trunc() as i64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A decoded (or to-be-encoded) protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Leading command token
    pub command: String,
    /// Parameters in wire order. Keys may repeat.
    pub params: Vec<(String, Value)>,
}

impl WireMessage {
    /// Create a message with no parameters
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Encode to a wire line (without terminator)
    pub fn encode(&self) -> String {
        encode(&self.command, &self.params)
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encode a command and its parameters to a wire line (without terminator)
pub fn encode<K: AsRef<str>>(command: &str, params: &[(K, Value)]) -> String {
    if params.is_empty() {
        return command.to_string();
    }

    let body = params
        .iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value))
        .collect::<Vec<_>>()
        .join(",");

    format!("{};{}", command, body)
}

/// Decode a single wire line.
///
/// A line without `;` is a bare command. A pair lacking `=` fails only this
/// line; the error still names the command it belonged to.
pub fn decode(line: &str) -> Result<WireMessage, DecodeError> {
    let Some((command, body)) = line.split_once(';') else {
        if line.is_empty() {
            return Err(DecodeError::MissingCommand);
        }
        return Ok(WireMessage::new(line));
    };

    if command.is_empty() {
        return Err(DecodeError::MissingCommand);
    }

    let mut message = WireMessage::new(command);
    if body.is_empty() {
        return Ok(message);
    }

    for pair in body.split(',') {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(DecodeError::MalformedPair {
                command: command.to_string(),
                pair: pair.to_string(),
            });
        };
        message.params.push((key.to_string(), Value::parse(raw)));
    }

    Ok(message)
}
