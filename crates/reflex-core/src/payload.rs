//! Dynamically typed payloads exchanged between sources, scripts and actions.
//!
//! The shape of a payload is only known to the module or script that reads
//! it, so payloads stay as JSON objects at the boundary. Reads go through
//! [`PayloadExt`], which reports a typed [`PayloadError`] on a missing key or
//! a type mismatch instead of defaulting.

use serde_json::{Map, Value};
use thiserror::Error;

/// Key/value data carried by events and produced by actions.
pub type Payload = Map<String, Value>;

/// Failure to read a typed field from a [`Payload`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Missing payload field: {0}")]
    Missing(String),
    #[error("Payload field '{key}' is not a {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// Typed accessors over a [`Payload`].
pub trait PayloadExt {
    fn require(&self, key: &str) -> Result<&Value, PayloadError>;
    fn get_str(&self, key: &str) -> Result<&str, PayloadError>;
    fn get_i64(&self, key: &str) -> Result<i64, PayloadError>;
    fn get_f64(&self, key: &str) -> Result<f64, PayloadError>;
    fn get_bool(&self, key: &str) -> Result<bool, PayloadError>;
    fn get_object(&self, key: &str) -> Result<&Payload, PayloadError>;
    fn get_array(&self, key: &str) -> Result<&Vec<Value>, PayloadError>;
}

impl PayloadExt for Payload {
    fn require(&self, key: &str) -> Result<&Value, PayloadError> {
        self.get(key)
            .ok_or_else(|| PayloadError::Missing(key.to_string()))
    }

    fn get_str(&self, key: &str) -> Result<&str, PayloadError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| wrong_type(key, "string"))
    }

    fn get_i64(&self, key: &str) -> Result<i64, PayloadError> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| wrong_type(key, "integer"))
    }

    fn get_f64(&self, key: &str) -> Result<f64, PayloadError> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| wrong_type(key, "number"))
    }

    fn get_bool(&self, key: &str) -> Result<bool, PayloadError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| wrong_type(key, "boolean"))
    }

    fn get_object(&self, key: &str) -> Result<&Payload, PayloadError> {
        self.require(key)?
            .as_object()
            .ok_or_else(|| wrong_type(key, "object"))
    }

    fn get_array(&self, key: &str) -> Result<&Vec<Value>, PayloadError> {
        self.require(key)?
            .as_array()
            .ok_or_else(|| wrong_type(key, "array"))
    }
}

fn wrong_type(key: &str, expected: &'static str) -> PayloadError {
    PayloadError::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// Build a [`Payload`] from a JSON value, rejecting anything but an object.
pub fn payload_from_value(value: Value) -> Result<Payload, PayloadError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(wrong_type("<root>", "object")),
    }
}
