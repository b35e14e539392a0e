// transcript-embed - Type conversion between Rust and TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Conversions between Rust types and TranScript values.

use transcript_core::{Error, Payload, Result, Value};

/// Convert a TranScript value into a Rust type.
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Result<Self>;
}

/// Convert a Rust type into a TranScript value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl FromValue for i64 {
    fn from_value(v: &Value) -> Result<i64> {
        v.to_int()
    }
}

impl FromValue for f64 {
    fn from_value(v: &Value) -> Result<f64> {
        match v.payload() {
            Payload::Int(i) => Ok(*i as f64),
            Payload::Float(f) => Ok(*f),
            _ => Err(Error::wrong_type(v)),
        }
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Result<String> {
        Ok(v.to_str()?.to_string())
    }
}

impl FromValue for bool {
    fn from_value(v: &Value) -> Result<bool> {
        Ok(!v.is_false())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(v: &Value) -> Result<Vec<u8>> {
        Ok(v.to_buffer()?.clone())
    }
}

impl FromValue for Value {
    fn from_value(v: &Value) -> Result<Value> {
        Ok(v.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: &Value) -> Result<Vec<T>> {
        let items = v.to_array()?;
        items.iter().map(T::from_value).collect()
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::int(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::float(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::str(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::str(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::bool_of(self)
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::buffer(self)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::nil()
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

/// Convenience free function: Rust value to TranScript.
pub fn to_value(v: impl IntoValue) -> Value {
    v.into_value()
}

/// Convenience free function: TranScript value to Rust.
pub fn from_value<T: FromValue>(v: &Value) -> Result<T> {
    T::from_value(v)
}
