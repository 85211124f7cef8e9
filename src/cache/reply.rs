//! Decoding of raw Redis replies.

use redis::Value;

use crate::cache::CacheError;

pub(crate) fn is_nil(value: &Value) -> bool {
    matches!(value, Value::Nil)
}

/// Bulk or simple string; nil becomes `None`.
pub(crate) fn optional_string(op: &'static str, value: Value) -> Result<Option<String>, CacheError> {
    match value {
        Value::Nil => Ok(None),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| CacheError::unexpected(op, e.to_string())),
        Value::SimpleString(text) => Ok(Some(text)),
        Value::Okay => Ok(Some("OK".to_string())),
        Value::Int(n) => Ok(Some(n.to_string())),
        other => Err(CacheError::unexpected(op, format!("{other:?}"))),
    }
}

/// Array of strings; nil becomes an empty vector and nil elements are skipped.
pub(crate) fn strings(op: &'static str, value: Value) -> Result<Vec<String>, CacheError> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Array(items) | Value::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(text) = optional_string(op, item)? {
                    out.push(text);
                }
            }
            Ok(out)
        }
        single => Ok(optional_string(op, single)?.into_iter().collect()),
    }
}

pub(crate) fn integer(op: &'static str, value: Value) -> Result<i64, CacheError> {
    match value {
        Value::Int(n) => Ok(n),
        Value::Nil => Ok(0),
        Value::BulkString(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CacheError::unexpected(op, "non-numeric bulk string")),
        other => Err(CacheError::unexpected(op, format!("{other:?}"))),
    }
}

pub(crate) fn boolean(op: &'static str, value: Value) -> Result<bool, CacheError> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => integer(op, other).map(|n| n != 0),
    }
}

/// Plain acknowledgement such as the reply to `SET`.
pub(crate) fn ok(op: &'static str, value: Value) -> Result<(), CacheError> {
    match value {
        Value::Okay | Value::Nil => Ok(()),
        Value::SimpleString(text) if text.eq_ignore_ascii_case("OK") => Ok(()),
        other => Err(CacheError::unexpected(op, format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_string() {
        assert_eq!(optional_string("get", Value::Nil).unwrap(), None);
        assert_eq!(
            optional_string("get", Value::BulkString(b"v".to_vec())).unwrap(),
            Some("v".to_string())
        );
        assert!(optional_string("get", Value::Array(vec![])).is_err());
    }

    #[test]
    fn test_strings_skip_nil_elements() {
        let value = Value::Array(vec![
            Value::BulkString(b"a".to_vec()),
            Value::Nil,
            Value::BulkString(b"b".to_vec()),
        ]);
        assert_eq!(strings("lrange", value).unwrap(), vec!["a", "b"]);
        assert!(strings("lrange", Value::Nil).unwrap().is_empty());
    }

    #[test]
    fn test_integer_and_boolean() {
        assert_eq!(integer("incr", Value::Int(7)).unwrap(), 7);
        assert_eq!(integer("incr", Value::BulkString(b"12".to_vec())).unwrap(), 12);
        assert!(boolean("sismember", Value::Int(1)).unwrap());
        assert!(!boolean("sismember", Value::Int(0)).unwrap());
        assert!(integer("incr", Value::BulkString(b"x".to_vec())).is_err());
    }

    #[test]
    fn test_ok() {
        assert!(ok("set", Value::Okay).is_ok());
        assert!(ok("set", Value::SimpleString("OK".into())).is_ok());
        assert!(ok("set", Value::Int(1)).is_err());
    }
}
