//! Canonical JSON encoding
//!
//! Every signature in a link envelope is computed over these bytes, so the
//! encoding must have exactly one rendering per logical value:
//! - object keys sorted by their raw UTF-8 bytes
//! - no whitespace between tokens
//! - integers only, in plain decimal
//! - strings with a fixed escape set (`"`, `\`, control characters)

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalError;

/// Encode a value into its canonical byte form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

/// Decode canonical bytes.
///
/// Rejects input that parses as JSON but is not the unique canonical
/// rendering of its value (extra whitespace, unsorted or duplicate keys,
/// alternative escapes).
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CanonicalError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let mut reencoded = Vec::with_capacity(bytes.len());
    write_value(&value, &mut reencoded)?;
    if reencoded != bytes {
        return Err(CanonicalError::NotCanonical);
    }

    Ok(serde_json::from_value(value)?)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(CanonicalError::NonIntegerNumber(n.to_string()));
            }
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Sort explicitly; serde_json's map order depends on crate features.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(item, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    fn encode_str(value: &Value) -> String {
        String::from_utf8(encode(value).unwrap()).unwrap()
    }

    #[test]
    fn test_keys_sorted_and_compact() {
        let value = json!({"b": 1, "a": [true, null], "c": {"z": "x", "y": -2}});
        assert_eq!(
            encode_str(&value),
            r#"{"a":[true,null],"b":1,"c":{"y":-2,"z":"x"}}"#
        );
    }

    #[test]
    fn test_independent_of_insertion_order() {
        let mut first = HashMap::new();
        first.insert("zeta", 1);
        first.insert("alpha", 2);
        first.insert("mid", 3);

        let mut second = HashMap::new();
        second.insert("mid", 3);
        second.insert("alpha", 2);
        second.insert("zeta", 1);

        assert_eq!(encode(&first).unwrap(), encode(&second).unwrap());
    }

    #[test]
    fn test_keys_sorted_by_bytes() {
        // U+FF21 sorts before U+1F600 by UTF-8 bytes but after it by UTF-16 units.
        let value = json!({"\u{1F600}": 1, "\u{FF21}": 2, "Z": 3, "a": 4});
        assert_eq!(
            encode_str(&value),
            "{\"Z\":3,\"a\":4,\"\u{FF21}\":2,\"\u{1F600}\":1}"
        );
    }

    #[test]
    fn test_string_escapes() {
        let value = json!("quote\" back\\ nl\n cr\r tab\t bell\u{07} del\u{7f} é");
        assert_eq!(
            encode_str(&value),
            "\"quote\\\" back\\\\ nl\\n cr\\r tab\\t bell\\u0007 del\u{7f} é\""
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(encode_str(&json!(0)), "0");
        assert_eq!(encode_str(&json!(-17)), "-17");
        assert_eq!(encode_str(&json!(u64::MAX)), "18446744073709551615");
    }

    #[test]
    fn test_float_rejected() {
        let result = encode(&json!({"x": 1.5}));
        assert!(matches!(result, Err(CanonicalError::NonIntegerNumber(_))));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("src/main.rs".to_string(), vec!["a".to_string(), "b".to_string()]);

        let bytes = encode(&map).unwrap();
        let decoded: BTreeMap<String, Vec<String>> = decode(&bytes).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_decode_rejects_whitespace() {
        let result: Result<Value, _> = decode(br#"{"a": 1}"#);
        assert!(matches!(result, Err(CanonicalError::NotCanonical)));
    }

    #[test]
    fn test_decode_rejects_unsorted_keys() {
        let result: Result<Value, _> = decode(br#"{"b":1,"a":2}"#);
        assert!(matches!(result, Err(CanonicalError::NotCanonical)));
    }

    #[test]
    fn test_decode_rejects_alternative_escape() {
        let result: Result<Value, _> = decode(br#""\u0041""#);
        assert!(matches!(result, Err(CanonicalError::NotCanonical)));
    }

    #[test]
    fn test_decode_rejects_duplicate_keys() {
        let result: Result<Value, _> = decode(br#"{"a":1,"a":2}"#);
        assert!(matches!(result, Err(CanonicalError::NotCanonical)));
    }

    #[test]
    fn test_decode_invalid_json() {
        let result: Result<Value, _> = decode(b"{not json");
        assert!(matches!(result, Err(CanonicalError::Json(_))));
    }
}
