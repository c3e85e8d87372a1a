//! Deterministic JSON canonicalization for payload hashing.
//!
//! Cross-implementation agreement on payload hashes requires a single byte
//! encoding for structured data:
//!
//! - object keys sorted lexicographically at every nesting level
//! - arrays preserved in order
//! - no insignificant whitespace
//! - numbers emitted without a trailing zero fraction (`1.0` becomes `1`)
//! - timestamps are the caller's concern and should be RFC 3339 with a `Z`
//!   suffix ([`canonical_timestamp`])
//!
//! Canonicalization is idempotent: parsing the output and re-canonicalizing
//! yields the same bytes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::crypto::{hash, Hash};

/// Serialize a JSON value to its canonical string form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Hash a payload's canonical serialization with SHA3-256.
pub fn payload_hash(value: &Value) -> Hash {
    hash(canonical_json(value).as_bytes())
}

/// Format an instant the way canonical payloads carry timestamps:
/// RFC 3339, microsecond precision, `Z` suffix.
pub fn canonical_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key]);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(f) = n.as_f64() {
        // Collapse whole-valued floats so 100.0 and 100 hash identically.
        // 2^53 bounds the range where f64 represents integers exactly.
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&f.to_string());
        }
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json escaping is already minimal and stable.
    out.push_str(&serde_json::to_string(s).expect("string serialization cannot fail"));
}
