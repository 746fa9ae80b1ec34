//! Redaction of secrets in logged call arguments.
//!
//! Invoke and send arguments are logged at debug; session initialization
//! carries the model API key, so every logged argument passes through here.

use serde_json::Value;

/// Field names whose values are always masked.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "api-key",
    "authorization",
    "credential",
    "private_key",
    "privatekey",
    "access_key",
    "accesskey",
];

pub const REDACTED_VALUE: &str = "[REDACTED]";

pub fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|f| lower.contains(f))
}

/// A secret recognized by its prefix and a minimum body length.
struct KeyShape {
    prefix: &'static str,
    min_len: usize,
}

static KEY_SHAPES: &[KeyShape] = &[
    KeyShape { prefix: "sk-", min_len: 20 },
    KeyShape { prefix: "anthropic-", min_len: 20 },
    KeyShape { prefix: "AIza", min_len: 30 },
    KeyShape { prefix: "ghp_", min_len: 22 },
    KeyShape { prefix: "gho_", min_len: 22 },
    KeyShape { prefix: "github_pat_", min_len: 22 },
];

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Earliest key prefix in `s`.
fn next_key(s: &str) -> Option<(usize, &'static KeyShape)> {
    KEY_SHAPES
        .iter()
        .filter_map(|shape| s.find(shape.prefix).map(|at| (at, shape)))
        .min_by_key(|(at, _)| *at)
}

/// Mask known key/token shapes inside free text, in a single left-to-right pass.
pub fn redact(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some((start, shape)) = next_key(rest) {
        let body_start = start + shape.prefix.len();
        let body = &rest[body_start..];
        let body_len = body.find(|c: char| !is_key_char(c)).unwrap_or(body.len());
        let end = body_start + body_len;

        out.push_str(&rest[..start]);
        if body_len >= shape.min_len {
            out.push_str(REDACTED_VALUE);
        } else {
            out.push_str(&rest[start..end]);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Redact a JSON value: strings are scanned, sensitive object fields masked.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if is_sensitive_field(k) {
                        Value::String(REDACTED_VALUE.to_string())
                    } else {
                        redact_value(v)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render call arguments for a log line.
pub fn redact_args(args: &[Value]) -> String {
    let masked: Vec<Value> = args.iter().map(redact_value).collect();
    Value::Array(masked).to_string()
}
