//! Opt-in slow-path events, one JSON object per line on stderr.

use serde_json::{json, Map, Value};
use tvrt_contracts::TVRT_TRACE_SCHEMA_VERSION;

use crate::config::config;
use crate::error::RuntimeError;

pub fn enabled() -> bool {
    config().trace
}

pub fn event_line(event: &str, fields: Value) -> String {
    let mut obj = Map::new();
    obj.insert("schema_version".to_string(), json!(TVRT_TRACE_SCHEMA_VERSION));
    obj.insert("event".to_string(), json!(event));
    if let Value::Object(fields) = fields {
        obj.extend(fields);
    }
    Value::Object(obj).to_string()
}

fn error_line(err: &RuntimeError) -> String {
    event_line(
        "error",
        json!({
            "code": err.code(),
            "kind": err.kind.name(),
            "file": err.file,
            "line": err.line,
        }),
    )
}

fn array_grow_line(from: u64, to: u64, file: &str, line: u32) -> String {
    event_line(
        "array_grow",
        json!({ "from": from, "to": to, "file": file, "line": line }),
    )
}

pub(crate) fn error_raised(err: &RuntimeError) {
    if enabled() {
        eprintln!("{}", error_line(err));
    }
}

pub(crate) fn array_grown(from: u64, to: u64, file: &str, line: u32) {
    if enabled() {
        eprintln!("{}", array_grow_line(from, to, file, line));
    }
}
