//! JSON rendering of a diff context.

use super::timestamp;
use crate::domain::DiffContext;
use anyhow::Result;
use serde_json::Value;

/// Pretty JSON with a trailing newline. `generated_at` is added on request.
pub fn render_json(context: &DiffContext, include_timestamp: bool) -> Result<String> {
    let mut value = serde_json::to_value(context)?;
    if include_timestamp {
        if let Value::Object(map) = &mut value {
            map.insert("generated_at".to_string(), Value::String(timestamp()));
        }
    }
    Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
}
