//! JSON serialization helpers

use crate::errors::{Result, StacGenError};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::Path;

/// Convert any serializable value into a JSON value.
///
/// Sets become arrays and structs become objects. Values serde cannot
/// represent in JSON (maps with non-string keys, failing `Serialize`
/// impls) are reported with the offending type's name.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|e| StacGenError::Serialization {
        type_name: short_type_name::<T>(),
        message: e.to_string(),
    })
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Write `value` as pretty-printed JSON, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serialize(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(&json)?;
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}
