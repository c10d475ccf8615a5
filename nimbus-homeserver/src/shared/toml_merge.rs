//!
//! Deep merge of two TOML documents.
//!
//! Tables are merged key by key, every other value of the overlay replaces the base value.
//! Arrays are replaced as a whole so a user can shrink a default list.
//!

use std::fmt;
use toml::map::Map;
use toml::Value;

/// The overlay tried to replace a value with one of a different type.
#[derive(Debug, PartialEq)]
pub struct MergeError {
    pub path: String,
    pub expected: &'static str,
    pub found: &'static str,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Incompatible types at path \"{}\", expected \"{}\" received \"{}\".",
            self.path, self.expected, self.found
        )
    }
}

impl std::error::Error for MergeError {}

/// Merge `overlay` on top of `base`.
pub fn merge(base: Value, overlay: Value) -> Result<Value, MergeError> {
    merge_at(base, overlay, "$")
}

fn merge_at(base: Value, overlay: Value, path: &str) -> Result<Value, MergeError> {
    match (base, overlay) {
        (Value::Table(mut existing), Value::Table(inner)) => {
            merge_tables(&mut existing, inner, path)?;
            Ok(Value::Table(existing))
        }
        (base, overlay) if base.same_type(&overlay) => Ok(overlay),
        (base, overlay) => Err(MergeError {
            path: path.to_owned(),
            expected: base.type_str(),
            found: overlay.type_str(),
        }),
    }
}

fn merge_tables(
    base: &mut Map<String, Value>,
    overlay: Map<String, Value>,
    path: &str,
) -> Result<(), MergeError> {
    for (name, inner) in overlay {
        let merged = match base.remove(&name) {
            Some(existing) => merge_at(existing, inner, &format!("{path}.{name}"))?,
            None => inner,
        };
        base.insert(name, merged);
    }
    Ok(())
}
