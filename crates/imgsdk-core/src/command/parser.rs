//! Dual-syntax parser for effect command specs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::types::EffectCommand;

/// Parse a caller-supplied command spec into an [`EffectCommand`].
///
/// A spec whose first non-whitespace character is `{` is treated as the JSON
/// object form; anything else is parsed as the pipe-delimited key/value
/// form. Both forms accreted in the wild and both remain accepted, so no
/// version flag exists.
pub fn parse(spec: &str) -> Result<EffectCommand> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::malformed("command", "empty command spec"));
    }

    if spec.starts_with('{') {
        parse_json(spec)
    } else {
        parse_pipe(spec)
    }
}

/// JSON object form: `{"effect":"Rotate","degree":90}`.
///
/// The `effect` field names the edit; every other numeric field becomes a
/// parameter. Non-numeric strings fail naming the field; values of other
/// shapes (bool, null, nested) are ignored as unknown keys.
fn parse_json(spec: &str) -> Result<EffectCommand> {
    let value: serde_json::Value = serde_json::from_str(spec)
        .map_err(|e| Error::malformed("command", format!("invalid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::malformed("command", "expected a JSON object"))?;

    let name = object
        .get("effect")
        .ok_or_else(|| Error::malformed("effect", "missing `effect` field"))?
        .as_str()
        .ok_or_else(|| Error::malformed("effect", "`effect` must be a string"))?
        .to_string();

    let mut params = BTreeMap::new();
    for (key, field) in object {
        if key == "effect" {
            continue;
        }
        match field {
            serde_json::Value::Number(n) => {
                let parsed = n
                    .as_f64()
                    .ok_or_else(|| Error::malformed(key, "value out of range"))?;
                params.insert(key.clone(), parsed);
            }
            serde_json::Value::String(s) => {
                params.insert(key.clone(), parse_number(s, key)?);
            }
            _ => {}
        }
    }

    EffectCommand::from_parts(name, params)
}

/// Pipe-delimited form: `cmd = zoom-in | value = 1.2`.
///
/// The `cmd` key names the edit; every other key is parsed as a numeric
/// parameter. Whitespace around keys, values and separators is tolerated.
fn parse_pipe(spec: &str) -> Result<EffectCommand> {
    let mut name = None;
    let mut params = BTreeMap::new();

    for segment in spec.split('|') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| Error::malformed("command", format!("expected `key = value`, got `{segment}`")))?;
        let key = key.trim();
        let value = value.trim();

        if key == "cmd" {
            if value.is_empty() {
                return Err(Error::malformed("cmd", "empty effect name"));
            }
            name = Some(value.to_string());
        } else {
            params.insert(key.to_string(), parse_number(value, key)?);
        }
    }

    let name = name.ok_or_else(|| Error::malformed("cmd", "missing effect name"))?;
    EffectCommand::from_parts(name, params)
}

/// Parse a numeric parameter value.
///
/// Tolerates surrounding whitespace and a trailing `f`/`F` unit suffix
/// (`"0.8f"` parses as `0.8`), which older callers emit.
fn parse_number(raw: &str, field: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_suffix(['f', 'F'])
        .map(str::trim_end)
        .unwrap_or(trimmed);

    let value: f64 = trimmed
        .parse()
        .map_err(|_| Error::malformed(field, format!("`{raw}` is not a number")))?;
    if !value.is_finite() {
        return Err(Error::malformed(field, format!("`{raw}` is out of range")));
    }
    Ok(value)
}
