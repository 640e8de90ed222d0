//! Types for effect commands.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Canonical, validated description of one edit, keyed by effect.
///
/// This is the single internal representation both front-end syntaxes feed;
/// execution logic never sees the surface syntax a command arrived in.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "effect")]
pub enum Effect {
    /// Pass the image through unchanged.
    Normal,
    /// Discard accumulated edits and restore the input image.
    Reset,
    /// Rotate by `degree` degrees.
    Rotate { degree: f64 },
    /// Magnify by `factor` (> 1 enlarges).
    ZoomIn { factor: f64 },
    /// Shrink by `factor` (< 1 shrinks).
    ZoomOut { factor: f64 },
    /// Crop the rectangle at (`x`, `y`) with the given dimensions.
    Clip { x: f64, y: f64, width: f64, height: f64 },
}

impl Effect {
    /// Resolve an effect name plus parameter map into a validated variant.
    ///
    /// Matching is case-insensitive and tolerant of `-`/`_` separators, so
    /// the JSON form's `"ZoomIn"` and the pipe form's `"zoom-in"` resolve to
    /// the same variant. Unknown names are rejected; unknown parameter keys
    /// are ignored.
    pub fn resolve(name: &str, params: &BTreeMap<String, f64>) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "normal" => Ok(Self::Normal),
            "reset" => Ok(Self::Reset),
            "rotate" => Ok(Self::Rotate {
                degree: require(params, "degree", name)?,
            }),
            "zoomin" => Ok(Self::ZoomIn {
                factor: require_positive(params, "value", name)?,
            }),
            "zoomout" => Ok(Self::ZoomOut {
                factor: require_positive(params, "value", name)?,
            }),
            "clip" => {
                let x = require(params, "x", name)?;
                let y = require(params, "y", name)?;
                let width = require_positive(params, "width", name)?;
                let height = require_positive(params, "height", name)?;
                Ok(Self::Clip { x, y, width, height })
            }
            _ => Err(Error::malformed(
                "effect",
                format!("unknown effect `{name}`"),
            )),
        }
    }
}

fn require(params: &BTreeMap<String, f64>, key: &str, effect: &str) -> Result<f64> {
    match params.get(key) {
        Some(value) if value.is_finite() => Ok(*value),
        Some(value) => Err(Error::malformed(
            key,
            format!("value {value} is out of range for effect `{effect}`"),
        )),
        None => Err(Error::malformed(
            key,
            format!("required parameter missing for effect `{effect}`"),
        )),
    }
}

fn require_positive(params: &BTreeMap<String, f64>, key: &str, effect: &str) -> Result<f64> {
    let value = require(params, key, effect)?;
    if value <= 0.0 {
        return Err(Error::malformed(
            key,
            format!("value {value} must be positive for effect `{effect}`"),
        ));
    }
    Ok(value)
}

/// An immutable, parsed edit request.
///
/// Owned by the accepting session until consumed by execution; execution
/// snapshots a clone, so a command in flight is never mutated.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EffectCommand {
    /// Effect identifier exactly as the caller supplied it.
    name: String,
    /// Numeric parameters by name.
    params: BTreeMap<String, f64>,
    /// Validated canonical variant.
    #[serde(flatten)]
    effect: Effect,
}

impl EffectCommand {
    /// Assemble a command from parsed parts, validating the effect.
    pub(crate) fn from_parts(name: String, params: BTreeMap<String, f64>) -> Result<Self> {
        let effect = Effect::resolve(&name, &params)?;
        Ok(Self { name, params, effect })
    }

    /// The effect identifier as supplied by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric parameters by name.
    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }

    /// The validated effect variant.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

impl std::fmt::Display for EffectCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.params {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn resolve_is_case_and_separator_insensitive() {
        let p = params(&[("value", 1.2)]);
        assert_eq!(
            Effect::resolve("ZoomIn", &p).unwrap(),
            Effect::ZoomIn { factor: 1.2 }
        );
        assert_eq!(
            Effect::resolve("zoom-in", &p).unwrap(),
            Effect::ZoomIn { factor: 1.2 }
        );
        assert_eq!(
            Effect::resolve("zoom_in", &p).unwrap(),
            Effect::ZoomIn { factor: 1.2 }
        );
    }

    #[test]
    fn unknown_effect_is_rejected() {
        let err = Effect::resolve("Sharpen", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }));
    }

    #[test]
    fn missing_parameter_names_the_field() {
        let err = Effect::resolve("Rotate", &BTreeMap::new()).unwrap_err();
        match err {
            Error::MalformedCommand { field, .. } => assert_eq!(field, "degree"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_parameter_is_rejected() {
        let p = params(&[("degree", f64::NAN)]);
        assert!(Effect::resolve("Rotate", &p).is_err());
    }

    #[test]
    fn zoom_factor_must_be_positive() {
        let p = params(&[("value", -0.5)]);
        let err = Effect::resolve("zoom-out", &p).unwrap_err();
        match err {
            Error::MalformedCommand { field, .. } => assert_eq!(field, "value"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clip_requires_all_four_parameters() {
        let p = params(&[("x", 0.0), ("y", 0.0), ("width", 10.0)]);
        let err = Effect::resolve("Clip", &p).unwrap_err();
        match err {
            Error::MalformedCommand { field, .. } => assert_eq!(field, "height"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = params(&[("degree", 90.0), ("quality", 3.0)]);
        assert_eq!(
            Effect::resolve("Rotate", &p).unwrap(),
            Effect::Rotate { degree: 90.0 }
        );
    }
}
