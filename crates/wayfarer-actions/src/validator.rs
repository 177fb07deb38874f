use std::collections::BTreeMap;

use wayfarer_core::action::ParamValue;

use crate::errors::ActionRegistryError;
use crate::manifest::{ActionManifest, ParamType};

/// Validates `params` against `manifest`'s strict contract: every required
/// parameter must be present and type-correct, every supplied key must be
/// declared (unknown keys are rejected outright, not ignored), and enum
/// values must be one of the declared set. Collects every violation rather
/// than stopping at the first, so the model gets one actionable message back
/// instead of a retry loop one mistake at a time.
pub fn validate_params(manifest: &ActionManifest, params: &BTreeMap<String, ParamValue>) -> Result<(), ActionRegistryError> {
    let mut reasons = Vec::new();

    for key in params.keys() {
        if manifest.param(key).is_none() {
            reasons.push(format!("unknown parameter \"{key}\""));
        }
    }

    for spec in &manifest.params {
        match params.get(&spec.name) {
            Some(value) => {
                if let Err(reason) = check_type(&spec.ty, value) {
                    reasons.push(format!("parameter \"{}\": {reason}", spec.name));
                }
            }
            None if spec.required => {
                reasons.push(format!("missing required parameter \"{}\"", spec.name));
            }
            None => {}
        }
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ActionRegistryError::InvalidParams { action: manifest.name.clone(), reasons })
    }
}

fn check_type(ty: &ParamType, value: &ParamValue) -> Result<(), String> {
    match ty {
        ParamType::String => match value {
            ParamValue::String(_) => Ok(()),
            _ => Err("expected a string".into()),
        },
        ParamType::Integer => match value {
            ParamValue::Number(n) if n.fract() == 0.0 => Ok(()),
            ParamValue::Number(_) => Err("expected an integer, got a fractional number".into()),
            _ => Err("expected an integer".into()),
        },
        ParamType::Boolean => match value {
            ParamValue::Bool(_) => Ok(()),
            _ => Err("expected a boolean".into()),
        },
        ParamType::Enum { values } => match value {
            ParamValue::String(s) if values.iter().any(|v| v == s) => Ok(()),
            ParamValue::String(s) => Err(format!("\"{s}\" is not one of {values:?}")),
            _ => Err("expected a string enum value".into()),
        },
        ParamType::Array { item } => match value {
            ParamValue::Array(items) => {
                for (idx, entry) in items.iter().enumerate() {
                    check_type(item, entry).map_err(|e| format!("item {idx}: {e}"))?;
                }
                Ok(())
            }
            _ => Err("expected an array".into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ParamSpec;

    fn click_manifest() -> ActionManifest {
        ActionManifest::new(
            "click",
            "Click the element at the given index.",
            vec![ParamSpec::required("index", ParamType::Integer, "selector-map index")],
        )
    }

    #[test]
    fn rejects_unknown_keys() {
        let manifest = click_manifest();
        let mut params = BTreeMap::new();
        params.insert("element_index".to_string(), ParamValue::Number(3.0));
        let err = validate_params(&manifest, &params).unwrap_err();
        assert!(matches!(err, ActionRegistryError::InvalidParams { .. }));
    }

    #[test]
    fn requires_declared_params() {
        let manifest = click_manifest();
        let params = BTreeMap::new();
        assert!(validate_params(&manifest, &params).is_err());
    }

    #[test]
    fn accepts_well_formed_params() {
        let manifest = click_manifest();
        let mut params = BTreeMap::new();
        params.insert("index".to_string(), ParamValue::Number(3.0));
        assert!(validate_params(&manifest, &params).is_ok());
    }
}
