//! @ai:module:intent Hyperparameter values and definitions
//! @ai:module:layer domain
//! @ai:module:public_api ParamValue, Param, ParamKind, ParamConfig
//! @ai:module:stateless true

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// @ai:intent A concrete hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Lgl(bool),
    Int(i64),
    Dbl(f64),
    Fct(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Lgl(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Dbl(v) => write!(f, "{}", v),
            ParamValue::Fct(v) => write!(f, "{}", v),
        }
    }
}

/// A full or partial assignment of parameter ids to values.
pub type ParamConfig = BTreeMap<String, ParamValue>;

/// @ai:intent Format a configuration as `a=1, b=x` for logs and reports
/// @ai:effects pure
pub fn format_config(config: &ParamConfig) -> String {
    config
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// @ai:intent Domain of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamKind {
    Int { lower: i64, upper: i64 },
    Dbl { lower: f64, upper: f64 },
    Fct { levels: Vec<String> },
    Lgl,
}

/// @ai:intent A named hyperparameter with its domain and default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub id: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    #[serde(default)]
    pub default: Option<ParamValue>,
    /// Search on a logarithmic scale (numeric params with positive bounds)
    #[serde(default)]
    pub logscale: bool,
}

impl Param {
    pub fn int(id: &str, lower: i64, upper: i64) -> Self {
        Self::with_kind(id, ParamKind::Int { lower, upper })
    }

    pub fn dbl(id: &str, lower: f64, upper: f64) -> Self {
        Self::with_kind(id, ParamKind::Dbl { lower, upper })
    }

    pub fn fct(id: &str, levels: &[&str]) -> Self {
        Self::with_kind(
            id,
            ParamKind::Fct {
                levels: levels.iter().map(|l| l.to_string()).collect(),
            },
        )
    }

    pub fn lgl(id: &str) -> Self {
        Self::with_kind(id, ParamKind::Lgl)
    }

    fn with_kind(id: &str, kind: ParamKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            default: None,
            logscale: false,
        }
    }

    /// @ai:intent Attach a default value
    /// @ai:effects pure
    pub fn default_value(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn log(mut self) -> Self {
        self.logscale = true;
        self
    }

    /// @ai:intent Validate a value and coerce it into the param's type
    /// @ai:effects pure
    pub fn check(&self, value: &ParamValue) -> Result<ParamValue> {
        match (&self.kind, value) {
            (ParamKind::Int { lower, upper }, ParamValue::Int(v)) => {
                if v < lower || v > upper {
                    return Err(self.out_of_bounds(value, *lower as f64, *upper as f64));
                }
                Ok(ParamValue::Int(*v))
            }
            (ParamKind::Int { .. }, ParamValue::Dbl(v)) if v.fract() == 0.0 && v.is_finite() => {
                self.check(&ParamValue::Int(*v as i64))
            }
            (ParamKind::Dbl { lower, upper }, ParamValue::Dbl(v)) => {
                if v.is_nan() || v < lower || v > upper {
                    return Err(self.out_of_bounds(value, *lower, *upper));
                }
                Ok(ParamValue::Dbl(*v))
            }
            (ParamKind::Dbl { .. }, ParamValue::Int(v)) => self.check(&ParamValue::Dbl(*v as f64)),
            (ParamKind::Fct { levels }, ParamValue::Fct(v)) => {
                if !levels.contains(v) {
                    return Err(Error::invalid_param(
                        &self.id,
                        format!("'{}' is not one of {:?}", v, levels),
                    ));
                }
                Ok(ParamValue::Fct(v.clone()))
            }
            (ParamKind::Lgl, ParamValue::Lgl(v)) => Ok(ParamValue::Lgl(*v)),
            (kind, value) => Err(Error::invalid_param(
                &self.id,
                format!("value {} does not fit domain {:?}", value, kind),
            )),
        }
    }

    /// @ai:intent Reject empty or malformed domains before they are searched
    /// @ai:effects pure
    pub fn validate_domain(&self) -> Result<()> {
        let ordered = match &self.kind {
            ParamKind::Int { lower, upper } => lower <= upper,
            ParamKind::Dbl { lower, upper } => lower <= upper,
            ParamKind::Fct { levels } => {
                if levels.is_empty() {
                    return Err(Error::invalid_param(&self.id, "factor without levels"));
                }
                true
            }
            ParamKind::Lgl => true,
        };
        if !ordered {
            return Err(Error::invalid_param(
                &self.id,
                "lower bound must not exceed upper bound",
            ));
        }
        Ok(())
    }

    fn out_of_bounds(&self, value: &ParamValue, lower: f64, upper: f64) -> Error {
        Error::invalid_param(
            &self.id,
            format!("{} is outside [{}, {}]", value, lower, upper),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_coerces_numeric_types() {
        let k = Param::int("k", 1, 50);
        assert_eq!(k.check(&ParamValue::Dbl(3.0)).unwrap(), ParamValue::Int(3));
        assert!(k.check(&ParamValue::Dbl(3.5)).is_err());

        let p = Param::dbl("distance", 0.0, 10.0);
        assert_eq!(p.check(&ParamValue::Int(2)).unwrap(), ParamValue::Dbl(2.0));
    }

    #[test]
    fn test_check_rejects_out_of_domain() {
        assert!(Param::int("k", 1, 50).check(&ParamValue::Int(0)).is_err());
        assert!(Param::fct("kernel", &["rectangular"])
            .check(&ParamValue::Fct("gaussian".to_string()))
            .is_err());
        assert!(Param::lgl("scale").check(&ParamValue::Int(1)).is_err());
    }

    #[test]
    fn test_validate_domain_rejects_inverted_bounds() {
        assert!(Param::int("k", 1, 9).validate_domain().is_ok());
        assert!(Param::int("k", 9, 1).validate_domain().is_err());
        assert!(Param::dbl("distance", 3.0, 1.0).validate_domain().is_err());
        assert!(Param::dbl("distance", f64::NAN, 1.0).validate_domain().is_err());
        assert!(Param::fct("kernel", &[]).validate_domain().is_err());
    }

    #[test]
    fn test_param_deserializes_from_toml() {
        let param: Param = toml::from_str(
            r#"
id = "cost"
type = "dbl"
lower = 0.001
upper = 10.0
logscale = true
"#,
        )
        .unwrap();
        assert!(param.logscale);
        assert_eq!(param.kind, ParamKind::Dbl { lower: 0.001, upper: 10.0 });
    }

    #[test]
    fn test_format_config() {
        let mut config = ParamConfig::new();
        config.insert("k".to_string(), ParamValue::Int(5));
        config.insert("kernel".to_string(), ParamValue::Fct("inverse".to_string()));
        assert_eq!(format_config(&config), "k=5, kernel=inverse");
    }
}
