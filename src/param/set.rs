//! @ai:module:intent Parameter sets with validated values and search designs
//! @ai:module:layer domain
//! @ai:module:public_api ParamSet
//! @ai:module:stateless false

use crate::error::{Error, Result};
use crate::param::value::{Param, ParamConfig, ParamKind, ParamValue};
use rand::prelude::*;

/// @ai:intent Ordered parameter definitions plus currently set values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    params: Vec<Param>,
    values: ParamConfig,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Build a set from definitions without values
    /// @ai:effects pure
    pub fn from_params(params: Vec<Param>) -> Self {
        Self {
            params,
            values: ParamConfig::new(),
        }
    }

    /// @ai:intent Builder-style add
    /// @ai:effects pure
    pub fn with(mut self, param: Param) -> Self {
        self.add(param);
        self
    }

    /// @ai:intent Add or replace a parameter definition
    /// @ai:effects state:write
    pub fn add(&mut self, param: Param) {
        self.values.remove(&param.id);
        match self.params.iter_mut().find(|p| p.id == param.id) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    /// @ai:intent Check every definition can be searched
    /// @ai:effects pure
    pub fn validate(&self) -> Result<()> {
        self.params.iter().try_for_each(Param::validate_domain)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn ids(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn param(&self, id: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.id == id)
    }

    /// Explicitly set values, without defaults.
    pub fn values(&self) -> &ParamConfig {
        &self.values
    }

    /// @ai:intent Set a single value after validating it against the domain
    /// @ai:effects state:write
    pub fn set(&mut self, id: &str, value: ParamValue) -> Result<()> {
        let param = self
            .param(id)
            .ok_or_else(|| Error::invalid_param(id, "unknown parameter"))?;
        let value = param.check(&value)?;
        self.values.insert(id.to_string(), value);
        Ok(())
    }

    /// @ai:intent Set many values; nothing changes if any value is invalid
    /// @ai:effects state:write
    pub fn set_values(&mut self, values: &ParamConfig) -> Result<()> {
        let mut updated = self.clone();
        for (id, value) in values {
            updated.set(id, value.clone())?;
        }
        *self = updated;
        Ok(())
    }

    /// @ai:intent Current value of a parameter, falling back to its default
    /// @ai:effects pure
    pub fn get(&self, id: &str) -> Option<ParamValue> {
        self.values
            .get(id)
            .cloned()
            .or_else(|| self.param(id).and_then(|p| p.default.clone()))
    }

    fn require(&self, id: &str) -> Result<ParamValue> {
        self.get(id)
            .ok_or_else(|| Error::invalid_param(id, "no value and no default"))
    }

    pub fn get_int(&self, id: &str) -> Result<i64> {
        match self.require(id)? {
            ParamValue::Int(v) => Ok(v),
            other => Err(Error::invalid_param(id, format!("expected integer, got {}", other))),
        }
    }

    pub fn get_dbl(&self, id: &str) -> Result<f64> {
        match self.require(id)? {
            ParamValue::Dbl(v) => Ok(v),
            ParamValue::Int(v) => Ok(v as f64),
            other => Err(Error::invalid_param(id, format!("expected number, got {}", other))),
        }
    }

    pub fn get_fct(&self, id: &str) -> Result<String> {
        match self.require(id)? {
            ParamValue::Fct(v) => Ok(v),
            other => Err(Error::invalid_param(id, format!("expected factor, got {}", other))),
        }
    }

    pub fn get_lgl(&self, id: &str) -> Result<bool> {
        match self.require(id)? {
            ParamValue::Lgl(v) => Ok(v),
            other => Err(Error::invalid_param(id, format!("expected logical, got {}", other))),
        }
    }

    /// @ai:intent Candidate values of one parameter for a grid of the given resolution
    /// @ai:pre resolution >= 1; numeric bounds finite, positive when on log scale
    /// @ai:effects pure
    fn grid_values(param: &Param, resolution: usize) -> Result<Vec<ParamValue>> {
        param.validate_domain()?;
        let spaced = |lower: f64, upper: f64| -> Result<Vec<f64>> {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(Error::invalid_param(&param.id, "grid needs finite bounds"));
            }
            if param.logscale && lower <= 0.0 {
                return Err(Error::invalid_param(&param.id, "log scale needs positive bounds"));
            }
            let (lo, hi) = if param.logscale {
                (lower.ln(), upper.ln())
            } else {
                (lower, upper)
            };
            let points = (0..resolution)
                .map(|i| {
                    let t = if resolution == 1 {
                        0.0
                    } else {
                        i as f64 / (resolution - 1) as f64
                    };
                    let v = lo + t * (hi - lo);
                    if param.logscale {
                        v.exp()
                    } else {
                        v
                    }
                })
                .collect();
            Ok(points)
        };

        let values = match &param.kind {
            ParamKind::Int { lower, upper } => {
                let mut ints: Vec<i64> = spaced(*lower as f64, *upper as f64)?
                    .into_iter()
                    .map(|v| (v.round() as i64).clamp(*lower, *upper))
                    .collect();
                ints.dedup();
                ints.into_iter().map(ParamValue::Int).collect()
            }
            ParamKind::Dbl { lower, upper } => spaced(*lower, *upper)?
                .into_iter()
                .map(|v| ParamValue::Dbl(v.clamp(*lower, *upper)))
                .collect(),
            ParamKind::Fct { levels } => levels.iter().cloned().map(ParamValue::Fct).collect(),
            ParamKind::Lgl => vec![ParamValue::Lgl(false), ParamValue::Lgl(true)],
        };
        Ok(values)
    }

    /// @ai:intent Full Cartesian grid over all parameters, first parameter varying slowest
    /// @ai:pre resolution >= 1
    /// @ai:effects pure
    pub fn grid_design(&self, resolution: usize) -> Result<Vec<ParamConfig>> {
        if resolution == 0 {
            return Err(Error::Tuning("grid resolution must be at least 1".to_string()));
        }

        let mut design = vec![ParamConfig::new()];
        for param in &self.params {
            let values = Self::grid_values(param, resolution)?;
            let mut next = Vec::with_capacity(design.len() * values.len());
            for partial in &design {
                for value in &values {
                    let mut config = partial.clone();
                    config.insert(param.id.clone(), value.clone());
                    next.push(config);
                }
            }
            design = next;
        }

        if self.params.is_empty() {
            return Ok(Vec::new());
        }
        Ok(design)
    }

    /// @ai:intent Draw `n` configurations uniformly (log-uniform where flagged)
    /// @ai:effects pure
    pub fn random_design(&self, n: usize, rng: &mut StdRng) -> Result<Vec<ParamConfig>> {
        (0..n)
            .map(|_| {
                self.params
                    .iter()
                    .map(|param| Ok((param.id.clone(), Self::sample(param, rng)?)))
                    .collect::<Result<ParamConfig>>()
            })
            .collect()
    }

    fn sample(param: &Param, rng: &mut StdRng) -> Result<ParamValue> {
        param.validate_domain()?;
        let uniform = |rng: &mut StdRng, lower: f64, upper: f64| -> Result<f64> {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(Error::invalid_param(&param.id, "sampling needs finite bounds"));
            }
            if param.logscale {
                if lower <= 0.0 {
                    return Err(Error::invalid_param(&param.id, "log scale needs positive bounds"));
                }
                Ok((lower.ln() + rng.gen::<f64>() * (upper.ln() - lower.ln())).exp())
            } else {
                Ok(lower + rng.gen::<f64>() * (upper - lower))
            }
        };

        let value = match &param.kind {
            ParamKind::Int { lower, upper } => {
                if param.logscale {
                    let v = uniform(rng, *lower as f64, *upper as f64)?;
                    ParamValue::Int((v.round() as i64).clamp(*lower, *upper))
                } else {
                    ParamValue::Int(rng.gen_range(*lower..=*upper))
                }
            }
            ParamKind::Dbl { lower, upper } => {
                ParamValue::Dbl(uniform(rng, *lower, *upper)?.clamp(*lower, *upper))
            }
            ParamKind::Fct { levels } => match levels.choose(rng) {
                Some(level) => ParamValue::Fct(level.clone()),
                None => return Err(Error::invalid_param(&param.id, "factor without levels")),
            },
            ParamKind::Lgl => ParamValue::Lgl(rng.gen_bool(0.5)),
        };
        Ok(value)
    }
}
