//! Typed access to the open algorithm parameter map.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::error::{GenerationError, Result};

pub(super) struct ParamReader<'a> {
    algorithm: &'static str,
    params: &'a BTreeMap<String, f64>,
}

impl<'a> ParamReader<'a> {
    pub(super) const fn new(algorithm: &'static str, params: &'a BTreeMap<String, f64>) -> Self {
        Self { algorithm, params }
    }

    /// Read `name`, falling back to `default` when absent.
    pub(super) fn float(
        &self,
        name: &str,
        default: f64,
        range: RangeInclusive<f64>,
    ) -> Result<f64> {
        let Some(&value) = self.params.get(name) else {
            return Ok(default);
        };
        if !value.is_finite() || !range.contains(&value) {
            return Err(self.invalid(
                name,
                value,
                format!("expected a value in {}..={}", range.start(), range.end()),
            ));
        }
        Ok(value)
    }

    /// Read a whole-number parameter.
    pub(super) fn integer(
        &self,
        name: &str,
        default: u32,
        range: RangeInclusive<u32>,
    ) -> Result<u32> {
        let Some(&value) = self.params.get(name) else {
            return Ok(default);
        };
        let in_range = value.is_finite()
            && value.fract() == 0.0
            && value >= f64::from(*range.start())
            && value <= f64::from(*range.end());
        if !in_range {
            return Err(self.invalid(
                name,
                value,
                format!(
                    "expected a whole number in {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }
        Ok(value as u32)
    }

    /// Read a flag; any value >= 0.5 is true.
    pub(super) fn flag(&self, name: &str, default: bool) -> Result<bool> {
        let fallback = if default { 1.0 } else { 0.0 };
        Ok(self.float(name, fallback, 0.0..=1.0)? >= 0.5)
    }

    pub(super) fn invalid(&self, name: &str, value: f64, reason: String) -> GenerationError {
        GenerationError::InvalidParameter {
            algorithm: self.algorithm.to_string(),
            name: name.to_string(),
            value,
            reason,
        }
    }
}
