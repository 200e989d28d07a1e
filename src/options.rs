//! Evaluation options

use crate::types::EvalError;

/// Outputs requested from a column evaluation.
///
/// The defaults match what most callers want from a quadrature pass: values
/// and gradients on, Hessians off.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EvalOptions {
    /// Compute basis function values
    pub value: bool,
    /// Compute basis function gradients
    pub gradient: bool,
    /// Compute basis function Hessians
    pub hessian: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            value: true,
            gradient: true,
            hessian: false,
        }
    }
}

impl EvalOptions {
    /// Build options from a list of `(key, enabled)` flags.
    ///
    /// Recognized keys are `"value"`, `"gradient"` and `"hessian"`; keys not
    /// present keep their default. An unrecognized key is a configuration
    /// error and no options are returned.
    pub fn from_flags(flags: &[(&str, bool)]) -> Result<Self, EvalError> {
        let mut options = Self::default();
        for (key, enabled) in flags {
            match *key {
                "value" => options.value = *enabled,
                "gradient" => options.gradient = *enabled,
                "hessian" => options.hessian = *enabled,
                _ => return Err(EvalError::UnknownOption((*key).to_string())),
            }
        }
        Ok(options)
    }
}
