//! Validated model configuration.
//!
//! Settings arrive loosely typed (TOML, JSON or CLI flags) and are checked in
//! one place, [`ModelConfig::from_values`], which reports every violation at
//! once instead of stopping at the first.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Short model names accepted in settings, mapped to provider model ids.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("2.5_flash", "gemini-2.5-flash-preview-05-20"),
    ("test", "gemini-2.0-flash"),
    ("fast_test", "gemini-2.0-flash-lite"),
];

pub const DEFAULT_MODEL: &str = "fast_test";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Map an alias to its provider model id; unknown names are returned as-is.
pub fn resolve_model_alias(name: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, id)| *id)
        .unwrap_or(name)
}

/// A single reason why settings were rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigViolation {
    MissingModelName,
    ModelNameNotString { found: String },
    EmptyModelName,
    MissingTemperature,
    TemperatureNotNumeric { found: String },
    TemperatureNotFinite,
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigViolation::MissingModelName => write!(f, "`model_name` is missing"),
            ConfigViolation::ModelNameNotString { found } => {
                write!(f, "`model_name` must be a string, found {}", found)
            }
            ConfigViolation::EmptyModelName => write!(f, "`model_name` must not be empty"),
            ConfigViolation::MissingTemperature => write!(f, "`temperature` is missing"),
            ConfigViolation::TemperatureNotNumeric { found } => {
                write!(f, "`temperature` must be a number, found {}", found)
            }
            ConfigViolation::TemperatureNotFinite => write!(f, "`temperature` must be finite"),
        }
    }
}

/// Settings failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration: {}", join_violations(.violations))]
pub struct ConfigError {
    pub violations: Vec<ConfigViolation>,
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "table".to_string(),
    }
}

/// A settings value before validation.
///
/// Floats are kept out of [`Value`], which cannot hold NaN or infinity, so a
/// non-finite temperature is reported as such instead of as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Float(f64),
    Other(Value),
}

impl SettingValue {
    fn describe(&self) -> String {
        match self {
            SettingValue::Float(t) => format!("number {t}"),
            SettingValue::Other(v) => describe(v),
        }
    }
}

impl From<Value> for SettingValue {
    fn from(value: Value) -> Self {
        SettingValue::Other(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Other(Value::String(value.to_string()))
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Other(Value::String(value))
    }
}

/// Model settings fixed for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    model_name: String,
    temperature: f64,
}

impl ModelConfig {
    /// Build from typed values. Aliases are resolved here.
    pub fn new(model_name: &str, temperature: f64) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();
        if model_name.trim().is_empty() {
            violations.push(ConfigViolation::EmptyModelName);
        }
        if !temperature.is_finite() {
            violations.push(ConfigViolation::TemperatureNotFinite);
        }
        if !violations.is_empty() {
            return Err(ConfigError { violations });
        }
        Ok(Self {
            model_name: resolve_model_alias(model_name.trim()).to_string(),
            temperature,
        })
    }

    /// Validate loosely-typed settings values.
    ///
    /// Integers and floats are both accepted for `temperature`.
    pub fn from_values(
        model_name: Option<&SettingValue>,
        temperature: Option<&SettingValue>,
    ) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();

        let name = match model_name {
            None | Some(SettingValue::Other(Value::Null)) => {
                violations.push(ConfigViolation::MissingModelName);
                None
            }
            Some(SettingValue::Other(Value::String(s))) if s.trim().is_empty() => {
                violations.push(ConfigViolation::EmptyModelName);
                None
            }
            Some(SettingValue::Other(Value::String(s))) => Some(s.as_str()),
            Some(other) => {
                violations.push(ConfigViolation::ModelNameNotString {
                    found: other.describe(),
                });
                None
            }
        };

        let number = match temperature {
            None | Some(SettingValue::Other(Value::Null)) => {
                violations.push(ConfigViolation::MissingTemperature);
                None
            }
            Some(SettingValue::Float(t)) => Some(*t),
            Some(SettingValue::Other(Value::Number(n))) => n.as_f64(),
            Some(other) => {
                violations.push(ConfigViolation::TemperatureNotNumeric {
                    found: other.describe(),
                });
                None
            }
        };
        let temp = match number {
            Some(t) if !t.is_finite() => {
                violations.push(ConfigViolation::TemperatureNotFinite);
                None
            }
            other => other,
        };

        match (name, temp) {
            (Some(name), Some(temp)) if violations.is_empty() => Self::new(name, temp),
            _ => Err(ConfigError { violations }),
        }
    }

    /// Provider model id (aliases already resolved).
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: resolve_model_alias(DEFAULT_MODEL).to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}
