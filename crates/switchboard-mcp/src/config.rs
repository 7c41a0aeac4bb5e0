use std::str::FromStr;

use switchboard_core::{ConfidenceFormula, Scenario, DEFAULT_BASE_PRICE};
use thiserror::Error;

pub const ENV_BASE_PRICE: &str = "SWITCHBOARD_BASE_PRICE";
pub const ENV_CONFIDENCE_FORMULA: &str = "SWITCHBOARD_CONFIDENCE_FORMULA";
pub const ENV_MAX_SESSIONS: &str = "SWITCHBOARD_MAX_SESSIONS";
pub const ENV_DEFAULT_SCENARIO: &str = "SWITCHBOARD_DEFAULT_SCENARIO";
pub const ENV_LOG: &str = "SWITCHBOARD_LOG";

const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub base_price: f64,
    pub formula: ConfidenceFormula,
    pub max_sessions: usize,
    pub default_scenario: Scenario,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_price: DEFAULT_BASE_PRICE,
            formula: ConfidenceFormula::default(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            default_scenario: Scenario::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any name-to-value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let formula = match value(ENV_CONFIDENCE_FORMULA) {
            Some(raw) => {
                ConfidenceFormula::from_str(&raw).map_err(|err| ConfigError::Invalid {
                    name: ENV_CONFIDENCE_FORMULA,
                    reason: err.to_string(),
                })?
            }
            None => defaults.formula,
        };

        let base_price = value(ENV_BASE_PRICE)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(defaults.base_price)
            .clamp(1.0, 1000.0);

        let max_sessions = value(ENV_MAX_SESSIONS)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_sessions)
            .clamp(1, 65_536);

        let default_scenario = value(ENV_DEFAULT_SCENARIO)
            .map_or(defaults.default_scenario, |v| Scenario::parse_lenient(&v));

        Ok(Self {
            base_price,
            formula,
            max_sessions,
            default_scenario,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            (ENV_BASE_PRICE, "55.5"),
            (ENV_CONFIDENCE_FORMULA, "linear"),
            (ENV_MAX_SESSIONS, "0"),
            (ENV_DEFAULT_SCENARIO, "eon"),
        ]))
        .expect("valid config");
        assert!((cfg.base_price - 55.5).abs() < 1e-9);
        assert_eq!(cfg.formula, ConfidenceFormula::Linear);
        assert_eq!(cfg.max_sessions, 1);
        assert_eq!(cfg.default_scenario, Scenario::Eon);
    }

    #[test]
    fn unparseable_price_falls_back() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[(ENV_BASE_PRICE, "cheap")]))
            .expect("fallback");
        assert!((cfg.base_price - DEFAULT_BASE_PRICE).abs() < 1e-9);
    }

    #[test]
    fn unknown_formula_is_an_error() {
        let err = ServerConfig::from_lookup(lookup_from(&[(ENV_CONFIDENCE_FORMULA, "vibes")]))
            .expect_err("invalid formula");
        assert!(err.to_string().contains(ENV_CONFIDENCE_FORMULA));
    }
}
