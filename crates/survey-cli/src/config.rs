//! Planner rules loaded from the environment.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use survey_core::PlannerRules;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rules: PlannerRules,
    /// Rules document named by `SURVEY_RULES`, if any
    pub rules_path: Option<PathBuf>,
}

impl Config {
    /// Read `SURVEY_RULES` (a JSON `PlannerRules` file) and the per-field
    /// overrides `SURVEY_OVERHEAD_S`, `SURVEY_WARNING_RATIO`,
    /// `SURVEY_CRITICAL_RATIO`, `SURVEY_MIN_SEGMENT_M`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rules_path = lookup("SURVEY_RULES").map(PathBuf::from);
        let mut rules = match &rules_path {
            Some(path) => load_rules(path)?,
            None => PlannerRules::default(),
        };

        let number = |key: &str| -> Result<Option<f64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<f64>()
                        .with_context(|| format!("{key} must be a number, got {raw:?}"))
                })
                .transpose()
        };
        if let Some(value) = number("SURVEY_OVERHEAD_S")? {
            rules.takeoff_landing_overhead_s = value;
        }
        if let Some(value) = number("SURVEY_WARNING_RATIO")? {
            rules.warning_ratio = value;
        }
        if let Some(value) = number("SURVEY_CRITICAL_RATIO")? {
            rules.critical_ratio = value;
        }
        if let Some(value) = number("SURVEY_MIN_SEGMENT_M")? {
            rules.min_segment_length_m = value;
        }

        if rules.warning_ratio > rules.critical_ratio {
            tracing::warn!(
                warning = rules.warning_ratio,
                critical = rules.critical_ratio,
                "warning ratio exceeds critical ratio"
            );
        }
        Ok(Self { rules, rules_path })
    }
}

fn load_rules(path: &Path) -> Result<PlannerRules> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse rules file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.rules, PlannerRules::default());
        assert!(config.rules_path.is_none());
    }

    #[test]
    fn overrides_apply() {
        let config = Config::from_lookup(lookup(&[
            ("SURVEY_OVERHEAD_S", "90"),
            ("SURVEY_WARNING_RATIO", " 0.7 "),
        ]))
        .unwrap();
        assert_eq!(config.rules.takeoff_landing_overhead_s, 90.0);
        assert_eq!(config.rules.warning_ratio, 0.7);
        assert_eq!(config.rules.critical_ratio, 1.0);
    }

    #[test]
    fn bad_number_is_reported() {
        let err = Config::from_lookup(lookup(&[("SURVEY_MIN_SEGMENT_M", "short")])).unwrap_err();
        assert!(err.to_string().contains("SURVEY_MIN_SEGMENT_M"));
    }

    #[test]
    fn missing_rules_file_is_reported() {
        let err = Config::from_lookup(lookup(&[("SURVEY_RULES", "/nonexistent/rules.json")]))
            .unwrap_err();
        assert!(err.to_string().contains("rules file"));
    }
}
