//! Runtime settings read from the environment.
//!
//! | Variable                | Default                    |
//! |-------------------------|----------------------------|
//! | `PIVOTDESK_PORT`        | `3000`                     |
//! | `PIVOTDESK_REPORTS`     | `.pivotdesk/reports.json`  |
//! | `PIVOTDESK_EXPORT_NAME` | `pivot-table-export.csv`   |
//!
//! A `.env` file in the working directory is loaded first when present.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::report::DEFAULT_REPORTS_PATH;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_EXPORT_NAME: &str = "pivot-table-export.csv";

pub const PORT_VAR: &str = "PIVOTDESK_PORT";
pub const REPORTS_VAR: &str = "PIVOTDESK_REPORTS";
pub const EXPORT_NAME_VAR: &str = "PIVOTDESK_EXPORT_NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub reports_path: PathBuf,
    pub export_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reports_path: PathBuf::from(DEFAULT_REPORTS_PATH),
            export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Blank values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(raw) = get(PORT_VAR) {
            settings.port = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: PORT_VAR.to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(path) = get(REPORTS_VAR) {
            settings.reports_path = PathBuf::from(path);
        }
        if let Some(name) = get(EXPORT_NAME_VAR) {
            settings.export_name = name;
        }

        Ok(settings)
    }
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
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (PORT_VAR, "8080"),
            (REPORTS_VAR, "/tmp/r.json"),
            (EXPORT_NAME_VAR, "sales.csv"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.reports_path, PathBuf::from("/tmp/r.json"));
        assert_eq!(settings.export_name, "sales.csv");
    }

    #[test]
    fn test_invalid_port() {
        let err = Settings::from_lookup(lookup(&[(PORT_VAR, "eighty")])).unwrap_err();
        assert!(err.to_string().contains(PORT_VAR));
    }

    #[test]
    fn test_blank_falls_back() {
        let settings = Settings::from_lookup(lookup(&[(PORT_VAR, "  ")])).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
    }
}
