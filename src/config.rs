//! Service configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file by the binaries (`dotenv::dotenv().ok()`).

use crate::error::{LocalizationError, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATABASE_PATH: &str = "specify.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Which string rows count as "available" when negotiating a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocaleScope {
    /// Every locale present anywhere in the string table.
    #[default]
    Global,
    /// Only locales attached to containers/items of the requested discipline.
    Discipline,
}

impl FromStr for LocaleScope {
    type Err = LocalizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "global" => Ok(LocaleScope::Global),
            "discipline" => Ok(LocaleScope::Discipline),
            other => Err(LocalizationError::Config(format!(
                "LOCALE_SCOPE must be 'global' or 'discipline', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// Collection used when a request does not name one.
    pub default_collection_id: Option<i64>,
    pub locale_scope: LocaleScope,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_collection_id: None,
            locale_scope: LocaleScope::Global,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(raw) = lookup("DEFAULT_COLLECTION_ID") {
            let id = raw.trim().parse::<i64>().map_err(|e| {
                LocalizationError::Config(format!(
                    "DEFAULT_COLLECTION_ID must be an integer, got '{}': {}",
                    raw, e
                ))
            })?;
            config.default_collection_id = Some(id);
        }

        if let Some(scope) = lookup("LOCALE_SCOPE") {
            config.locale_scope = scope.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("specify.db"));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.default_collection_id, None);
        assert_eq!(config.locale_scope, LocaleScope::Global);
    }

    #[test]
    fn test_reads_all_keys() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_PATH", "/var/lib/specify/specify.db"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DEFAULT_COLLECTION_ID", "4"),
            ("LOCALE_SCOPE", "Discipline"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/specify/specify.db"));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.default_collection_id, Some(4));
        assert_eq!(config.locale_scope, LocaleScope::Discipline);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = Config::from_lookup(lookup_from(&[("DEFAULT_COLLECTION_ID", "four")])).unwrap_err();
        assert!(matches!(err, LocalizationError::Config(_)));

        let err = Config::from_lookup(lookup_from(&[("LOCALE_SCOPE", "everywhere")])).unwrap_err();
        assert!(matches!(err, LocalizationError::Config(_)));
    }
}
