//! Service configuration: an optional JSON file, overridden by environment variables.
//!
//! The file is `<config dir>/waste-monitor/config.json` unless
//! `WASTE_MONITOR_CONFIG` points elsewhere; a missing file is not an error.
//!
//! | Variable                         | File key           | Default                                    |
//! |----------------------------------|--------------------|--------------------------------------------|
//! | `WASTE_MONITOR_PORT`             | `port`             | `3000`                                     |
//! | `WASTE_MONITOR_GEO_URL`          | `geo_base_url`     | `http://localhost:8080/geo`                |
//! | `WASTE_MONITOR_GEO_TIMEOUT_SECS` | `geo_timeout_secs` | `30`                                       |
//! | `WASTE_MONITOR_ACCOUNTS`         | `accounts_file`    | `<config dir>/waste-monitor/accounts.json` |
//! | `WASTE_MONITOR_DATASETS`         | `datasets`         | extra `key=path` pairs, comma-separated    |
//! | `WASTE_MONITOR_CORS_ORIGINS`     | `cors_origins`     | permissive when unset                      |

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::geo::{DatasetRegistry, DEFAULT_FETCH_TIMEOUT, DEFAULT_GEO_URL};
use crate::guard::NavigationTargets;
use crate::models::DatasetKey;

const APP_NAME: &str = "waste-monitor";
const ACCOUNTS_FILE: &str = "accounts.json";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Base URL boundary dataset paths are resolved against.
    pub geo_base_url: String,
    /// Longest a single dataset fetch may take before it counts as failed.
    pub geo_timeout: Duration,
    /// JSON file listing the accounts allowed to sign in.
    pub accounts_file: PathBuf,
    /// Allowed CORS origins; `None` allows any.
    pub cors_origins: Option<Vec<String>>,
    pub datasets: DatasetRegistry,
    pub navigation: NavigationTargets,
}

/// Contents of the optional config file. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub geo_base_url: Option<String>,
    pub geo_timeout_secs: Option<u64>,
    pub accounts_file: Option<PathBuf>,
    pub cors_origins: Option<Vec<String>>,
    #[serde(default)]
    pub datasets: BTreeMap<String, String>,
}

impl FileConfig {
    /// Read the config file at `path`; `None` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Some(config))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable lookup (the environment, or a map in tests).
    ///
    /// The lookup also decides which config file is read.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = lookup("WASTE_MONITOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);
        let file = FileConfig::load(&path)?.unwrap_or_default();
        Self::from_sources(file, lookup)
    }

    /// Layer environment values over a parsed config file.
    pub fn from_sources(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("WASTE_MONITOR_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid WASTE_MONITOR_PORT: {}", value))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let geo_base_url = lookup("WASTE_MONITOR_GEO_URL")
            .or(file.geo_base_url)
            .unwrap_or_else(|| DEFAULT_GEO_URL.to_string());

        let geo_timeout = match lookup("WASTE_MONITOR_GEO_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid WASTE_MONITOR_GEO_TIMEOUT_SECS: {}", value))?,
            ),
            None => file
                .geo_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
        };
        if geo_timeout.is_zero() {
            anyhow::bail!("Dataset fetch timeout must be at least one second");
        }

        let accounts_file = lookup("WASTE_MONITOR_ACCOUNTS")
            .map(PathBuf::from)
            .or(file.accounts_file)
            .unwrap_or_else(default_accounts_path);

        let cors_origins = lookup("WASTE_MONITOR_CORS_ORIGINS")
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
            .or(file.cors_origins);

        let mut datasets = DatasetRegistry::default();
        for (key, path) in file.datasets {
            datasets.insert(DatasetKey::new(key), path);
        }
        if let Some(extra) = lookup("WASTE_MONITOR_DATASETS") {
            for (key, path) in parse_datasets(&extra)? {
                datasets.insert(key, path);
            }
        }

        Ok(Self {
            port,
            geo_base_url,
            geo_timeout,
            accounts_file,
            cors_origins,
            datasets,
            navigation: NavigationTargets::default(),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            geo_base_url: DEFAULT_GEO_URL.to_string(),
            geo_timeout: DEFAULT_FETCH_TIMEOUT,
            accounts_file: default_accounts_path(),
            cors_origins: None,
            datasets: DatasetRegistry::default(),
            navigation: NavigationTargets::default(),
        }
    }
}

/// Parse `key=path,key=path` into dataset registrations.
fn parse_datasets(value: &str) -> Result<Vec<(DatasetKey, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(DatasetKey, String)> {
            let (key, path) = pair
                .split_once('=')
                .with_context(|| format!("Dataset entry must be key=path, got: {}", pair))?;
            let (key, path) = (key.trim(), path.trim());
            if key.is_empty() || path.is_empty() {
                anyhow::bail!("Dataset entry has an empty key or path: {}", pair);
            }
            Ok((DatasetKey::new(key), path.to_string()))
        })
        .collect()
}

fn config_dir_file(name: &str) -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn default_config_path() -> PathBuf {
    config_dir_file(CONFIG_FILE)
}

fn default_accounts_path() -> PathBuf {
    config_dir_file(ACCOUNTS_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_sources(FileConfig::default(), |name| vars.get(name).cloned())
    }

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.geo_base_url, "http://localhost:8080/geo");
        assert_eq!(config.geo_timeout, Duration::from_secs(30));
        assert!(config.cors_origins.is_none());
        assert!(config.accounts_file.ends_with("accounts.json"));
        assert_eq!(config.datasets, DatasetRegistry::default());
    }

    #[test]
    fn reads_port_url_and_origins() {
        let config = config_from(&[
            ("WASTE_MONITOR_PORT", "8088"),
            ("WASTE_MONITOR_GEO_URL", "https://geo.example.go.id/batas"),
            ("WASTE_MONITOR_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("WASTE_MONITOR_ACCOUNTS", "/etc/waste-monitor/accounts.json"),
        ])
        .unwrap();

        assert_eq!(config.port, 8088);
        assert_eq!(config.geo_base_url, "https://geo.example.go.id/batas");
        assert_eq!(
            config.cors_origins,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        assert_eq!(
            config.accounts_file,
            PathBuf::from("/etc/waste-monitor/accounts.json")
        );
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = config_from(&[("WASTE_MONITOR_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("WASTE_MONITOR_PORT"));
    }

    #[test]
    fn extra_datasets_extend_defaults() {
        let config = config_from(&[(
            "WASTE_MONITOR_DATASETS",
            "tps-locations=tps.geojson, rt-boundaries=2024/rt.geojson",
        )])
        .unwrap();

        assert_eq!(
            config.datasets.path(&"tps-locations".into()),
            Some("tps.geojson")
        );
        assert_eq!(
            config.datasets.path(&"rt-boundaries".into()),
            Some("2024/rt.geojson")
        );
    }

    #[test]
    fn malformed_dataset_entry_is_an_error() {
        assert!(config_from(&[("WASTE_MONITOR_DATASETS", "tps-locations")]).is_err());
        assert!(config_from(&[("WASTE_MONITOR_DATASETS", "=tps.geojson")]).is_err());
    }

    #[test]
    fn reads_timeout_and_rejects_zero() {
        let config = config_from(&[("WASTE_MONITOR_GEO_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(config.geo_timeout, Duration::from_secs(5));

        assert!(config_from(&[("WASTE_MONITOR_GEO_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("WASTE_MONITOR_GEO_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        let missing = missing.to_str().unwrap().to_string();

        let config = AppConfig::from_lookup(|name| {
            (name == "WASTE_MONITOR_CONFIG").then(|| missing.clone())
        })
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.datasets, DatasetRegistry::default());
    }

    #[test]
    fn config_file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "port": 9000,
                "geo_base_url": "https://geo.example.go.id",
                "geo_timeout_secs": 12,
                "accounts_file": "/srv/accounts.json",
                "cors_origins": ["https://dashboard.example.go.id"],
                "datasets": { "tps-locations": "tps.geojson" }
            }"#,
        );
        let path = path.to_str().unwrap().to_string();

        let config = AppConfig::from_lookup(|name| {
            (name == "WASTE_MONITOR_CONFIG").then(|| path.clone())
        })
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.geo_base_url, "https://geo.example.go.id");
        assert_eq!(config.geo_timeout, Duration::from_secs(12));
        assert_eq!(config.accounts_file, PathBuf::from("/srv/accounts.json"));
        assert_eq!(
            config.cors_origins,
            Some(vec!["https://dashboard.example.go.id".to_string()])
        );
        assert_eq!(config.datasets.path(&"tps-locations".into()), Some("tps.geojson"));
        assert_eq!(config.datasets.path(&"rt-boundaries".into()), Some("rt.geojson"));
    }

    #[test]
    fn environment_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{ "port": 9000, "datasets": { "rt-boundaries": "file/rt.geojson" } }"#,
        );

        let vars: HashMap<String, String> = [
            ("WASTE_MONITOR_CONFIG", path.to_str().unwrap()),
            ("WASTE_MONITOR_PORT", "9100"),
            ("WASTE_MONITOR_DATASETS", "rt-boundaries=env/rt.geojson"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(
            config.datasets.path(&"rt-boundaries".into()),
            Some("env/rt.geojson")
        );
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{ "port": "not a number" }"#);

        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
