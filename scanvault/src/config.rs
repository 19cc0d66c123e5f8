use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "database/nmap_data.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    pub default_max_results: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: Option<DatabaseConfig>,
    pub server: Option<ServerConfig>,
    pub query: Option<QueryConfig>,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.database
            .as_ref()
            .and_then(|d| d.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn max_body_bytes(&self) -> usize {
        self.server.as_ref().and_then(|s| s.max_body_bytes).unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn default_max_results(&self) -> u32 {
        self.query.as_ref().and_then(|q| q.default_max_results).unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn log_level(&self) -> String {
        self.logging.as_ref().and_then(|l| l.level.clone()).unwrap_or_else(|| "info".to_string())
    }

    pub fn log_format(&self) -> String {
        self.logging.as_ref().and_then(|l| l.format.clone()).unwrap_or_else(|| "pretty".to_string())
    }
}

/// Loads the YAML config. An explicit path must exist and parse; without
/// one, `./scanvault.yaml` is used if present and defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("scanvault.yaml");
            if p.exists() { p.to_path_buf() } else { return Ok(Config::default()); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    serde_yaml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let cfg = Config::default();
        assert_eq!(cfg.db_path(), PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cfg.bind(), DEFAULT_BIND);
        assert_eq!(cfg.default_max_results(), 5);
        assert_eq!(cfg.log_format(), "pretty");
    }

    #[test]
    fn parses_yaml_sections() {
        let yaml = "database:\n  path: /var/lib/scanvault/scans.db\nserver:\n  bind: 0.0.0.0:8080\nquery:\n  default_max_results: 20\nlogging:\n  level: debug\n  format: json\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.db_path(), PathBuf::from("/var/lib/scanvault/scans.db"));
        assert_eq!(cfg.bind(), "0.0.0.0:8080");
        assert_eq!(cfg.default_max_results(), 20);
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_format(), "json");
        assert_eq!(cfg.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanvault.yaml");
        fs::write(&path, "server:\n  port: 5000\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
