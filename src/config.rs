use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::snapshot::Layout;

/// Release page listing the latest snapshot asset.
pub const DEFAULT_INDEX_URL: &str = "https://github.com/JamzumSum/QzEmoji/releases/latest";
/// Last-known-good snapshot, used when the index cannot be resolved.
pub const DEFAULT_FALLBACK_URL: &str =
    "https://github.com/JamzumSum/QzEmoji/releases/download/v2.1.0/emoji.db";
pub const DEFAULT_ASSET_NAME: &str = "emoji.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn default(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local store and snapshot slots
    pub data_dir: ConfigValue<PathBuf>,
    /// Page linking to the latest snapshot asset
    pub index_url: ConfigValue<String>,
    /// Asset downloaded when the index cannot be resolved
    pub fallback_url: ConfigValue<String>,
    /// File name of the snapshot asset on the index page
    pub asset_name: ConfigValue<String>,
    /// HTTP(S) proxy for all remote requests
    pub proxy: ConfigValue<Option<String>>,
    /// Upper bound for a whole request, body included
    pub timeout_secs: ConfigValue<u64>,
    /// Synchronize once on first use
    pub auto_update: ConfigValue<bool>,
    /// Snapshot shipped alongside the application, used before any download
    pub seed_snapshot: ConfigValue<Option<PathBuf>>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    index_url: Option<String>,
    fallback_url: Option<String>,
    asset_name: Option<String>,
    proxy: Option<String>,
    timeout_secs: Option<u64>,
    auto_update: Option<bool>,
    seed_snapshot: Option<PathBuf>,
}

impl Config {
    /// Defaults rooted at `data_dir`, without reading files or environment.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: ConfigValue::default(data_dir.into()),
            index_url: ConfigValue::default(DEFAULT_INDEX_URL.to_string()),
            fallback_url: ConfigValue::default(DEFAULT_FALLBACK_URL.to_string()),
            asset_name: ConfigValue::default(DEFAULT_ASSET_NAME.to_string()),
            proxy: ConfigValue::default(None),
            timeout_secs: ConfigValue::default(DEFAULT_TIMEOUT_SECS),
            auto_update: ConfigValue::default(true),
            seed_snapshot: ConfigValue::default(None),
            config_file: None,
        }
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::with_data_dir(Self::default_data_dir());

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config.apply_file(&path, file_config);
            config.config_file = Some(path);
        }

        config.apply_env()?;

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path, file: ConfigFile) {
        let from_file = |v| ConfigValue::new(v, ConfigSource::File);

        if let Some(dir) = file.data_dir {
            self.data_dir = from_file(resolve_relative(path, dir));
        }
        if let Some(url) = file.index_url {
            self.index_url = ConfigValue::new(url, ConfigSource::File);
        }
        if let Some(url) = file.fallback_url {
            self.fallback_url = ConfigValue::new(url, ConfigSource::File);
        }
        if let Some(name) = file.asset_name {
            self.asset_name = ConfigValue::new(name, ConfigSource::File);
        }
        if let Some(proxy) = file.proxy {
            self.proxy = ConfigValue::new(Some(proxy), ConfigSource::File);
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout_secs = ConfigValue::new(secs, ConfigSource::File);
        }
        if let Some(enabled) = file.auto_update {
            self.auto_update = ConfigValue::new(enabled, ConfigSource::File);
        }
        if let Some(seed) = file.seed_snapshot {
            self.seed_snapshot =
                ConfigValue::new(Some(resolve_relative(path, seed)), ConfigSource::File);
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let env = |v| ConfigValue::new(v, ConfigSource::Environment);

        if let Ok(dir) = std::env::var("QZEMOJI_DATA_DIR") {
            self.data_dir = env(PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var("QZEMOJI_INDEX_URL") {
            self.index_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("QZEMOJI_FALLBACK_URL") {
            self.fallback_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(proxy) = std::env::var("QZEMOJI_PROXY") {
            self.proxy = ConfigValue::new(Some(proxy), ConfigSource::Environment);
        }
        if let Ok(secs) = std::env::var("QZEMOJI_TIMEOUT_SECS") {
            let secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("QZEMOJI_TIMEOUT_SECS", secs.clone()))?;
            self.timeout_secs = ConfigValue::new(secs, ConfigSource::Environment);
        }
        if let Ok(flag) = std::env::var("QZEMOJI_AUTO_UPDATE") {
            let enabled = parse_flag(&flag)
                .ok_or_else(|| ConfigError::InvalidEnv("QZEMOJI_AUTO_UPDATE", flag.clone()))?;
            self.auto_update = ConfigValue::new(enabled, ConfigSource::Environment);
        }
        if let Ok(seed) = std::env::var("QZEMOJI_SEED_SNAPSHOT") {
            self.seed_snapshot =
                ConfigValue::new(Some(PathBuf::from(seed)), ConfigSource::Environment);
        }

        Ok(())
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.data_dir.value, &self.asset_name.value)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/qzemoji/
    /// - macOS: ~/Library/Application Support/qzemoji/
    /// - Windows: %APPDATA%/qzemoji/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qzemoji")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/qzemoji/
    /// - macOS: ~/Library/Application Support/qzemoji/
    /// - Windows: %APPDATA%/qzemoji/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qzemoji")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve_relative(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
            ConfigError::InvalidEnv(_, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.index_url.value, DEFAULT_INDEX_URL);
        assert_eq!(config.index_url.source, ConfigSource::Default);
        assert_eq!(config.asset_name.value, "emoji.db");
        assert_eq!(config.timeout_secs.value, 30);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/qzemoji").unwrap();
        writeln!(file, "index_url: http://mirror.local/").unwrap();
        writeln!(file, "auto_update: false").unwrap();
        writeln!(file, "timeout_secs: 5").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/qzemoji"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.index_url.value, "http://mirror.local/");
        assert!(!config.auto_update.value);
        assert_eq!(config.auto_update.source, ConfigSource::File);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.fallback_url.source, ConfigSource::Default);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: data").unwrap();
        writeln!(file, "seed_snapshot: shipped/emoji.db").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
        assert_eq!(
            config.seed_snapshot.value,
            Some(temp_dir.path().join("shipped/emoji.db"))
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "proxy: http://fromfile:1234").unwrap();

        std::env::set_var("QZEMOJI_PROXY", "http://fromenv:1234");
        std::env::set_var("QZEMOJI_AUTO_UPDATE", "0");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.proxy.value.as_deref(), Some("http://fromenv:1234"));
        assert_eq!(config.proxy.source, ConfigSource::Environment);
        assert!(!config.auto_update.value);

        // Clean up
        std::env::remove_var("QZEMOJI_PROXY");
        std::env::remove_var("QZEMOJI_AUTO_UPDATE");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_layout_uses_data_dir() {
        let config = Config::with_data_dir("/tmp/qz");
        let layout = config.layout();
        assert_eq!(layout.store, PathBuf::from("/tmp/qz/qzemoji.db"));
        assert_eq!(layout.adopted, PathBuf::from("/tmp/qz/emoji.db"));
        assert_eq!(layout.staging, PathBuf::from("/tmp/qz/emoji.db.part"));
    }
}
