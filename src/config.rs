//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MOBIKIT_CONFIG` (environment variable)
//! 2. `~/.config/mobikit/config.toml` (Linux/macOS)
//!    `%APPDATA%\mobikit\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::mobi::header::DEFAULT_RECORD_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Output defaults for the inspection commands.
    pub output: OutputConfig,
    /// Settings applied when a book is rewritten.
    pub write: WriteConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Output defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print JSON instead of tables unless a command says otherwise.
    pub json: bool,
}

/// Rewrite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Copy the source to `<file>.bak` before rewriting it in place.
    pub backup: bool,
    /// Uncompressed size of each text record written by `text --set`.
    pub text_record_size: u16,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            backup: true,
            text_record_size: DEFAULT_RECORD_SIZE,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MOBIKIT_CONFIG";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Replace settings the CLI cannot use with their defaults.
    fn validated(mut self) -> Self {
        if self.write.text_record_size == 0 {
            tracing::warn!("write.text_record_size must be positive, using the default");
            self.write.text_record_size = DEFAULT_RECORD_SIZE;
        }
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            tracing::warn!(level = %self.general.log_level, "Unknown log level, using warn");
            self.general.log_level = GeneralConfig::default().log_level;
        }
        self
    }
}

/// Load the config file, or the defaults when there is none or it is broken.
pub fn load_config() -> Config {
    let Some(path) = config_file_path().filter(|p| p.exists()) else {
        return Config::default();
    };
    match read_config(&path) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg.validated()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
            Config::default()
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Write `config` to the config file path and return that path.
///
/// An existing file is only replaced when `overwrite` is set.
pub fn save_config(config: &Config, overwrite: bool) -> anyhow::Result<PathBuf> {
    let path = config_file_path().context("no config directory on this platform")?;
    if path.exists() && !overwrite {
        anyhow::bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(config)?)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// `$MOBIKIT_CONFIG`, else `mobikit/config.toml` in the platform config dir.
pub fn config_file_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => Some(PathBuf::from(path)),
        None => dirs::config_dir().map(|d| d.join("mobikit").join("config.toml")),
    }
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mobikit")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mobikit.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(!cfg.output.json);
        assert!(cfg.write.backup);
        assert_eq!(cfg.write.text_record_size, 4096);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.write.text_record_size = 2048;
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.write.text_record_size, 2048);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[output]
json = true

[write]
backup = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(cfg.output.json);
        assert!(!cfg.write.backup);
        // Other fields use defaults
        assert_eq!(cfg.write.text_record_size, 4096);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_save_then_load_from_env_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        std::env::set_var(CONFIG_ENV, &path);

        let mut cfg = Config::default();
        cfg.output.json = true;
        cfg.write.text_record_size = 1024;
        assert_eq!(save_config(&cfg, false).expect("save"), path);
        assert!(save_config(&cfg, false).is_err());
        save_config(&cfg, true).expect("overwrite");

        let loaded = load_config();
        assert!(loaded.output.json);
        assert_eq!(loaded.write.text_record_size, 1024);

        std::fs::write(&path, "[write]\ntext_record_size = 0\n").expect("write");
        assert_eq!(load_config().write.text_record_size, 4096);

        std::fs::write(&path, "not = [valid").expect("write");
        assert_eq!(load_config().write.text_record_size, 4096);
        std::env::remove_var(CONFIG_ENV);
    }

    #[test]
    fn test_unknown_log_level_falls_back() {
        let cfg: Config = toml::from_str("[general]\nlog_level = \"loud\"\n").expect("parse");
        assert_eq!(cfg.validated().general.log_level, "warn");
    }

    #[test]
    fn test_cache_dir_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/mobikit-cache"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/mobikit-cache/mobikit.log")
        );
    }
}
