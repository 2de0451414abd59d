//! Runtime configuration.
//!
//! # Precedence
//! 1. CLI flags (applied by the binary through [`ConfigOverrides`])
//! 2. Environment variables (`NEURON_*`)
//! 3. TOML file (`<config_dir>/neuron-cli/config.toml` or an explicit path)
//! 4. Built-in defaults
//!
//! # Invariants
//! - A missing default config file is not an error; a missing explicit one is.
//! - Unknown keys in the file are rejected.

use crate::logging::default_log_level;
use crate::study::{DEFAULT_MODEL, DEFAULT_PROVIDER_URL};
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR_NAME: &str = "neuron-cli";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "neuron.db";
const LOG_DIR_NAME: &str = "logs";

pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MIX_SIZE: u32 = 3;

pub const ENV_DB_PATH: &str = "NEURON_DB_PATH";
pub const ENV_LOG_DIR: &str = "NEURON_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "NEURON_LOG_LEVEL";
pub const ENV_PROVIDER_URL: &str = "NEURON_PROVIDER_URL";
pub const ENV_PROVIDER_MODEL: &str = "NEURON_PROVIDER_MODEL";

#[derive(Debug)]
pub enum ConfigError {
    /// No platform config directory could be determined.
    NoConfigDir,
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConfigDir => write!(f, "cannot determine the user config directory"),
            Self::Read { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config `{}`: {message}", path.display())
            }
            Self::Invalid { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Question provider endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROVIDER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub provider: ProviderConfig,
    /// Notes per interleaved (`mix`) session.
    pub mix_size: u32,
}

/// On-disk shape; every field optional so files can be partial.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    mix_size: Option<u32>,
    provider: ProviderFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderFile {
    url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// `<platform config dir>/neuron-cli`.
pub fn default_app_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

impl NeuronConfig {
    /// Defaults rooted at `app_dir`.
    pub fn with_app_dir(app_dir: &Path) -> Self {
        Self {
            db_path: app_dir.join(DB_FILE_NAME),
            log_dir: app_dir.join(LOG_DIR_NAME),
            log_level: default_log_level().to_string(),
            provider: ProviderConfig::default(),
            mix_size: DEFAULT_MIX_SIZE,
        }
    }

    /// Loads defaults, the config file and the process environment.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let app_dir = default_app_dir()?;
        Self::resolve(&app_dir, explicit_file, |key| std::env::var(key).ok())
    }

    /// Resolves configuration with an injectable environment lookup.
    pub fn resolve(
        app_dir: &Path,
        explicit_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::with_app_dir(app_dir);

        match explicit_file {
            Some(path) => config.apply_file(path)?,
            None => {
                let path = app_dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    config.apply_file(&path)?;
                } else {
                    debug!(
                        "event=config_file module=config status=absent path={}",
                        path.display()
                    );
                }
            }
        }

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(log_dir) = file.log_dir {
            self.log_dir = log_dir;
        }
        if let Some(log_level) = file.log_level {
            self.log_level = log_level;
        }
        if let Some(mix_size) = file.mix_size {
            self.mix_size = mix_size;
        }
        if let Some(url) = file.provider.url {
            self.provider.url = url;
        }
        if let Some(model) = file.provider.model {
            self.provider.model = model;
        }
        if let Some(timeout_secs) = file.provider.timeout_secs {
            self.provider.timeout_secs = timeout_secs;
        }

        debug!(
            "event=config_file module=config status=loaded path={}",
            path.display()
        );
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = var(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = var(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = var(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = var(ENV_PROVIDER_URL) {
            self.provider.url = value;
        }
        if let Some(value) = var(ENV_PROVIDER_MODEL) {
            self.provider.model = value;
        }
    }

    /// Applies command-line values, the highest-precedence layer.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.db_path = db_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(invalid("db_path", "cannot be empty"));
        }
        if !self.log_dir.is_absolute() {
            return Err(invalid(
                "log_dir",
                &format!("must be absolute, got `{}`", self.log_dir.display()),
            ));
        }
        if self.provider.url.trim().is_empty() {
            return Err(invalid("provider.url", "cannot be empty"));
        }
        if self.provider.model.trim().is_empty() {
            return Err(invalid("provider.model", "cannot be empty"));
        }
        if self.provider.timeout_secs == 0 {
            return Err(invalid("provider.timeout_secs", "must be at least 1"));
        }
        if self.mix_size == 0 {
            return Err(invalid("mix_size", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_live_under_app_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NeuronConfig::resolve(dir.path(), None, no_env).unwrap();

        assert_eq!(config.db_path, dir.path().join("neuron.db"));
        assert_eq!(config.log_dir, dir.path().join("logs"));
        assert_eq!(config.provider.url, "http://localhost:11434");
        assert_eq!(config.provider.model, "llama3:8b-instruct-q4_K_M");
        assert_eq!(config.provider.timeout(), Duration::from_secs(120));
        assert_eq!(config.mix_size, 3);
    }

    #[test]
    fn partial_file_overrides_only_its_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "mix_size = 5\n\n[provider]\nmodel = \"mistral\"\n",
        )
        .unwrap();

        let config = NeuronConfig::resolve(dir.path(), None, no_env).unwrap();
        assert_eq!(config.mix_size, 5);
        assert_eq!(config.provider.model, "mistral");
        assert_eq!(config.provider.url, DEFAULT_PROVIDER_URL);
        assert_eq!(config.db_path, dir.path().join("neuron.db"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "databse = \"typo.db\"\n").unwrap();

        let err = NeuronConfig::resolve(dir.path(), Some(&path), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = NeuronConfig::resolve(dir.path(), Some(&path), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_beats_file_and_cli_beats_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "log_level = \"warn\"\ndb_path = \"/from/file.db\"\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/from/env.db"),
            (ENV_PROVIDER_URL, "http://gpu-box:11434"),
            (ENV_LOG_LEVEL, "  "),
        ]);

        let mut config = NeuronConfig::resolve(dir.path(), None, |key| {
            env.get(key).map(|value| value.to_string())
        })
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/from/env.db"));
        assert_eq!(config.provider.url, "http://gpu-box:11434");
        assert_eq!(config.log_level, "warn");

        config.apply_overrides(ConfigOverrides {
            db_path: Some(PathBuf::from("/from/cli.db")),
            log_level: None,
        });
        assert_eq!(config.db_path, PathBuf::from("/from/cli.db"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn zero_mix_size_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "mix_size = 0\n").unwrap();
        let err = NeuronConfig::resolve(dir.path(), None, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "mix_size", .. }));
    }
}
