use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use neuron_core::db::Connection;
use neuron_core::{
    init_logging, open_db, ConfigOverrides, NeuronConfig, OllamaProvider, SqliteNoteStore,
};

/// Global flags that feed configuration resolution.
pub struct AppOptions {
    pub config_file: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Shared application state for CLI commands
pub struct App {
    pub config: NeuronConfig,
    conn: Connection,
}

impl App {
    /// Resolves configuration, starts logging and opens the database.
    pub fn new(options: AppOptions) -> Result<Self> {
        let mut config = NeuronConfig::load(options.config_file.as_deref())
            .context("Failed to load configuration")?;
        config.apply_overrides(ConfigOverrides {
            db_path: options.db_path,
            log_level: options.log_level,
        });
        config.validate().context("Invalid configuration")?;

        if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
            eprintln!("warning: file logging disabled: {err}");
        }

        let conn = open_db(&config.db_path).with_context(|| {
            format!("Failed to open database at {}", config.db_path.display())
        })?;
        info!(
            "event=cli_start module=cli status=ok version={}",
            neuron_core::core_version()
        );

        Ok(Self { config, conn })
    }

    /// Note store over the process connection.
    pub fn store(&mut self) -> Result<SqliteNoteStore<'_>> {
        SqliteNoteStore::try_new(&mut self.conn).context("Database schema is not usable")
    }

    /// Question provider built from the `[provider]` config section.
    pub fn provider(&self) -> Result<OllamaProvider> {
        let provider = &self.config.provider;
        OllamaProvider::new(&provider.url, &provider.model, provider.timeout())
            .context("Failed to set up the question provider")
    }
}
