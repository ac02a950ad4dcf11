//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use deck_core::{DeckError, TemplateRegistry, ThemeRegistry, DEFAULT_THEME_ID};
use deck_protocol::AutosaveConfig;

/// Default port for the deck server.
pub const DEFAULT_PORT: u16 = 9473;

/// Default autosave quiet period in milliseconds.
pub const DEFAULT_AUTOSAVE_MS: u64 = 2500;

/// Errors loading registry files named in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not a valid registry document.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: DeckError,
    },
}

/// Command-line arguments for deck-server.
#[derive(Debug, Clone, Parser)]
#[command(name = "deck-server")]
#[command(about = "Hosts the deck slide view over WebSocket")]
#[command(version)]
pub struct Config {
    /// Port to listen on (localhost only)
    #[arg(long, env = "DECK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory for slide snapshots; in-memory storage when absent
    #[arg(long, env = "DECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Quiet period before an autosave, in milliseconds
    #[arg(long, env = "DECK_AUTOSAVE_MS", default_value_t = DEFAULT_AUTOSAVE_MS)]
    pub autosave_ms: u64,

    /// JSON file replacing the built-in templates
    #[arg(long, env = "DECK_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// JSON file replacing the built-in themes
    #[arg(long, env = "DECK_THEMES")]
    pub themes: Option<PathBuf>,

    /// Theme used when a view does not name one
    #[arg(long, env = "DECK_DEFAULT_THEME", default_value = DEFAULT_THEME_ID)]
    pub default_theme: String,
}

impl Config {
    /// Socket address to bind. Always loopback.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.port))
    }

    /// Autosave settings derived from the flags.
    #[must_use]
    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig {
            quiet_period: Duration::from_millis(self.autosave_ms),
        }
    }

    /// Load the template registry, from file or built in.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configured file is unreadable or invalid.
    pub async fn load_templates(&self) -> Result<TemplateRegistry, ConfigError> {
        match &self.templates {
            Some(path) => {
                let json = read(path).await?;
                TemplateRegistry::from_json(&json).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })
            }
            None => Ok(TemplateRegistry::builtin()),
        }
    }

    /// Load the theme registry, from file or built in.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configured file is unreadable or invalid.
    pub async fn load_themes(&self) -> Result<ThemeRegistry, ConfigError> {
        match &self.themes {
            Some(path) => {
                let json = read(path).await?;
                ThemeRegistry::from_json(&json, self.default_theme.clone()).map_err(|source| {
                    ConfigError::Parse {
                        path: path.clone(),
                        source,
                    }
                })
            }
            None => Ok(ThemeRegistry::builtin().with_default(self.default_theme.clone())),
        }
    }
}

async fn read(path: &Path) -> Result<String, ConfigError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}
