//! Runtime configuration loaded from `config.toml`.
//!
//! Every field has a default, so a missing file (or a file that only sets a
//! couple of keys) still yields a complete configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pages::AppVariant;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub export: ExportConfig,
    pub classifier: ClassifierConfig,
    pub plant: PlantConfig,
    pub game: GameConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection url, e.g. `sqlite://emotion_lab.db?mode=rwc`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://emotion_lab.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Additive (Laplace) smoothing for the Naive Bayes feature counts
    pub alpha: f64,
    /// Optional `text,emotion` CSV used instead of the built-in examples
    pub corpus_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            corpus_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            hidden_units: 5,
            learning_rate: 0.001,
            max_iter: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub variant: AppVariant,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using default configuration", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [game]
            variant = "plain"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.game.variant, AppVariant::Plain);
        assert_eq!(config.plant.hidden_units, 5);
        assert!((config.classifier.alpha - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
