//! Configuration for the vocabulary trainer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vocab-trainer")
            .map(|d| d.config_dir().join("config.toml"))
    }

    pub fn db_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vocab-trainer")
            .map(|d| d.data_dir().join("vocab.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Learner display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// New words introduced per day.
    #[serde(default = "default_n_words")]
    pub n_words: usize,
    /// Upper bound on daily session size.
    #[serde(default = "default_max_vocabs")]
    pub max_vocabs: usize,
    /// Reminder times as HH:MM strings; consumed by an external
    /// notifier, validated on load.
    #[serde(default)]
    pub reminders: Vec<String>,
}

fn default_name() -> String { "learner".to_string() }
fn default_n_words() -> usize { 5 }
fn default_max_vocabs() -> usize { 30 }

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            n_words: default_n_words(),
            max_vocabs: default_max_vocabs(),
            reminders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// Optional JSON vocabulary file imported on startup.
    #[serde(default)]
    pub vocab_file: Option<PathBuf>,
}
