//! Configuration file support for zwo.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/zwo/config.toml`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Locations of the reference catalog documents
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_tag_attr_usage")]
    pub tag_attr_usage: PathBuf,

    #[serde(default = "default_descriptions")]
    pub descriptions: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tag_attr_usage: default_tag_attr_usage(),
            descriptions: default_descriptions(),
        }
    }
}

/// Where compiled workouts are written
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Metadata used when a plan or command line leaves it out
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default = "default_sport")]
    pub sport: String,

    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
            sport: default_sport(),
            tags: default_tags(),
        }
    }
}

// Default value functions
const REFERENCE_DIR: &str = "sub/zwift-workout-file-reference";

fn default_tag_attr_usage() -> PathBuf {
    PathBuf::from(REFERENCE_DIR).join("tag_attr_usage.json")
}

fn default_descriptions() -> PathBuf {
    PathBuf::from(REFERENCE_DIR).join("descriptions.yaml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("workouts")
}

fn default_author() -> String {
    "creating-zwift-workout".into()
}

fn default_sport() -> String {
    "bike".into()
}

fn default_tags() -> Vec<String> {
    vec!["CUSTOM".into()]
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(config_path) if config_path.exists() => Self::load_from(&config_path),
            config_path => {
                tracing::info!(
                    "No config file found at {:?}, using defaults",
                    config_path
                );
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("zwo").join("config.toml"))
    }
}
