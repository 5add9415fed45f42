//! Configuration loading and management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workflow engine settings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Document preview settings
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

/// Workflow engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Fixed endpoint the start signal is POSTed to; every later call
    /// targets whatever resume URL the engine issued last
    #[serde(default = "default_start_url")]
    pub start_url: String,
}

fn default_start_url() -> String {
    "http://localhost:5678/webhook/offer-letter".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
        }
    }
}

/// Document preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// File the generated letter is written to for the browser to render
    #[serde(default = "default_preview_file")]
    pub file: PathBuf,
}

fn default_preview_file() -> PathBuf {
    PathBuf::from("offer-letter-preview.html")
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            file: default_preview_file(),
        }
    }
}

impl Config {
    /// Load configuration from file or default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(|| {
                // Try .letterflow/config.toml in current directory
                let local = PathBuf::from(".letterflow/config.toml");
                if local.exists() {
                    return Some(local);
                }

                // Try ~/.letterflow/config.toml
                dirs::home_dir().map(|h| h.join(".letterflow/config.toml"))
            });

        match config_path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(&p)?;
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            _ => Ok(Config::default()),
        }
    }
}

/// Initialize the .letterflow directory with a default config
pub fn init() -> Result<PathBuf> {
    init_at(Path::new(".letterflow"))
}

fn init_at(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        let default_config = Config::default();
        let config_str = toml::to_string_pretty(&default_config)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(&config_path, config_str)?;
    }

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.workflow.start_url.starts_with("http://localhost:5678"));
        assert_eq!(
            config.preview.file,
            PathBuf::from("offer-letter-preview.html")
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[workflow]\nstart_url = \"https://engine.example/start\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.workflow.start_url, "https://engine.example/start");
        // Unspecified sections fall back to defaults
        assert_eq!(
            config.preview.file,
            PathBuf::from("offer-letter-preview.html")
        );
    }

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(".letterflow");

        let path = init_at(&target).unwrap();

        assert!(path.exists());
        let config: Config =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.workflow.start_url, default_start_url());
    }
}
