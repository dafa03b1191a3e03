//! Process configuration loaded from YAML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::profile::DEFAULT_PROFILE;

pub const CONFIG_PATH_ENV: &str = "ASSAYER_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeConfig {
    /// Kubeconfig context; the current context is used when unset.
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    pub status_retries: u32,
    pub error_backoff_base_secs: u64,
    pub error_backoff_max_secs: u64,
    pub resync_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            status_retries: 5,
            error_backoff_base_secs: 5,
            error_backoff_max_secs: 300,
            resync_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportsConfig {
    pub directory: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsConfig {
    pub profile: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssayerConfig {
    pub kube: KubeConfig,
    pub controller: ControllerConfig,
    pub reports: ReportsConfig,
    pub defaults: DefaultsConfig,
}

impl AssayerConfig {
    /// Loads the configuration at `path`. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// `ASSAYER_CONFIG_PATH`, then `$HOME/.assayer/config.yaml`, then
    /// `assayer-config.yaml` in the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }

        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(".assayer").join("config.yaml");
        }

        PathBuf::from("assayer-config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AssayerConfig::from_yaml(
            r#"
controller:
  statusRetries: 8
kube:
  context: staging
"#,
        )
        .unwrap();
        assert_eq!(config.controller.status_retries, 8);
        assert_eq!(config.controller.resync_secs, 300);
        assert_eq!(config.kube.context.as_deref(), Some("staging"));
        assert_eq!(config.defaults.profile, DEFAULT_PROFILE);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssayerConfig::load_from_path(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, AssayerConfig::default());
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "controller: [").unwrap();
        let err = AssayerConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }
}
