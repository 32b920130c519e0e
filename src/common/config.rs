use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG: &str = include_str!("../../node-layout.default.toml");

pub fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".node-layout")
}

pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("node-layout")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// Directory for the on-disk store. Falls back to [`data_dir`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Total byte budget across all keys. Unlimited when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
    /// Retention counts tried in order when a node-layout save hits the quota.
    #[serde(default = "default_node_retention_steps")]
    pub node_retention_steps: Vec<usize>,
    /// Retention counts tried in order when a preset save hits the quota.
    #[serde(default = "default_preset_retention_steps")]
    pub preset_retention_steps: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Rows between members restored by a dissolve, never less than the group
    /// height. `None` uses the group height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissolve_row_step: Option<u32>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            quota_bytes: None,
            node_retention_steps: default_node_retention_steps(),
            preset_retention_steps: default_preset_retention_steps(),
        }
    }
}

impl StorageSettings {
    pub fn resolved_data_dir(&self) -> PathBuf { self.data_dir.clone().unwrap_or_else(data_dir) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.quota_bytes == Some(0) {
            issues.push("quota_bytes must be positive when set".to_string());
        }

        for (name, steps) in [
            ("node_retention_steps", &self.node_retention_steps),
            ("preset_retention_steps", &self.preset_retention_steps),
        ] {
            issues.extend(validate_retention_steps(name, steps));
        }

        issues
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.dissolve_row_step == Some(0) {
            issues.push("dissolve_row_step must be at least 1 when set".to_string());
        }

        issues
    }
}

fn validate_retention_steps(name: &str, steps: &[usize]) -> Vec<String> {
    let mut issues = Vec::new();

    if steps.is_empty() {
        issues.push(format!("{name} must contain at least one step"));
        return issues;
    }
    if steps.contains(&0) {
        issues.push(format!("{name} must not contain 0, got {steps:?}"));
    }
    if steps.windows(2).any(|pair| pair[1] >= pair[0]) {
        issues.push(format!("{name} must be strictly decreasing, got {steps:?}"));
    }

    issues
}

fn default_node_retention_steps() -> Vec<usize> { vec![10, 5] }

fn default_preset_retention_steps() -> Vec<usize> { vec![20, 10, 5] }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise the embedded defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            Self::parse(DEFAULT_CONFIG)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.storage.validate().into_iter().map(|i| format!("storage.{i}")));
        issues.extend(self.layout.validate().into_iter().map(|i| format!("layout.{i}")));

        issues
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => bail!("{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_default_impl() {
        let parsed = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_config_validate_empty_is_valid() {
        let config = Config::parse("").unwrap();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = Config::parse("[storage]\nretention = 3\n").unwrap_err();
        assert!(err.to_string().contains("retention"));
    }

    #[test]
    fn test_retention_steps_must_decrease() {
        let config = Config::parse("[storage]\npreset_retention_steps = [5, 10]\n").unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("storage.preset_retention_steps"));
    }

    #[test]
    fn test_retention_steps_reject_zero_and_empty() {
        let mut settings = StorageSettings::default();
        settings.node_retention_steps = vec![];
        settings.preset_retention_steps = vec![3, 0];
        let issues = settings.validate();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_layout_settings_validation() {
        let settings = LayoutSettings { dissolve_row_step: Some(0) };
        assert_eq!(settings.validate().len(), 1);
        assert!(LayoutSettings { dissolve_row_step: Some(2) }.validate().is_empty());
    }

    #[test]
    fn test_quota_zero_is_invalid() {
        let config = Config::parse("[storage]\nquota_bytes = 0\n").unwrap();
        assert_eq!(config.validate(), vec!["storage.quota_bytes must be positive when set"]);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.storage.quota_bytes = Some(4096);
        config.layout.dissolve_row_step = Some(3);
        config.save(&path).unwrap();

        assert_eq!(Config::read(&path).unwrap(), config);
    }

    #[test]
    fn test_read_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
