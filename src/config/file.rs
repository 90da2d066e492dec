//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./gist-api-tests.yaml",
    "./gist-api-tests.yml",
    "./.gist-api-tests.yaml",
    "~/.config/gist-api-tests/config.yaml",
];

/// Full configuration file structure
///
/// Every value is optional; whatever is missing falls through to the
/// built-in defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Connection settings
    #[serde(default)]
    pub api: ApiSection,

    /// HTTP client tuning
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Prefer `GITHUB_TOKEN`; a token in a checked-in file is easy to leak
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            api: ApiSection::default(),
            client: ClientSection::default(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load an explicit file, else the first standard location, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let path = expand_path(&path.to_string_lossy());
            return Ok((Self::load(&path)?, Some(path)));
        }
        match Self::find() {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_json_file(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != "1.0" {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if let Some(timeout) = self.client.timeout_secs {
            if !timeout.is_finite() || timeout < 0.0 {
                anyhow::bail!("client.timeout_secs must be a non-negative number, got {timeout}");
            }
        }
        if let Some(backoff) = self.client.backoff_factor {
            if !backoff.is_finite() || backoff < 0.0 {
                anyhow::bail!("client.backoff_factor must be a non-negative number, got {backoff}");
            }
        }
        if let Some(url) = &self.api.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("api.base_url must start with http:// or https://, got '{url}'");
            }
        }

        Ok(())
    }

    /// Example configuration, printed by `env --example`
    pub fn example() -> Self {
        Self {
            version: default_version(),
            api: ApiSection {
                base_url: Some("https://api.github.com".to_string()),
                api_version: Some("2022-11-28".to_string()),
                token: None,
            },
            client: ClientSection {
                timeout_secs: Some(30.0),
                retries: Some(3),
                backoff_factor: Some(0.3),
                verify_tls: Some(true),
                ca_bundle: None,
                report_dir: Some(PathBuf::from("./reports")),
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

/// Expand ~ to home directory
pub(crate) fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn is_json_file(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.api, ApiSection::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gist-api-tests.yaml");
        std::fs::write(
            &path,
            "api:\n  base_url: http://localhost:9000\nclient:\n  retries: 1\n  verify_tls: false\n",
        )
        .unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.client.retries, Some(1));
        assert_eq!(config.client.verify_tls, Some(false));
        assert_eq!(config.client.timeout_secs, None);
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"client": {"backoff_factor": 0.5}}"#).unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.client.backoff_factor, Some(0.5));
    }

    #[test]
    fn test_example_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("example.yaml");
        let example = ConfigFile::example();
        std::fs::write(&path, example.to_yaml().unwrap()).unwrap();

        assert_eq!(ConfigFile::load(&path).unwrap(), example);
    }

    #[test]
    fn test_validate_config() {
        let mut config = ConfigFile::default();
        config.client.backoff_factor = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.api.base_url = Some("api.github.com".to_string());
        assert!(config.validate().is_err());

        let config = ConfigFile {
            version: "2.0".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_explicit_missing_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(ConfigFile::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
