//! Configuration module
//!
//! Settings are resolved once per session from four layers, highest first:
//! command line flags, environment variables, the config file, defaults.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

#[cfg(test)]
pub(crate) use env::{EnvBuilder, ENV_LOCK};

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::TlsVerification;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub use crate::api::DEFAULT_API_VERSION;

/// Connection settings for the API under test
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub token: Option<String>,
    pub api_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Settings {
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// HTTP client tuning
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// `None` disables the timeout
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub backoff_factor: f64,
    pub verify_tls: bool,
    pub ca_bundle: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            retries: 3,
            backoff_factor: 0.3,
            verify_tls: true,
            ca_bundle: None,
            report_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn tls(&self) -> TlsVerification {
        match (&self.ca_bundle, self.verify_tls) {
            (_, false) => TlsVerification::Disabled,
            (Some(bundle), true) => TlsVerification::CaBundle(bundle.clone()),
            (None, true) => TlsVerification::Enabled,
        }
    }
}

/// Values given on the command line
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub settings: Settings,
    pub client: ClientConfig,
    /// Config file that contributed, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Resolve from the process environment and config file
    pub fn load(overrides: Overrides) -> Result<Self> {
        let env = EnvConfig::load();
        let explicit = overrides
            .config_file
            .clone()
            .or_else(|| env.config_file.as_ref().map(PathBuf::from));
        let (file, source) = ConfigFile::discover(explicit.as_deref())?;

        let mut config = Self::resolve(&env, &file, overrides)?;
        config.source = source;
        Ok(config)
    }

    /// Merge the layers, highest precedence first
    pub fn resolve(env: &EnvConfig, file: &ConfigFile, overrides: Overrides) -> Result<Self> {
        let base_url = overrides
            .base_url
            .or_else(|| env.base_url.clone())
            .or_else(|| file.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!("Base URL must start with http:// or https://, got '{base_url}'");
        }

        let settings = Settings {
            base_url,
            token: env.token.clone().or_else(|| file.api.token.clone()),
            api_version: env
                .api_version
                .clone()
                .or_else(|| file.api.api_version.clone())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        };

        let defaults = ClientConfig::default();
        let timeout = match env.timeout.or(file.client.timeout_secs) {
            Some(secs) if !secs.is_finite() || secs < 0.0 => {
                anyhow::bail!("Timeout must be a non-negative number of seconds, got {secs}")
            }
            Some(secs) if secs == 0.0 => None,
            Some(secs) => Some(Duration::from_secs_f64(secs)),
            None => defaults.timeout,
        };
        let backoff_factor = env
            .backoff
            .or(file.client.backoff_factor)
            .unwrap_or(defaults.backoff_factor);
        if !backoff_factor.is_finite() || backoff_factor < 0.0 {
            anyhow::bail!("Backoff factor must be non-negative, got {backoff_factor}");
        }

        let client = ClientConfig {
            timeout,
            retries: env
                .retries
                .or(file.client.retries)
                .unwrap_or(defaults.retries),
            backoff_factor,
            verify_tls: env
                .verify_tls
                .or(file.client.verify_tls)
                .unwrap_or(defaults.verify_tls),
            ca_bundle: env
                .ca_bundle
                .as_ref()
                .map(PathBuf::from)
                .or_else(|| file.client.ca_bundle.clone()),
            report_dir: overrides
                .report_dir
                .or_else(|| env.report_dir.as_ref().map(PathBuf::from))
                .or_else(|| file.client.report_dir.clone()),
        };

        Ok(Self {
            settings,
            client,
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config =
            Config::resolve(&EnvConfig::default(), &ConfigFile::default(), Overrides::default())
                .unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.client, ClientConfig::default());
        assert_eq!(config.client.tls(), TlsVerification::Enabled);
    }

    #[test]
    fn test_precedence() {
        let mut file = ConfigFile::default();
        file.api.base_url = Some("http://from-file".to_string());
        file.api.api_version = Some("file-version".to_string());
        file.client.retries = Some(1);
        file.client.backoff_factor = Some(2.0);

        let env = EnvConfig {
            base_url: Some("http://from-env".to_string()),
            retries: Some(7),
            ..Default::default()
        };

        let config = Config::resolve(&env, &file, Overrides::default()).unwrap();
        assert_eq!(config.settings.base_url, "http://from-env");
        assert_eq!(config.settings.api_version, "file-version");
        assert_eq!(config.client.retries, 7);
        assert_eq!(config.client.backoff_factor, 2.0);

        let overrides = Overrides {
            base_url: Some("http://from-cli".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(&env, &file, overrides).unwrap();
        assert_eq!(config.settings.base_url, "http://from-cli");
    }

    #[test]
    fn test_zero_timeout_disables() {
        let env = EnvConfig {
            timeout: Some(0.0),
            ..Default::default()
        };
        let config = Config::resolve(&env, &ConfigFile::default(), Overrides::default()).unwrap();
        assert_eq!(config.client.timeout, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let env = EnvConfig {
            base_url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        assert!(Config::resolve(&env, &ConfigFile::default(), Overrides::default()).is_err());

        let env = EnvConfig {
            timeout: Some(-1.0),
            ..Default::default()
        };
        assert!(Config::resolve(&env, &ConfigFile::default(), Overrides::default()).is_err());
    }

    #[test]
    fn test_tls_modes() {
        let mut client = ClientConfig {
            ca_bundle: Some(PathBuf::from("/etc/ssl/corp.pem")),
            ..Default::default()
        };
        assert_eq!(
            client.tls(),
            TlsVerification::CaBundle(PathBuf::from("/etc/ssl/corp.pem"))
        );
        client.verify_tls = false;
        assert_eq!(client.tls(), TlsVerification::Disabled);
    }

    #[test]
    fn test_settings_debug_hides_token() {
        let settings = Settings {
            token: Some("ghp_secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{settings:?}").contains("ghp_secret"));
    }

    #[test]
    fn test_load_reads_env_and_explicit_file() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "client:\n  retries: 0\n").unwrap();

        let _guard = EnvBuilder::new()
            .token("ghp_env")
            .config_file(path.to_string_lossy())
            .unset("BASE_URL")
            .unset("GITHUB_API_VERSION")
            .apply_scoped();

        let config = Config::load(Overrides::default()).unwrap();
        assert_eq!(config.settings.token.as_deref(), Some("ghp_env"));
        assert_eq!(config.settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.retries, 0);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }
}
