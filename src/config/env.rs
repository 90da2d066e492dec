//! Environment variable configuration
//!
//! Connection settings use the unprefixed names the GitHub tooling
//! conventionally reads (`BASE_URL`, `GITHUB_TOKEN`, `GITHUB_API_VERSION`);
//! client tuning uses the `GIST_TESTS_` prefix.

use std::env;

/// Prefix for tuning variables
pub const ENV_PREFIX: &str = "GIST_TESTS";

pub const BASE_URL_VAR: &str = "BASE_URL";
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const API_VERSION_VAR: &str = "GITHUB_API_VERSION";

/// Values read from the environment; unset or empty variables are `None`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// BASE_URL
    pub base_url: Option<String>,
    /// GITHUB_TOKEN
    pub token: Option<String>,
    /// GITHUB_API_VERSION
    pub api_version: Option<String>,
    /// GIST_TESTS_TIMEOUT, in seconds
    pub timeout: Option<f64>,
    /// GIST_TESTS_RETRIES
    pub retries: Option<u32>,
    /// GIST_TESTS_BACKOFF
    pub backoff: Option<f64>,
    /// GIST_TESTS_VERIFY_TLS
    pub verify_tls: Option<bool>,
    /// GIST_TESTS_CA_BUNDLE
    pub ca_bundle: Option<String>,
    /// GIST_TESTS_REPORT_DIR
    pub report_dir: Option<String>,
    /// GIST_TESTS_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            base_url: get_var(BASE_URL_VAR),
            token: get_var(TOKEN_VAR),
            api_version: get_var(API_VERSION_VAR),
            timeout: get_env_parse("TIMEOUT"),
            retries: get_env_parse("RETRIES"),
            backoff: get_env_parse("BACKOFF"),
            verify_tls: get_env_bool("VERIFY_TLS"),
            ca_bundle: get_env("CA_BUNDLE"),
            report_dir: get_env("REPORT_DIR"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Print current environment configuration; the token is never shown
    pub fn print_summary(&self) {
        let token = self.token.as_ref().map(|_| "<set>");
        println!("Environment Configuration:");
        println!("  {BASE_URL_VAR}:                {:?}", self.base_url);
        println!("  {TOKEN_VAR}:            {:?}", token);
        println!("  {API_VERSION_VAR}:      {:?}", self.api_version);
        println!("  {ENV_PREFIX}_TIMEOUT:      {:?}", self.timeout);
        println!("  {ENV_PREFIX}_RETRIES:      {:?}", self.retries);
        println!("  {ENV_PREFIX}_BACKOFF:      {:?}", self.backoff);
        println!("  {ENV_PREFIX}_VERIFY_TLS:   {:?}", self.verify_tls);
        println!("  {ENV_PREFIX}_CA_BUNDLE:    {:?}", self.ca_bundle);
        println!("  {ENV_PREFIX}_REPORT_DIR:   {:?}", self.report_dir);
        println!("  {ENV_PREFIX}_CONFIG:       {:?}", self.config_file);
    }
}

fn get_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    get_var(&format!("{ENV_PREFIX}_{name}"))
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Scoped environment overrides for tests
#[cfg(test)]
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(self, url: impl Into<String>) -> Self {
        self.set(BASE_URL_VAR, url)
    }

    pub fn token(self, token: impl Into<String>) -> Self {
        self.set(TOKEN_VAR, token)
    }

    pub fn api_version(self, version: impl Into<String>) -> Self {
        self.set(API_VERSION_VAR, version)
    }

    pub fn timeout(self, secs: f64) -> Self {
        self.set(&format!("{ENV_PREFIX}_TIMEOUT"), secs.to_string())
    }

    pub fn retries(self, retries: u32) -> Self {
        self.set(&format!("{ENV_PREFIX}_RETRIES"), retries.to_string())
    }

    pub fn verify_tls(self, verify: bool) -> Self {
        self.set(&format!("{ENV_PREFIX}_VERIFY_TLS"), verify.to_string())
    }

    pub fn report_dir(self, dir: impl Into<String>) -> Self {
        self.set(&format!("{ENV_PREFIX}_REPORT_DIR"), dir)
    }

    pub fn config_file(self, path: impl Into<String>) -> Self {
        self.set(&format!("{ENV_PREFIX}_CONFIG"), path)
    }

    /// Remove a variable for the lifetime of the guard
    pub fn unset(mut self, key: &str) -> Self {
        self.vars.push((key.to_string(), None));
        self
    }

    fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.push((key.to_string(), Some(value.into())));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        // Reverse order so a key set twice ends at its original value
        for (key, value) in self.previous.iter().rev() {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all supported environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {BASE_URL_VAR}                 API root (default https://api.github.com)");
    println!("  {TOKEN_VAR}             Personal access token with the gist scope");
    println!("  {API_VERSION_VAR}       X-GitHub-Api-Version header (default 2022-11-28)");
    println!("  {ENV_PREFIX}_TIMEOUT       Request timeout in seconds (0 disables)");
    println!("  {ENV_PREFIX}_RETRIES       Transport retries per request");
    println!("  {ENV_PREFIX}_BACKOFF       Backoff factor in seconds");
    println!("  {ENV_PREFIX}_VERIFY_TLS    Verify TLS certificates (true/false)");
    println!("  {ENV_PREFIX}_CA_BUNDLE     Extra PEM bundle to trust");
    println!("  {ENV_PREFIX}_REPORT_DIR    Write request/response attachments here");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {TOKEN_VAR}=ghp_xxx");
    println!("  gist-api-tests run --scenario 1 --scenario 4");
}

/// Serializes tests that touch process-wide environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
