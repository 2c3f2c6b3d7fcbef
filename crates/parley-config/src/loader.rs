//! Layered configuration loading.
//!
//! Layers apply in call order; environment overrides always apply last.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, LogFormat, ParleyConfig};

/// Builds a [`ParleyConfig`] from defaults, files and environment variables.
///
/// A file only has to name the keys it changes: each layer is merged field by
/// field over the previous one, and the merged result must still fit the
/// schema, so unknown keys are rejected wherever they come from.
///
/// # Example
///
/// ```no_run
/// use parley_config::ConfigLoader;
///
/// # fn main() -> Result<(), parley_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("parley.toml")?
///     .with_dotenv()?
///     .with_env_prefix("PARLEY")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: ParleyConfig,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
    dotenv_vars: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Create a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = ParleyConfig::default();
        self
    }

    /// Start from [`ParleyConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = ParleyConfig::development();
        self
    }

    /// Start from [`ParleyConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = ParleyConfig::production();
        self
    }

    /// Merge a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or unreadable, has another extension,
    /// does not parse, or contains keys the schema does not know.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                ConfigError::UnsupportedFormat(path.display().to_string())
            })?;

        self.with_string(&content, &format)
    }

    /// Merge a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file is present.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merge configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Fails on unsupported formats, parse errors and unknown keys.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(format.to_string()))
            }
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Enable `PREFIX__SECTION__KEY` overrides, e.g.
    /// `PARLEY__SERVER__HTTP_ADDR` or `PARLEY__TELEMETRY__LOGGING__LEVEL`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Read `.env` from the current directory or its parents, if present.
    ///
    /// Its entries rank below real environment variables and do not modify
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => self.collect_dotenv(iter),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Read a specific dotenv file.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            if e.not_found() {
                ConfigError::file_not_found(path)
            } else {
                ConfigError::Dotenv(format!("{}: {e}", path.display()))
            }
        })?;
        self.collect_dotenv(iter)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Fails on unparsable or unknown overrides and on
    /// [`ParleyConfig::validate`] errors.
    pub fn load(mut self) -> Result<ParleyConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the merged configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ParleyConfig {
        self.config
    }

    fn collect_dotenv<I>(mut self, iter: I) -> Result<Self, ConfigError>
    where
        I: Iterator<Item = dotenvy::Result<(String, String)>>,
    {
        for item in iter {
            let pair = item.map_err(|e| ConfigError::Dotenv(e.to_string()))?;
            self.dotenv_vars.push(pair);
        }
        Ok(self)
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");

        // Real environment wins over .env entries.
        let mut vars: BTreeMap<String, String> = std::mem::take(&mut self.dotenv_vars)
            .into_iter()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        let source: Vec<(String, String)> = match self.env_vars.take() {
            Some(vars) => vars,
            None => env::vars().collect(),
        };
        vars.extend(source.into_iter().filter(|(k, _)| k.starts_with(&marker)));

        for (key, value) in &vars {
            self.apply_env_var(key, value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::bad_env_var(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "MESSAGES_PATH"] => config.server.messages_path = value.to_string(),
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_integer(key, value)?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_integer(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_integer(key, value)?;
            }

            ["BOT", "APP_ID"] => config.bot.app_id = value.to_string(),
            ["BOT", "BEARER_TOKEN"] => {
                config.bot.bearer_token = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            ["BOT", "ALLOWED_TENANTS"] => {
                config.bot.allowed_tenants = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["BOT", "TRUST_ACTIVITY_ID"] => {
                config.bot.trust_activity_id = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_env_var(key, "expected boolean"))?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
            ["TELEMETRY", "ENVIRONMENT"] => config.telemetry.environment = value.to_string(),
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::bad_env_var(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_env_var(key, "expected boolean"))?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => {
                config.telemetry.metrics.addr = value.to_string();
            }

            [section @ .., field] => {
                return Err(ConfigError::unknown_key(
                    field.to_lowercase(),
                    section.join(".").to_lowercase(),
                ))
            }
            [] => return Err(ConfigError::bad_env_var(key, "invalid key format")),
        }

        Ok(())
    }
}

fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, layer) => *slot = layer,
    }
}

fn parse_integer<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::bad_env_var(key, "expected integer"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
