// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load and validate hintsh shell configuration.
// Author: Lukas Bower

//! Load and validate hintsh shell configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables, command-line flags. The last two arrive as [`ConfigOverrides`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hintsh_core::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_HISTORY_PATH, DEFAULT_MODEL, DEFAULT_PROMPT,
    DEFAULT_SOCKET_PATH, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT, DEFAULT_TIMEOUT_MS,
};
use serde::Deserialize;
use thiserror::Error;

use crate::suggest::SuggestionClient;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hintsh.toml";

/// Largest accepted suggestion timeout.
pub const MAX_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while parsing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is not valid TOML or does not match the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its accepted range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// Human-readable constraint.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Complete shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Prompt printed before each line.
    pub prompt: String,
    /// Suggestion service settings.
    pub suggest: SuggestConfig,
    /// History store settings.
    pub history: HistoryConfig,
}

/// Suggestion service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuggestConfig {
    /// Query the service at all.
    pub enabled: bool,
    /// Try the Unix-domain socket before TCP.
    pub unix_socket: bool,
    /// Unix-domain socket path.
    pub socket_path: PathBuf,
    /// TCP fallback host.
    pub tcp_host: String,
    /// TCP fallback port.
    pub tcp_port: u16,
    /// Model identifier sent with each request.
    pub model: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

/// History store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// SQLite database path.
    pub path: PathBuf,
    /// Rows printed by `history` without an argument.
    pub default_limit: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_owned(),
            suggest: SuggestConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unix_socket: true,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            tcp_host: DEFAULT_TCP_HOST.to_owned(),
            tcp_port: DEFAULT_TCP_PORT,
            model: DEFAULT_MODEL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_PATH),
            default_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Values supplied by the environment or command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Override the prompt.
    pub prompt: Option<String>,
    /// Force suggestions on or off.
    pub suggest_enabled: Option<bool>,
    /// Force the Unix-domain socket attempt on or off.
    pub unix_socket: Option<bool>,
    /// Override the socket path.
    pub socket_path: Option<PathBuf>,
    /// Override the TCP host.
    pub tcp_host: Option<String>,
    /// Override the TCP port.
    pub tcp_port: Option<u16>,
    /// Override the model identifier.
    pub model: Option<String>,
    /// Override the timeout.
    pub timeout_ms: Option<u64>,
    /// Override the history database path.
    pub history_path: Option<PathBuf>,
}

impl ShellConfig {
    /// Apply overrides and re-validate.
    pub fn with_overrides(self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut updated = self;
        if let Some(value) = &overrides.prompt {
            updated.prompt = value.clone();
        }
        if let Some(value) = overrides.suggest_enabled {
            updated.suggest.enabled = value;
        }
        if let Some(value) = overrides.unix_socket {
            updated.suggest.unix_socket = value;
        }
        if let Some(value) = &overrides.socket_path {
            updated.suggest.socket_path = value.clone();
        }
        if let Some(value) = &overrides.tcp_host {
            updated.suggest.tcp_host = value.clone();
        }
        if let Some(value) = overrides.tcp_port {
            updated.suggest.tcp_port = value;
        }
        if let Some(value) = &overrides.model {
            updated.suggest.model = value.clone();
        }
        if let Some(value) = overrides.timeout_ms {
            updated.suggest.timeout_ms = value;
        }
        if let Some(value) = &overrides.history_path {
            updated.history.path = value.clone();
        }
        updated.validate()?;
        Ok(updated)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let suggest = &self.suggest;
        if suggest.timeout_ms == 0 || suggest.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::invalid(
                "suggest.timeout_ms",
                format!("must be within 1..={MAX_TIMEOUT_MS}"),
            ));
        }
        if suggest.tcp_host.trim().is_empty() {
            return Err(ConfigError::invalid("suggest.tcp_host", "must not be empty"));
        }
        if suggest.tcp_port == 0 {
            return Err(ConfigError::invalid("suggest.tcp_port", "must not be 0"));
        }
        if suggest.model.trim().is_empty() {
            return Err(ConfigError::invalid("suggest.model", "must not be empty"));
        }
        if suggest.unix_socket && suggest.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "suggest.socket_path",
                "must not be empty while unix_socket is enabled",
            ));
        }
        if self.history.default_limit == 0 {
            return Err(ConfigError::invalid(
                "history.default_limit",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Per-attempt suggestion timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.suggest.timeout_ms)
    }

    /// Build the suggestion client, or `None` when suggestions are disabled.
    #[must_use]
    pub fn suggestion_client(&self) -> Option<SuggestionClient> {
        let suggest = &self.suggest;
        if !suggest.enabled {
            return None;
        }
        let socket_path = suggest
            .unix_socket
            .then(|| suggest.socket_path.clone());
        Some(
            SuggestionClient::new(suggest.tcp_host.clone(), suggest.tcp_port)
                .with_socket_path(socket_path)
                .with_model(suggest.model.clone())
                .with_timeout(self.timeout()),
        )
    }
}

/// Parse and validate configuration text.
pub fn parse_config(text: &str) -> Result<ShellConfig, ConfigError> {
    let config: ShellConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Read configuration from `path`.
pub fn load_config(path: &Path) -> Result<ShellConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("failed to load config {}", path.display()))
}

/// Read configuration from `path` if it exists, otherwise use defaults.
pub fn load_config_or_default(path: &Path) -> Result<ShellConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = parse_config(
            r#"
prompt = "$ "

[suggest]
tcp_port = 8888
model = "fuzzy"
"#,
        )
        .unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.suggest.tcp_port, 8888);
        assert_eq!(config.suggest.model, "fuzzy");
        assert_eq!(config.suggest.tcp_host, DEFAULT_TCP_HOST);
        assert_eq!(config.history.default_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_config("[suggest]\nport = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        let err = parse_config("[suggest]\ntimeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("suggest.timeout_ms"), "{err}");
        let overrides = ConfigOverrides {
            timeout_ms: Some(MAX_TIMEOUT_MS + 1),
            ..ConfigOverrides::default()
        };
        assert!(ShellConfig::default().with_overrides(&overrides).is_err());
    }

    #[test]
    fn overrides_take_precedence_over_file_values() {
        let config = parse_config("[suggest]\ntcp_port = 8888\nmodel = \"file\"\n").unwrap();
        let overrides = ConfigOverrides {
            tcp_port: Some(7777),
            history_path: Some(PathBuf::from("/tmp/h.db")),
            ..ConfigOverrides::default()
        };
        let config = config.with_overrides(&overrides).unwrap();
        assert_eq!(config.suggest.tcp_port, 7777);
        assert_eq!(config.suggest.model, "file");
        assert_eq!(config.history.path, PathBuf::from("/tmp/h.db"));
    }

    #[test]
    fn disabled_suggestions_build_no_client() {
        let overrides = ConfigOverrides {
            suggest_enabled: Some(false),
            ..ConfigOverrides::default()
        };
        let config = ShellConfig::default().with_overrides(&overrides).unwrap();
        assert!(config.suggestion_client().is_none());
    }

    #[test]
    fn unix_socket_toggle_controls_transports() {
        let overrides = ConfigOverrides {
            unix_socket: Some(false),
            ..ConfigOverrides::default()
        };
        let config = ShellConfig::default().with_overrides(&overrides).unwrap();
        let client = config.suggestion_client().unwrap();
        assert_eq!(client.transports().len(), 1);
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ShellConfig::default());
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }
}
