//! Layered configuration: defaults, optional file, `FIXHUB__*` environment

use crate::core::{Actor, Role};
use crate::error::{FixhubError, Result};
use config::{Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "FIXHUB";

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub workflow: WorkflowConfig,
    pub notifications: NotificationConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for one API operation, store access included
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                FixhubError::Config(config::ConfigError::Message(format!(
                    "invalid server address {}:{}: {e}",
                    self.host, self.port
                )))
            })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root directory of the file backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::from(".fixhub"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Commit attempts per operation before `Conflict` reaches the caller
    pub commit_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { commit_attempts: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    pub channel_capacity: usize,
    pub delivery_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Append-only JSON Lines audit file
    pub audit_log: Option<PathBuf>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: crate::events::DEFAULT_CHANNEL_CAPACITY,
            delivery_attempts: 3,
            retry_backoff_ms: 50,
            audit_log: None,
        }
    }
}

/// Identity bound to a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenGrant {
    /// Compared byte for byte against the presented bearer token
    pub token: String,
    pub actor: String,
    pub role: Role,
}

impl TokenGrant {
    #[must_use]
    pub fn new(token: impl Into<String>, actor: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            actor: actor.into(),
            role,
        }
    }

    #[must_use]
    pub fn to_actor(&self) -> Actor {
        Actor::new(self.actor.clone(), self.role)
    }
}

/// Bearer tokens are list entries rather than map keys: the config loader
/// lowercases keys, which would break mixed-case credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub tokens: Vec<TokenGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Default config file location, e.g. `~/.config/fixhub/config.yaml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "fixhub").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Load configuration from `path` (or the default location) and the
    /// environment
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            },
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(FixhubError::Config(config::ConfigError::Message(message)));

        if self.workflow.commit_attempts == 0 {
            return invalid("workflow.commit_attempts must be at least 1".to_string());
        }
        if self.notifications.channel_capacity == 0 {
            return invalid("notifications.channel_capacity must be at least 1".to_string());
        }
        if self.server.request_timeout_ms == 0 {
            return invalid("server.request_timeout_ms must be positive".to_string());
        }
        let mut seen = BTreeSet::new();
        for grant in &self.auth.tokens {
            if grant.token.trim().is_empty() {
                return invalid(format!("auth.tokens contains a blank token for {}", grant.actor));
            }
            if grant.actor.trim().is_empty() {
                return invalid(format!("auth.tokens grants a blank actor id ({})", grant.role));
            }
            if !seen.insert(grant.token.as_str()) {
                return invalid(format!("auth.tokens lists a token twice (actor {})", grant.actor));
            }
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
