//! Process-wide configuration.
//!
//! Every field has a built-in default. A KDL file may override any of them;
//! the webhook secret only ever comes from the environment.

use autodeploy_core::WebhookSecret;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{ConfigError, ConfigResult, parse_config};

/// Environment variable holding the shared webhook secret.
pub const SECRET_ENV: &str = "GITHUB_WEBHOOKS_SECRET";

/// Immutable configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub target: TargetConfig,
    pub remote: RemoteConfig,
    pub logs: LogConfig,
    pub secret: WebhookSecret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Route GitHub posts deliveries to.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            path: "/github".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// The one repository and branch that trigger a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub repository: String,
    pub branch: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            repository: "Nettverksdagen-2".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// How a deploy is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Run the deploy script on the remote host over ssh.
    #[default]
    Ssh,
    /// Log the intent to deploy and do nothing else.
    Noop,
}

impl std::fmt::Display for DeployMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployMode::Ssh => write!(f, "ssh"),
            DeployMode::Noop => write!(f, "noop"),
        }
    }
}

impl std::str::FromStr for DeployMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssh" => Ok(DeployMode::Ssh),
            "noop" | "dry-run" => Ok(DeployMode::Noop),
            _ => Err(format!("unknown deploy mode: {}", s)),
        }
    }
}

/// Where and how the deploy script runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub mode: DeployMode,
    pub user: String,
    pub host: String,
    /// Directory on the remote host the script is run from.
    pub workdir: String,
    pub script: String,
    /// Local ssh binary.
    pub ssh_program: String,
    /// Extra `-o` options passed to ssh.
    pub ssh_options: Vec<String>,
    /// Upper bound on a single deploy.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mode: DeployMode::Ssh,
            user: "sigtot".to_string(),
            host: "nvdagen.no".to_string(),
            workdir: "~/Nettverksdagen-2".to_string(),
            script: "autodeploy.sh".to_string(),
            ssh_program: "ssh".to_string(),
            ssh_options: Vec::new(),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl RemoteConfig {
    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Command line executed by the remote shell.
    pub fn remote_command(&self) -> String {
        format!("cd {} && ./{}", self.workdir, self.script)
    }
}

/// Locations of the two append-only log files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub requests: String,
    pub deploys: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            requests: "requests.log".to_string(),
            deploys: "webhooks.log".to_string(),
        }
    }
}

impl LogConfig {
    pub fn request_log_path(&self) -> PathBuf {
        self.dir.join(&self.requests)
    }

    pub fn deploy_log_path(&self) -> PathBuf {
        self.dir.join(&self.deploys)
    }
}

impl Config {
    /// Built-in defaults with the given secret.
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            server: ServerConfig::default(),
            target: TargetConfig::default(),
            remote: RemoteConfig::default(),
            logs: LogConfig::default(),
            secret,
        }
    }

    /// Load configuration for the running process.
    ///
    /// Reads `path` if given, otherwise uses the defaults, and takes the
    /// secret from [`SECRET_ENV`].
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let secret = std::env::var(SECRET_ENV)
            .map(WebhookSecret::new)
            .map_err(|_| ConfigError::MissingSecret(SECRET_ENV))?;

        let config = match path {
            Some(path) => parse_config(&std::fs::read_to_string(path)?, secret)?,
            None => Self::new(secret),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret(SECRET_ENV));
        }

        let required = [
            ("target repository", &self.target.repository),
            ("target branch", &self.target.branch),
            ("remote user", &self.remote.user),
            ("remote host", &self.remote.host),
            ("remote workdir", &self.remote.workdir),
            ("remote script", &self.remote.script),
            ("remote ssh", &self.remote.ssh_program),
            ("logs requests", &self.logs.requests),
            ("logs deploys", &self.logs.deploys),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::invalid("server path", "must start with '/'"));
        }
        if self.server.path == "/health" || self.server.path.starts_with("/health/") {
            return Err(ConfigError::invalid("server path", "collides with the health routes"));
        }
        if self.remote.timeout.is_zero() {
            return Err(ConfigError::invalid(
                "remote timeout-secs",
                "must be greater than zero",
            ));
        }
        if self.logs.requests == self.logs.deploys {
            return Err(ConfigError::invalid(
                "logs",
                "request and deploy logs must be different files",
            ));
        }

        Ok(())
    }
}
