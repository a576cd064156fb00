//! KDL configuration parsing for autodeploy.
//!
//! This crate handles:
//! - Built-in defaults for the single deploy target
//! - Overrides from an optional `autodeploy.kdl` file
//! - Reading the webhook secret from the environment

pub mod error;
pub mod parse;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use parse::parse_config;
pub use system::{
    Config, DeployMode, LogConfig, RemoteConfig, SECRET_ENV, ServerConfig, TargetConfig,
};
