//! Parsing of `autodeploy.kdl`.
//!
//! ```kdl
//! server port=8000 bind="0.0.0.0" path="/github"
//! target repository="Nettverksdagen-2" branch="master"
//! remote mode="ssh" {
//!     user "sigtot"
//!     host "nvdagen.no"
//!     workdir "~/Nettverksdagen-2"
//!     script "autodeploy.sh"
//!     option "StrictHostKeyChecking=yes"
//!     timeout-secs 1800
//! }
//! logs dir="/var/log/autodeploy" requests="requests.log" deploys="webhooks.log"
//! ```

use crate::{Config, ConfigError, ConfigResult, DeployMode};
use autodeploy_core::WebhookSecret;
use kdl::{KdlDocument, KdlNode};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Parse a configuration document on top of the built-in defaults.
pub fn parse_config(kdl: &str, secret: WebhookSecret) -> ConfigResult<Config> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = Config::new(secret);

    for node in doc.nodes() {
        match node.name().value() {
            "server" => {
                if let Some(port) = get_integer_prop(node, "port")? {
                    config.server.port = u16::try_from(port).map_err(|_| {
                        ConfigError::invalid("server port", format!("{port} is out of range"))
                    })?;
                }
                if let Some(bind) = get_string_prop(node, "bind")? {
                    config.server.bind = bind.parse::<IpAddr>().map_err(|e| {
                        ConfigError::invalid("server bind", format!("{bind}: {e}"))
                    })?;
                }
                if let Some(path) = get_string_prop(node, "path")? {
                    config.server.path = path;
                }
            }
            "target" => {
                if let Some(repository) = get_string_prop(node, "repository")? {
                    config.target.repository = repository;
                }
                if let Some(branch) = get_string_prop(node, "branch")? {
                    config.target.branch = branch;
                }
            }
            "remote" => parse_remote(node, &mut config)?,
            "logs" => {
                if let Some(dir) = get_string_prop(node, "dir")? {
                    config.logs.dir = PathBuf::from(dir);
                }
                if let Some(requests) = get_string_prop(node, "requests")? {
                    config.logs.requests = requests;
                }
                if let Some(deploys) = get_string_prop(node, "deploys")? {
                    config.logs.deploys = deploys;
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(config)
}

fn parse_remote(node: &KdlNode, config: &mut Config) -> ConfigResult<()> {
    let remote = &mut config.remote;

    if let Some(mode) = get_string_prop(node, "mode")? {
        remote.mode = mode
            .parse::<DeployMode>()
            .map_err(|message| ConfigError::invalid("remote mode", message))?;
    }

    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        let name = child.name().value();
        match name {
            "user" => remote.user = require_string_arg(child, "remote user")?,
            "host" => remote.host = require_string_arg(child, "remote host")?,
            "workdir" => remote.workdir = require_string_arg(child, "remote workdir")?,
            "script" => remote.script = require_string_arg(child, "remote script")?,
            "ssh" => remote.ssh_program = require_string_arg(child, "remote ssh")?,
            "option" => remote.ssh_options.extend(get_all_string_args(child)),
            "timeout-secs" => {
                let secs = get_first_integer_arg(child)
                    .ok_or_else(|| ConfigError::MissingField("remote timeout-secs".to_string()))?;
                let secs = u64::try_from(secs).map_err(|_| {
                    ConfigError::invalid("remote timeout-secs", "must not be negative")
                })?;
                remote.timeout = Duration::from_secs(secs);
            }
            _ => {}
        }
    }

    Ok(())
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn require_string_arg(node: &KdlNode, field: &str) -> ConfigResult<String> {
    get_first_string_arg(node).ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

fn get_first_integer_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

/// A property that is present but not a string is an error, not a default.
fn get_string_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<String>> {
    match node.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_string()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::invalid(name, "expected a string")),
    }
}

fn get_integer_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<i128>> {
    match node.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(name, "expected an integer")),
    }
}
