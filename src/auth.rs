//! Credential configuration, merging and resolution.
//!
//! Callers supply a `terminal_auth` block at the node level and may
//! override individual fields per invocation. Merging is an explicit
//! immutable operation producing a new config; neither input is
//! mutated.

use log::info;
use secrecy::SecretString;
use serde::Deserialize;

use crate::context::RunContext;
use crate::error::{Error, Result};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Default close-loop exit command.
pub const DEFAULT_EXIT_COMMAND: &str = "exit";

/// One address or many; workflow inputs commonly pass a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressList {
    /// A single address.
    One(String),
    /// An ordered list of candidate addresses.
    Many(Vec<String>),
}

impl AddressList {
    /// Flatten into an ordered address vector.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            AddressList::One(addr) => vec![addr],
            AddressList::Many(addrs) => addrs,
        }
    }
}

/// Raw `terminal_auth` block as supplied by the caller.
///
/// All fields are optional so that node-level defaults and
/// per-invocation overrides can be merged field by field before
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Candidate host address(es), tried in order.
    pub ip: Option<AddressList>,

    /// Login user.
    pub user: Option<String>,

    /// Login password.
    pub password: Option<SecretString>,

    /// Private key material, supplied inline rather than as a path.
    pub key_content: Option<SecretString>,

    /// SSH port (default 22).
    pub port: Option<u16>,

    /// Prompt-check tokens, e.g. `["#", "$"]`.
    pub prompt_check: Option<Vec<String>>,

    /// Run-level error patterns.
    pub errors: Option<Vec<String>>,

    /// Run-level warning patterns.
    pub warnings: Option<Vec<String>>,

    /// Run-level critical patterns.
    pub criticals: Option<Vec<String>>,

    /// Command issued by the close loop (default `exit`).
    pub exit_command: Option<String>,

    /// Store a raw session transcript to a per-run file.
    pub store_logs: Option<bool>,
}

impl AuthConfig {
    /// Merge per-invocation `overrides` over node-level `defaults`.
    ///
    /// Field-by-field: an override wins wherever it is present. Returns
    /// a new config; neither input is mutated.
    pub fn merged(defaults: &AuthConfig, overrides: &AuthConfig) -> AuthConfig {
        AuthConfig {
            ip: overrides.ip.clone().or_else(|| defaults.ip.clone()),
            user: overrides.user.clone().or_else(|| defaults.user.clone()),
            password: overrides
                .password
                .clone()
                .or_else(|| defaults.password.clone()),
            key_content: overrides
                .key_content
                .clone()
                .or_else(|| defaults.key_content.clone()),
            port: overrides.port.or(defaults.port),
            prompt_check: overrides
                .prompt_check
                .clone()
                .or_else(|| defaults.prompt_check.clone()),
            errors: overrides.errors.clone().or_else(|| defaults.errors.clone()),
            warnings: overrides
                .warnings
                .clone()
                .or_else(|| defaults.warnings.clone()),
            criticals: overrides
                .criticals
                .clone()
                .or_else(|| defaults.criticals.clone()),
            exit_command: overrides
                .exit_command
                .clone()
                .or_else(|| defaults.exit_command.clone()),
            store_logs: overrides.store_logs.or(defaults.store_logs),
        }
    }
}

/// Validated credentials for one run.
///
/// Produced by [`Credentials::resolve`]; guaranteed to carry at least
/// one address and a non-empty user.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Ordered candidate addresses.
    pub addresses: Vec<String>,

    /// Login user.
    pub user: String,

    /// Login password, if any.
    pub password: Option<SecretString>,

    /// Inline private key material, if any.
    pub key_content: Option<SecretString>,

    /// SSH port.
    pub port: u16,

    /// Prompt-check tokens forwarded to the transport.
    pub prompt_check: Option<Vec<String>>,

    /// Whether to store a per-run transcript.
    pub store_logs: bool,
}

impl Credentials {
    /// Resolve a merged config against the execution context.
    ///
    /// When no address is configured, falls back to the context's
    /// container host (logged). Fails with
    /// [`Error::MissingCredentials`] when no address or no user
    /// remains.
    pub fn resolve(config: &AuthConfig, ctx: &RunContext) -> Result<Self> {
        let mut addresses = config
            .ip
            .clone()
            .map(AddressList::into_vec)
            .unwrap_or_default();
        addresses.retain(|a| !a.is_empty());

        if addresses.is_empty() {
            if let Some(host) = &ctx.container_host {
                info!("No address configured, using container host: {host}");
                addresses.push(host.clone());
            }
        }

        let user = config
            .user
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::MissingCredentials {
                message: "user not set".to_string(),
            })?;

        if addresses.is_empty() {
            return Err(Error::MissingCredentials {
                message: "ip not set".to_string(),
            });
        }

        Ok(Self {
            addresses,
            user,
            password: config.password.clone(),
            key_content: config.key_content.clone(),
            port: config.port.unwrap_or(DEFAULT_PORT),
            prompt_check: config.prompt_check.clone(),
            store_logs: config.store_logs.unwrap_or(false),
        })
    }
}
