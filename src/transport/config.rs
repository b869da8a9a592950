//! Connection parameters for the transport seam.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Authentication material for a terminal session.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication (lab devices only).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication from in-memory key material.
    KeyContent(SecretString),
}

/// Parameters for connecting to one host.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection and prompt-detection timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Prompt-check tokens used to detect the device prompt.
    pub prompt_check: Option<Vec<String>>,

    /// Transcript file raw session output is appended to, when log
    /// storage is enabled.
    pub log_file: Option<PathBuf>,
}

impl ConnectConfig {
    /// Config for `host` with the transport defaults.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            prompt_check: None,
            log_file: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let mut config = ConnectConfig::new("10.0.0.1", "admin");
        config.port = 2222;
        assert_eq!(config.socket_addr(), "10.0.0.1:2222");
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let mut config = ConnectConfig::new("10.0.0.1", "admin");
        config.auth = AuthMethod::Password(SecretString::from("hunter2"));
        let debugged = format!("{config:?}");
        assert!(!debugged.contains("hunter2"));
    }
}
