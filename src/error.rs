//! Error types for termflow.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for termflow operations.
///
/// A run ends with a single terminal outcome. [`Error::is_retryable`]
/// tells the caller's workflow layer whether re-invoking the whole run
/// makes sense.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable address or user after credential merging.
    #[error("Missing credentials: {message}")]
    MissingCredentials { message: String },

    /// Every candidate address failed to connect.
    #[error("No reachable host after {attempts} connect attempt(s)")]
    NoReachableHost { attempts: usize },

    /// A warning pattern matched the command output.
    ///
    /// Recoverable at the line level: the retry executor absorbs these
    /// until its attempt budget runs out.
    #[error("Recoverable warning on '{command}': matched '{matched}'")]
    RecoverableWarning { command: String, matched: String },

    /// The retry budget for a command line was exhausted.
    #[error("Retry budget exhausted for '{command}'")]
    RetryExhausted { command: String },

    /// An error pattern matched the command output.
    #[error("Command '{command}' failed: matched '{matched}'")]
    CommandFailed { command: String, matched: String },

    /// A critical pattern matched the command output. Aborts the run
    /// without executing further calls.
    #[error("Critical failure on '{command}': matched '{matched}'")]
    Critical { command: String, matched: String },

    /// The close loop never observed a closed session within its cap.
    #[error("Session still open after {iterations} exit attempts")]
    CloseLoopExceeded { iterations: u32 },

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Template resolution errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Invalid prompt-check or classification pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Whether the caller may re-invoke the whole run.
    ///
    /// Host unavailability is transient infrastructure noise, not a
    /// configuration error, so `NoReachableHost` is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::NoReachableHost { .. } | Error::RecoverableWarning { .. }
        )
    }

    /// Line-level recoverable condition, absorbed by the retry executor.
    pub(crate) fn is_recoverable_warning(&self) -> bool {
        matches!(self, Error::RecoverableWarning { .. })
    }
}

/// Transport layer errors (SSH connection, authentication, channel).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key material could not be parsed
    #[error("SSH key error: {0}")]
    Key(String),

    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Prompt was not detected in time
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Template lookup errors.
///
/// The call compiler logs these and treats the call as empty; they only
/// surface to callers using a [`TemplateSource`](crate::TemplateSource)
/// directly.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Named template does not exist in the source
    #[error("Template '{name}' not found")]
    NotFound { name: String },

    /// Source-specific failure while reading a template
    #[error("Template source error: {0}")]
    Source(String),
}

/// Result type alias using termflow's Error.
pub type Result<T> = std::result::Result<T, Error>;
