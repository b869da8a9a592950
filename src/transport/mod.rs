//! Transport seam for terminal sessions.
//!
//! The orchestrator only ever talks to the [`Transport`] and
//! [`TerminalSession`] traits; [`SshTransport`] is the russh-backed
//! production implementation.

pub mod config;
mod ssh;

pub use config::{AuthMethod, ConnectConfig};
pub use ssh::SshTransport;

use async_trait::async_trait;

use crate::call::ExpectedResponse;
use crate::channel::PatternSets;
use crate::error::Result;

/// One command execution request against a live session.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The command line to send.
    pub command: String,

    /// Prompt-check tokens; transport defaults apply when absent.
    pub prompt_check: Option<Vec<String>>,

    /// Patterns the output is classified against.
    pub patterns: PatternSets,

    /// Ordered prompt/answer pairs answered while waiting for the
    /// prompt.
    pub responses: Vec<ExpectedResponse>,
}

/// Live terminal session, exclusively owned by one run.
#[async_trait]
pub trait TerminalSession: Send {
    /// Execute one command line and return its normalized output.
    ///
    /// Output matching a warning pattern fails with
    /// [`Error::RecoverableWarning`](crate::Error::RecoverableWarning);
    /// error and critical matches fail fatally.
    async fn run(&mut self, request: &RunRequest) -> Result<String>;

    /// Whether the remote side has closed the session.
    fn is_closed(&self) -> bool;

    /// Tear the session down. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Session factory: connects to one host and detects its prompt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect per `config` and return the live session plus the
    /// detected device prompt.
    async fn connect(&self, config: &ConnectConfig) -> Result<(Box<dyn TerminalSession>, String)>;
}
