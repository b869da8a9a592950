//! Declarative call schema.
//!
//! A run is driven by an ordered list of calls, typically deserialized
//! from workflow input. Each call resolves to zero or more command
//! lines via the call compiler in [`template`](crate::template).

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::retry::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL};

/// A prompt/answer pair for commands that ask questions mid-execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpectedResponse {
    /// Substring the device prints when it wants input.
    pub question: String,

    /// Text sent back when the question appears.
    pub answer: String,
}

/// One declarative call.
///
/// Executable text resolves with precedence: raw [`action`](Self::action),
/// else named [`template`](Self::template), else inline
/// [`template_text`](Self::template_text). A call where all three are
/// absent is a no-op.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Call {
    /// Raw command text, used verbatim.
    pub action: Option<String>,

    /// Name of an externally resolvable template.
    pub template: Option<String>,

    /// Inline template text.
    pub template_text: Option<String>,

    /// Template parameters, rendered alongside the `ctx` namespace.
    pub params: IndexMap<String, String>,

    /// Ordered prompt/answer pairs for interactive commands.
    pub responses: Vec<ExpectedResponse>,

    /// Prompt-check override for this call.
    pub prompt_check: Option<Vec<String>>,

    /// Error-pattern override for this call.
    pub errors: Option<Vec<String>>,

    /// Warning-pattern override for this call.
    pub warnings: Option<Vec<String>>,

    /// Critical-pattern override for this call.
    pub criticals: Option<Vec<String>>,

    /// Runtime-property key the trimmed result is stored under.
    pub save_to: Option<String>,

    /// Attempt budget per line (default 10).
    pub retry_count: u32,

    /// Seconds between attempts (default 15).
    pub retry_sleep: u64,
}

impl Default for Call {
    fn default() -> Self {
        Self {
            action: None,
            template: None,
            template_text: None,
            params: IndexMap::new(),
            responses: Vec::new(),
            prompt_check: None,
            errors: None,
            warnings: None,
            criticals: None,
            save_to: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_sleep: DEFAULT_RETRY_INTERVAL.as_secs(),
        }
    }
}

impl Call {
    /// Call running raw command text.
    pub fn action(text: impl Into<String>) -> Self {
        Self {
            action: Some(text.into()),
            ..Self::default()
        }
    }

    /// Call rendering a named template.
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            template: Some(name.into()),
            ..Self::default()
        }
    }

    /// Call rendering inline template text.
    pub fn template_text(text: impl Into<String>) -> Self {
        Self {
            template_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Store the call's trimmed result under `key`.
    pub fn save_to(mut self, key: impl Into<String>) -> Self {
        self.save_to = Some(key.into());
        self
    }

    /// Pause between retry attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_sleep)
    }
}
