//! Prompt-check compilation and output classification.

use regex::bytes::Regex;

/// Trait for prompt matching - regex by default, extensible for custom
/// policies.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where the match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// Prompt tokens assumed when the caller supplies none.
const DEFAULT_PROMPT_TOKENS: &[&str] = &["#", "$", ">"];

/// Compile a prompt-check token list into an end-anchored pattern.
///
/// Tokens are literal prompt tails such as `#` or `$`; with no tokens
/// the default `#`/`$`/`>` set applies.
pub fn compile_prompt_check(tokens: Option<&[String]>) -> Result<Regex, regex::Error> {
    let escaped: Vec<String> = tokens
        .unwrap_or_default()
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect();

    let escaped = if escaped.is_empty() {
        DEFAULT_PROMPT_TOKENS
            .iter()
            .map(|t| regex::escape(t))
            .collect()
    } else {
        escaped
    };
    Regex::new(&format!(r"(?:{})\s*$", escaped.join("|")))
}

/// How a command's output was classified against the pattern sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No pattern matched.
    Clean,

    /// Recoverable: the line may be rerun.
    Warning(String),

    /// Fatal to the run.
    Error(String),

    /// Fatal to the run, outranks error and warning matches.
    Critical(String),
}

/// Pattern sets a command's output is checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSets {
    /// Fatal error patterns.
    pub errors: Vec<String>,

    /// Recoverable warning patterns.
    pub warnings: Vec<String>,

    /// Critical patterns, checked first.
    pub criticals: Vec<String>,
}

impl PatternSets {
    /// Classify `output`. Criticals outrank errors outrank warnings;
    /// within a set the first listed match wins.
    pub fn classify(&self, output: &str) -> Classification {
        if let Some(matched) = first_match(&self.criticals, output) {
            return Classification::Critical(matched);
        }
        if let Some(matched) = first_match(&self.errors, output) {
            return Classification::Error(matched);
        }
        if let Some(matched) = first_match(&self.warnings, output) {
            return Classification::Warning(matched);
        }
        Classification::Clean
    }

    /// The error patterns alone, as used by the close loop.
    pub fn errors_only(&self) -> PatternSets {
        PatternSets {
            errors: self.errors.clone(),
            ..PatternSets::default()
        }
    }
}

fn first_match(patterns: &[String], output: &str) -> Option<String> {
    patterns
        .iter()
        .find(|p| !p.is_empty() && output.contains(p.as_str()))
        .cloned()
}

/// Remove the echoed command and the trailing prompt from raw output.
pub fn normalize_output(raw: &str, command: &str, prompt: &Regex) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    if let Some(first) = lines.first() {
        if first.trim_end().ends_with(command) {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if prompt.is_match(last.as_bytes()) {
            lines.pop();
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_check() {
        let pattern = compile_prompt_check(None).unwrap();
        assert!(pattern.is_match(b"router# "));
        assert!(pattern.is_match(b"user@host:~$ "));
        assert!(pattern.is_match(b"switch>"));
        assert!(!pattern.is_match(b"loading..."));
    }

    #[test]
    fn test_custom_prompt_tokens_are_escaped() {
        let tokens = vec!["%".to_string(), "(config)#".to_string()];
        let pattern = compile_prompt_check(Some(&tokens)).unwrap();
        assert!(pattern.is_match(b"sw(config)# "));
        assert!(pattern.is_match(b"host% "));
        assert!(!pattern.is_match(b"host$ "));
    }

    #[test]
    fn test_classification_precedence() {
        let sets = PatternSets {
            errors: vec!["error".into()],
            warnings: vec!["warning".into()],
            criticals: vec!["panic".into()],
        };

        assert_eq!(sets.classify("all good"), Classification::Clean);
        assert_eq!(
            sets.classify("minor warning here"),
            Classification::Warning("warning".into())
        );
        assert_eq!(
            sets.classify("error and warning"),
            Classification::Error("error".into())
        );
        assert_eq!(
            sets.classify("panic: error: warning"),
            Classification::Critical("panic".into())
        );
    }

    #[test]
    fn test_errors_only_drops_warning_and_critical() {
        let sets = PatternSets {
            errors: vec!["error".into()],
            warnings: vec!["warning".into()],
            criticals: vec!["panic".into()],
        };
        let errors_only = sets.errors_only();

        assert_eq!(
            errors_only.classify("some warning"),
            Classification::Clean
        );
        assert_eq!(errors_only.classify("panic"), Classification::Clean);
        assert_eq!(
            errors_only.classify("error"),
            Classification::Error("error".into())
        );
    }

    #[test]
    fn test_normalize_output() {
        let prompt = compile_prompt_check(None).unwrap();
        let raw = "show version\nIOS 15.2\nUptime 3 days\nrouter# ";
        assert_eq!(
            normalize_output(raw, "show version", &prompt),
            "IOS 15.2\nUptime 3 days"
        );
    }

    #[test]
    fn test_normalize_output_without_echo() {
        let prompt = compile_prompt_check(None).unwrap();
        assert_eq!(normalize_output("plain output", "other", &prompt), "plain output");
    }
}
