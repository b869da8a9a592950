//! Call compilation: action / template / template_text precedence and
//! plain-substitution rendering.
//!
//! Rendering is deliberately dumb: `{{ key }}` placeholders are
//! replaced from the call's parameter map plus an enumerated `ctx.*`
//! namespace. Unknown placeholders render empty. Anything fancier
//! belongs in the caller's tooling before the text reaches a call.

use std::path::PathBuf;
use std::sync::OnceLock;

use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;

use crate::call::Call;
use crate::context::RunContext;
use crate::error::TemplateError;

/// Source of named templates, resolved at call-compile time.
///
/// Typically backed by the caller's blueprint or resource storage;
/// [`DirTemplates`] covers plain file trees.
pub trait TemplateSource: Send + Sync {
    /// Look up the template text registered under `name`.
    fn resolve(&self, name: &str) -> Result<String, TemplateError>;
}

/// Template source with no templates.
///
/// Calls referencing a named template compile to empty under this
/// source (logged, skipped).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateSource for NoTemplates {
    fn resolve(&self, name: &str) -> Result<String, TemplateError> {
        Err(TemplateError::NotFound {
            name: name.to_string(),
        })
    }
}

/// Directory-backed template source; names are paths relative to the
/// root.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
}

impl DirTemplates {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirTemplates {
    fn resolve(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound {
                    name: name.to_string(),
                }
            } else {
                TemplateError::Source(format!("{}: {err}", path.display()))
            }
        })
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap())
}

/// Render `{{ key }}` placeholders from `params` plus the enumerated
/// `ctx.*` fields.
///
/// Only `ctx.execution_id`, `ctx.instance_id` and `ctx.workflow_id`
/// are exposed; unknown placeholders render as the empty string.
pub fn render(template: &str, params: &IndexMap<String, String>, ctx: &RunContext) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match key {
                "ctx.execution_id" => ctx.execution_id.clone(),
                "ctx.instance_id" => ctx.instance_id().to_string(),
                "ctx.workflow_id" => ctx.workflow_id.clone(),
                _ => params.get(key).cloned().unwrap_or_default(),
            }
        })
        .into_owned()
}

/// Compile one call into executable text.
///
/// Precedence: raw `action` verbatim, else named `template` resolved
/// through `source`, else inline `template_text`. Template lookup
/// failures are logged and yield `None`. `None` means the call is
/// skipped entirely: no lines execute and nothing is stored.
pub fn compile_call(call: &Call, source: &dyn TemplateSource, ctx: &RunContext) -> Option<String> {
    if let Some(action) = call.action.as_deref() {
        if !action.is_empty() {
            return Some(action.to_string());
        }
    }

    if let Some(name) = call.template.as_deref() {
        return match source.resolve(name) {
            Ok(text) if text.is_empty() => {
                info!("Empty template: {name}");
                None
            }
            Ok(text) => {
                debug!("Rendering template: {name}");
                Some(render(&text, &call.params, ctx))
            }
            Err(err) => {
                info!("Skipping call, template unavailable: {err}");
                None
            }
        };
    }

    if let Some(text) = call.template_text.as_deref() {
        if text.is_empty() {
            info!("Empty template_text");
            return None;
        }
        return Some(render(text, &call.params, ctx));
    }

    None
}
