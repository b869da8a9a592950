//! Ambient execution context for a run.

use std::path::{Path, PathBuf};

/// Which node's instance a run is bound to.
///
/// A call sequence may be attached to the node itself or, for
/// relationship operations, to the relationship's target node. The
/// choice is an explicit branch selected when building the context and
/// decides which instance results are stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeScope {
    /// The node the operation runs on.
    #[default]
    OwnNode,

    /// The target node of a relationship operation.
    RelatedNode,
}

/// Ambient execution context for one run.
///
/// Templates see only the enumerated `ctx.*` fields exposed by
/// [`template::render`](crate::template::render); nothing else from the
/// context leaks into the template surface.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Workflow execution id.
    pub execution_id: String,

    node_instance_id: String,

    target_instance_id: Option<String>,

    /// Workflow id.
    pub workflow_id: String,

    scope: NodeScope,

    /// Address of the containing host, used as a fallback when the
    /// credentials carry no address of their own.
    pub container_host: Option<String>,
}

impl RunContext {
    /// Create a context bound to the operation's own node.
    pub fn new(
        execution_id: impl Into<String>,
        instance_id: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_instance_id: instance_id.into(),
            target_instance_id: None,
            workflow_id: workflow_id.into(),
            scope: NodeScope::OwnNode,
            container_host: None,
        }
    }

    /// Bind the context to a relationship's target node instead.
    ///
    /// Result-sink writes, the template `ctx.instance_id` field and the
    /// transcript path all follow the target instance afterwards.
    pub fn with_related_node(mut self, target_instance_id: impl Into<String>) -> Self {
        self.target_instance_id = Some(target_instance_id.into());
        self.scope = NodeScope::RelatedNode;
        self
    }

    /// Set the containing host used for the address fallback.
    pub fn with_container_host(mut self, host: impl Into<String>) -> Self {
        self.container_host = Some(host.into());
        self
    }

    /// Which node this run is bound to.
    pub fn scope(&self) -> NodeScope {
        self.scope
    }

    /// Instance id the run is bound to: the own node's, or the
    /// relationship target's under [`NodeScope::RelatedNode`].
    pub fn instance_id(&self) -> &str {
        match self.scope {
            NodeScope::OwnNode => &self.node_instance_id,
            NodeScope::RelatedNode => self
                .target_instance_id
                .as_deref()
                .unwrap_or(&self.node_instance_id),
        }
    }

    /// Transcript file path for runs with log storage enabled.
    ///
    /// Deterministic per run: derived from execution, instance and
    /// workflow ids.
    pub fn transcript_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "terminal-{}_{}_{}.log",
            self.execution_id,
            self.instance_id(),
            self.workflow_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_path() {
        let ctx = RunContext::new("exec-1", "node_abc123", "install");
        let path = ctx.transcript_path(Path::new("/tmp"));
        assert_eq!(
            path,
            PathBuf::from("/tmp/terminal-exec-1_node_abc123_install.log")
        );
    }

    #[test]
    fn test_default_scope_is_own_node() {
        let ctx = RunContext::new("e", "node_1", "w");
        assert_eq!(ctx.scope(), NodeScope::OwnNode);
        assert_eq!(ctx.instance_id(), "node_1");
    }

    #[test]
    fn test_related_node_scope_switches_instance() {
        let ctx = RunContext::new("e", "node_1", "w").with_related_node("node_2");
        assert_eq!(ctx.scope(), NodeScope::RelatedNode);
        assert_eq!(ctx.instance_id(), "node_2");

        // The transcript follows the target instance as well.
        let path = ctx.transcript_path(Path::new("/tmp"));
        assert_eq!(path, PathBuf::from("/tmp/terminal-e_node_2_w.log"));
    }
}
