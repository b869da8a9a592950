//! # Termflow
//!
//! Async terminal call runner for network device automation.
//!
//! Termflow executes a declarative list of "calls" (raw commands,
//! named templates or inline template text) over an interactive
//! terminal session to a remote device. It detects command prompts,
//! classifies output against warning/error/critical pattern sets,
//! retries transient failures with a fixed interval, and persists
//! selected results into a runtime property store.
//!
//! ## Features
//!
//! - Async SSH sessions via russh (or any custom [`Transport`])
//! - Ordered multi-host fallback: first reachable address wins
//! - Bounded per-line retry with an injectable clock
//! - Plain-substitution templates with an enumerated `ctx` namespace
//! - Graceful, capped close loop issuing the configured exit command
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use termflow::{
//!     AuthConfig, Call, MemoryStore, PropertyStore, RunContext, Runner,
//!     SshTransport, template::NoTemplates,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), termflow::Error> {
//!     let auth: AuthConfig = serde_json::from_str(
//!         r#"{"ip": "192.168.1.1", "user": "admin", "password": "secret"}"#,
//!     ).unwrap();
//!
//!     let calls = vec![
//!         Call::action("show version").save_to("version"),
//!         Call::action("show interfaces"),
//!     ];
//!
//!     let transport = SshTransport;
//!     let store = MemoryStore::new();
//!     let ctx = RunContext::new("exec-1", "node_1", "install");
//!
//!     Runner::new(&transport, &NoTemplates, &store, ctx)
//!         .run(&auth, &AuthConfig::default(), &calls)
//!         .await?;
//!
//!     println!("{:?}", store.get("node_1", "version"));
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod call;
pub mod channel;
pub mod context;
pub mod error;
pub mod retry;
pub mod runner;
pub mod store;
pub mod template;
pub mod transport;

// Re-export main types for convenience
pub use auth::{AuthConfig, Credentials};
pub use call::{Call, ExpectedResponse};
pub use context::{NodeScope, RunContext};
pub use error::Error;
pub use retry::{Clock, TokioClock};
pub use runner::Runner;
pub use store::{MemoryStore, PropertyStore};
pub use template::{DirTemplates, TemplateSource};
pub use transport::{ConnectConfig, RunRequest, SshTransport, TerminalSession, Transport};
