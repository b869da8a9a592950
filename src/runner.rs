//! Session orchestration: one run of declarative calls against a
//! device.
//!
//! A run moves through credential resolution, host selection, the call
//! loop and a bounded close loop; it ends either cleanly closed or
//! failed, never half-way. Results selected with `save_to` that were
//! persisted before a fatal failure stay persisted.

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};

use crate::auth::{AuthConfig, Credentials, DEFAULT_EXIT_COMMAND};
use crate::call::Call;
use crate::channel::PatternSets;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::retry::{self, Clock, TokioClock};
use crate::store::{PropertyStore, ResultSink};
use crate::template::{TemplateSource, compile_call};
use crate::transport::{AuthMethod, ConnectConfig, RunRequest, TerminalSession, Transport};

/// Pause between exit-command attempts in the close loop.
const CLOSE_PACING: Duration = Duration::from_secs(1);

/// Exit attempts before the close loop gives up. The final transport
/// close still runs when the cap is hit.
const CLOSE_LOOP_CAP: u32 = 10;

static TOKIO_CLOCK: TokioClock = TokioClock;

/// Orchestrates one terminal run: credential resolution, host
/// selection, call execution, result persistence and session shutdown.
///
/// A runner owns no session between runs; each [`run`](Self::run) owns
/// its session exclusively for the call's duration, so independent
/// runners may execute concurrently.
pub struct Runner<'a> {
    transport: &'a dyn Transport,
    templates: &'a dyn TemplateSource,
    store: &'a dyn PropertyStore,
    clock: &'a dyn Clock,
    ctx: RunContext,
    transcript_dir: PathBuf,
}

impl<'a> Runner<'a> {
    /// Runner over the given collaborators, using the real tokio clock.
    pub fn new(
        transport: &'a dyn Transport,
        templates: &'a dyn TemplateSource,
        store: &'a dyn PropertyStore,
        ctx: RunContext,
    ) -> Self {
        Self {
            transport,
            templates,
            store,
            clock: &TOKIO_CLOCK,
            ctx,
            transcript_dir: std::env::temp_dir(),
        }
    }

    /// Substitute the clock, for tests that must not sleep.
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Directory transcripts are written to when log storage is on.
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = dir.into();
        self
    }

    /// Execute `calls` in order using node-level `defaults` merged with
    /// per-invocation `overrides`.
    ///
    /// Returns when every call completed and the session closed, or
    /// with the first fatal or retryable failure. The session is torn
    /// down on failure as well.
    pub async fn run(
        &self,
        defaults: &AuthConfig,
        overrides: &AuthConfig,
        calls: &[Call],
    ) -> Result<()> {
        if calls.is_empty() {
            info!("No calls");
            return Ok(());
        }

        let merged = AuthConfig::merged(defaults, overrides);
        let credentials = Credentials::resolve(&merged, &self.ctx)?;
        let run_defaults = RunDefaults::from_config(&merged);

        let log_file = if credentials.store_logs {
            let path = self.ctx.transcript_path(&self.transcript_dir);
            info!("Communication logs will be saved to {}", path.display());
            Some(path)
        } else {
            None
        };

        let (mut session, prompt) = self.connect_first(&credentials, log_file).await?;
        info!("Device prompt: {prompt}");

        match self.execute_calls(session.as_mut(), calls, &run_defaults).await {
            Ok(()) => self.shutdown(session.as_mut(), &run_defaults).await,
            Err(err) => {
                // Resource hygiene only; the run already failed.
                let _ = session.as_mut().close().await;
                Err(err)
            }
        }
    }

    /// Try each candidate address in order; first success wins.
    async fn connect_first(
        &self,
        credentials: &Credentials,
        log_file: Option<PathBuf>,
    ) -> Result<(Box<dyn TerminalSession>, String)> {
        let mut attempts = 0usize;
        for address in &credentials.addresses {
            attempts += 1;
            let config = self.connect_config(credentials, address, log_file.clone());
            match self.transport.connect(&config).await {
                Ok(connected) => {
                    info!("Will be used: {address}");
                    return Ok(connected);
                }
                Err(err) => info!("Can't connect to {address}: {err}"),
            }
        }
        Err(Error::NoReachableHost { attempts })
    }

    fn connect_config(
        &self,
        credentials: &Credentials,
        address: &str,
        log_file: Option<PathBuf>,
    ) -> ConnectConfig {
        let auth = if let Some(key) = &credentials.key_content {
            AuthMethod::KeyContent(key.clone())
        } else if let Some(password) = &credentials.password {
            AuthMethod::Password(password.clone())
        } else {
            AuthMethod::None
        };

        let mut config = ConnectConfig::new(address, &credentials.user);
        config.port = credentials.port;
        config.auth = auth;
        config.prompt_check = credentials.prompt_check.clone();
        config.log_file = log_file;
        config
    }

    /// The call loop: compile, execute line by line, persist.
    async fn execute_calls(
        &self,
        session: &mut dyn TerminalSession,
        calls: &[Call],
        run_defaults: &RunDefaults,
    ) -> Result<()> {
        let sink = ResultSink::new(self.store, self.ctx.instance_id());

        for call in calls {
            let Some(compiled) = compile_call(call, self.templates, &self.ctx) else {
                continue;
            };
            if compiled.trim().is_empty() {
                continue;
            }
            debug!("Compiled call:\n{compiled}");

            if !call.responses.is_empty() {
                info!("We have predefined responses: {:?}", call.responses);
            }

            let patterns = run_defaults.patterns_for(call);
            let prompt_check = call
                .prompt_check
                .clone()
                .or_else(|| run_defaults.prompt_check.clone());

            let mut result = String::new();
            for line in compiled.lines() {
                if line.trim().is_empty() {
                    continue;
                }

                let request = RunRequest {
                    command: line.to_string(),
                    prompt_check: prompt_check.clone(),
                    patterns: patterns.clone(),
                    responses: call.responses.clone(),
                };

                let part = retry::retry(
                    self.clock,
                    &mut *session,
                    &request,
                    call.retry_count,
                    call.retry_interval(),
                    line,
                    |session, request| session.run(request),
                )
                .await?;

                let part = part.trim();
                if !part.is_empty() {
                    info!("{part}");
                }
                if !result.is_empty() {
                    result.push('\n');
                }
                result.push_str(part);
            }

            if let Some(key) = &call.save_to {
                sink.store(key, result.trim());
            }
        }

        Ok(())
    }

    /// The close loop: issue the exit command until the transport
    /// reports closed, capped, then always close the session.
    async fn shutdown(
        &self,
        session: &mut dyn TerminalSession,
        run_defaults: &RunDefaults,
    ) -> Result<()> {
        let mut iterations = 0u32;
        let mut capped = false;

        if !run_defaults.exit_command.is_empty() {
            let request = RunRequest {
                command: run_defaults.exit_command.clone(),
                prompt_check: run_defaults.prompt_check.clone(),
                // The exit command is judged against error patterns
                // only.
                patterns: run_defaults.patterns.errors_only(),
                responses: Vec::new(),
            };

            while !session.is_closed() {
                if iterations >= CLOSE_LOOP_CAP {
                    capped = true;
                    break;
                }
                iterations += 1;

                info!("Execute close");
                match session.run(&request).await {
                    Ok(result) => debug!("Result of close: {result:?}"),
                    Err(err) => {
                        // Still tear the session down before failing.
                        let _ = session.close().await;
                        return Err(err);
                    }
                }
                self.clock.sleep(CLOSE_PACING).await;
            }
        }

        // Runs even when the cap was hit.
        let close_result = session.close().await;
        if capped {
            return Err(Error::CloseLoopExceeded { iterations });
        }
        close_result
    }
}

/// Run-level execution defaults a call may override field by field.
struct RunDefaults {
    prompt_check: Option<Vec<String>>,
    patterns: PatternSets,
    exit_command: String,
}

impl RunDefaults {
    fn from_config(config: &AuthConfig) -> Self {
        Self {
            prompt_check: config.prompt_check.clone(),
            patterns: PatternSets {
                errors: config.errors.clone().unwrap_or_default(),
                warnings: config.warnings.clone().unwrap_or_default(),
                criticals: config.criticals.clone().unwrap_or_default(),
            },
            exit_command: config
                .exit_command
                .clone()
                .unwrap_or_else(|| DEFAULT_EXIT_COMMAND.to_string()),
        }
    }

    fn patterns_for(&self, call: &Call) -> PatternSets {
        PatternSets {
            errors: call
                .errors
                .clone()
                .unwrap_or_else(|| self.patterns.errors.clone()),
            warnings: call
                .warnings
                .clone()
                .unwrap_or_else(|| self.patterns.warnings.clone()),
            criticals: call
                .criticals
                .clone()
                .unwrap_or_else(|| self.patterns.criticals.clone()),
        }
    }
}
