//! SSH transport implementation using russh.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, decode_secret_key};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, ConnectConfig};
use super::{RunRequest, TerminalSession, Transport};
use crate::channel::{Classification, PatternBuffer, compile_prompt_check, normalize_output};
use crate::error::{Error, Result, TransportError};

/// russh-backed session factory.
///
/// Device targets routinely rotate host keys and the original caller
/// context supplies no known_hosts material, so server keys are
/// accepted as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

#[async_trait]
impl Transport for SshTransport {
    async fn connect(&self, config: &ConnectConfig) -> Result<(Box<dyn TerminalSession>, String)> {
        let mut session = SshSession::connect(config.clone()).await?;
        let prompt = session.detect_prompt().await?;
        Ok((Box::new(session), prompt))
    }
}

/// One live shell over an SSH PTY channel.
pub struct SshSession {
    handle: Handle<AcceptAllHandler>,
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    timeout: Duration,
    default_prompt_check: Option<Vec<String>>,
    transcript: Option<File>,
    closed: bool,
}

impl SshSession {
    /// Connect, authenticate and open a shell on `config`'s host.
    async fn connect(config: ConnectConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let mut handle = tokio::time::timeout(
            config.timeout,
            client::connect(
                ssh_config,
                (config.host.as_str(), config.port),
                AcceptAllHandler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|err| match err {
            russh::Error::IO(source) => TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source,
            },
            other => TransportError::Ssh(other),
        })?;

        Self::authenticate(&mut handle, &config).await?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|_| TransportError::PtyOpenFailed)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|_| TransportError::PtyOpenFailed)?;

        channel
            .request_shell(true)
            .await
            .map_err(|_| TransportError::ShellRequestFailed)?;

        let transcript = match &config.log_file {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(TransportError::Io)?,
            ),
            None => None,
        };

        Ok(Self {
            handle,
            channel,
            buffer: PatternBuffer::default(),
            timeout: config.timeout,
            default_prompt_check: config.prompt_check.clone(),
            transcript,
            closed: false,
        })
    }

    /// Authenticate with the server.
    async fn authenticate(handle: &mut Handle<AcceptAllHandler>, config: &ConnectConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => handle
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => handle
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::KeyContent(material) => {
                let key = decode_secret_key(material.expose_secret(), None)
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                // Best RSA hash algorithm the server supports.
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                handle
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Wait for the login banner to settle into a prompt and return the
    /// prompt line.
    async fn detect_prompt(&mut self) -> Result<String> {
        let pattern = self.compile_prompt(None)?;
        let banner = self.read_until_prompt(&pattern, &[]).await?;
        Ok(banner.lines().last().unwrap_or_default().trim().to_string())
    }

    fn compile_prompt(&self, override_check: Option<&[String]>) -> Result<Regex> {
        let tokens = override_check.or(self.default_prompt_check.as_deref());
        compile_prompt_check(tokens).map_err(Error::Pattern)
    }

    /// Send one line of text followed by a newline.
    async fn send_line(&mut self, text: &str) -> Result<()> {
        let line = format!("{text}\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn feed(&mut self, data: &[u8]) {
        if let Some(transcript) = &mut self.transcript {
            if let Err(err) = transcript.write_all(data) {
                warn!("Failed to write transcript: {err}");
                self.transcript = None;
            }
        }
        self.buffer.extend(data);
    }

    /// Accumulate output until `prompt` matches the buffer tail,
    /// answering expected-response questions in order as they appear.
    ///
    /// Returns the raw accumulated text. A channel EOF/close is not an
    /// error here: the session is marked closed and whatever was read
    /// so far is returned.
    async fn read_until_prompt(
        &mut self,
        prompt: &Regex,
        responses: &[crate::call::ExpectedResponse],
    ) -> Result<String> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut answered = 0usize;

        loop {
            if self.buffer.tail_matches(prompt) {
                break;
            }

            if let Some(response) = responses.get(answered) {
                let asked = self.buffer.tail_str().contains(&response.question);
                if asked {
                    debug!("Answering question: {}", response.question);
                    self.send_line(&response.answer).await?;
                    answered += 1;
                    continue;
                }
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| TransportError::PromptTimeout(self.timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.feed(&data),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.feed(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    self.closed = true;
                    break;
                }
                Some(_) => {}
            }
        }

        let raw = self.buffer.take();
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

#[async_trait]
impl TerminalSession for SshSession {
    async fn run(&mut self, request: &RunRequest) -> Result<String> {
        if self.closed {
            return Err(TransportError::Disconnected.into());
        }

        let prompt = self.compile_prompt(request.prompt_check.as_deref())?;

        debug!("Execute: {}", request.command);
        self.send_line(&request.command).await?;

        let raw = self.read_until_prompt(&prompt, &request.responses).await?;
        let output = normalize_output(&raw, &request.command, &prompt);

        match request.patterns.classify(&output) {
            Classification::Clean => Ok(output),
            Classification::Warning(matched) => Err(Error::RecoverableWarning {
                command: request.command.clone(),
                matched,
            }),
            Classification::Error(matched) => Err(Error::CommandFailed {
                command: request.command.clone(),
                matched,
            }),
            Classification::Critical(matched) => Err(Error::Critical {
                command: request.command.clone(),
                matched,
            }),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Best effort: the peer may already be gone after `exit`.
        let _ = self.channel.eof().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Client handler accepting any server host key.
struct AcceptAllHandler;

impl client::Handler for AcceptAllHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}
