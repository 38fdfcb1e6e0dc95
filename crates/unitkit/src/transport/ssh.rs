//! SSH transport
//!
//! Re-invokes sysunit on the remote host over an SSH session:
//! `<remote_command> <action> <unit> <name=value>...`. The remote result
//! line, its stderr and its exit status become the local outcome.

use super::{Invocation, Transport, TransportState};
use crate::error::{ENGINE_FAILURE_EXIT_CODE, Error, Result};
use crate::outcome::ExecutionOutcome;
use crate::report;
use crate::target::{SshTarget, Target};
use ssh2::{Channel, ErrorCode, Session};
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;

/// Pause between polls of a channel with nothing to read
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit status of a shell that could not find the command
const COMMAND_NOT_FOUND: i32 = 127;

/// Asks the operator for a password when key-based auth fails
pub trait PasswordPrompt: Send + Sync {
    fn password(&self, user: &str, host: &str) -> anyhow::Result<String>;
}

/// SSH connection settings
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Port used when the target URI has none
    pub port: u16,
    /// Command that runs sysunit on the remote host
    pub remote_command: String,
    /// Private keys tried after the agent, in order
    pub identity_files: Vec<PathBuf>,
    /// Bound on TCP connect and handshake
    pub connect_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: 22,
            remote_command: "sysunit".to_string(),
            identity_files: Vec::new(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

enum Connection {
    Disconnected,
    Connected(Session),
}

pub struct SshTransport {
    target: Target,
    remote: SshTarget,
    options: SshOptions,
    timeout: Option<Duration>,
    prompt: Option<Arc<dyn PasswordPrompt>>,
    state: TransportState,
    connection: Connection,
}

impl SshTransport {
    pub fn new(
        remote: SshTarget,
        options: SshOptions,
        timeout: Option<Duration>,
        prompt: Option<Arc<dyn PasswordPrompt>>,
    ) -> Self {
        Self {
            target: Target::Ssh(remote.clone()),
            remote,
            options,
            timeout,
            prompt,
            state: TransportState::Idle,
            connection: Connection::Disconnected,
        }
    }

    fn set_state(&mut self, state: TransportState) {
        log::debug!("ssh transport {}: {} -> {}", self.target, self.state, state);
        self.state = state;
    }

    fn port(&self) -> u16 {
        self.remote.port.unwrap_or(self.options.port)
    }

    fn connect(&mut self) -> Result<()> {
        if matches!(self.connection, Connection::Connected(_)) {
            return Ok(());
        }
        self.set_state(TransportState::Connecting);

        let tcp = self.open_tcp()?;
        let connect_timeout = self.options.connect_timeout;

        let mut session = Session::new()
            .map_err(|e| self.ssh_failure("could not create SSH session", e, None))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(millis(Some(connect_timeout)));
        session
            .handshake()
            .map_err(|e| self.ssh_failure("SSH handshake failed", e, Some(connect_timeout)))?;

        self.authenticate(&session)?;

        // Execution is bounded by the caller's timeout, not the connect timeout
        session.set_timeout(millis(self.timeout));
        self.connection = Connection::Connected(session);
        Ok(())
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs = (self.remote.host.as_str(), self.port())
            .to_socket_addrs()
            .map_err(|e| {
                Error::transport(
                    &self.target,
                    format!("could not resolve {}: {}", self.remote.host, e),
                )
            })?;
        Ok(addrs.collect())
    }

    fn open_tcp(&self) -> Result<TcpStream> {
        let addrs = self.resolve()?;

        let mut last_error = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.options.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("TCP connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Error::Timeout {
                target: self.target.to_string(),
                after: self.options.connect_timeout,
            },
            Some(e) => Error::transport(&self.target, format!("TCP connect failed: {}", e)),
            None => Error::transport(
                &self.target,
                format!("{} resolved to no addresses", self.remote.host),
            ),
        })
    }

    /// Agent identities first, then identity files, then a password prompt
    fn authenticate(&self, session: &Session) -> Result<()> {
        let user = self.remote.user.as_str();

        match auth_via_agent(session, user) {
            Ok(()) => return Ok(()),
            Err(e) => log::info!("SSH agent auth to {} failed: {}", self.target, e),
        }

        for key in &self.options.identity_files {
            if !key.exists() {
                continue;
            }
            match session.userauth_pubkey_file(user, None, key, None) {
                Ok(()) if session.authenticated() => return Ok(()),
                Ok(()) => {}
                Err(e) => log::info!("SSH key {} rejected by {}: {}", key.display(), self.target, e),
            }
        }

        if let Some(prompt) = &self.prompt {
            let password = prompt.password(user, &self.remote.host).map_err(|e| {
                Error::transport(&self.target, format!("could not read password: {:#}", e))
            })?;
            match session.userauth_password(user, &password) {
                Ok(()) if session.authenticated() => return Ok(()),
                Ok(()) => {}
                Err(e) => log::info!("SSH password auth to {} failed: {}", self.target, e),
            }
        }

        Err(Error::transport(
            &self.target,
            format!("authentication failed for user `{}`", user),
        ))
    }

    fn run_remote(&mut self, invocation: &Invocation<'_>) -> Result<ExecutionOutcome> {
        let command = remote_command_line(&self.options.remote_command, invocation, self.timeout);
        log::debug!("command string: {}", command);

        self.set_state(TransportState::Executing);

        let Connection::Connected(session) = &self.connection else {
            return Err(Error::transport(
                &self.target,
                "attempted to execute on an unconnected session",
            ));
        };

        let mut channel = session
            .channel_session()
            .map_err(|e| self.ssh_failure("could not open channel", e, self.timeout))?;
        channel
            .exec(&command)
            .map_err(|e| self.ssh_failure("could not execute remote command", e, self.timeout))?;

        let (stdout, stderr) = self.drain(session, &mut channel)?;

        channel
            .wait_close()
            .map_err(|e| self.ssh_failure("could not close channel", e, self.timeout))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| self.ssh_failure("could not read remote exit status", e, self.timeout))?;

        log::debug!("remote exit status: {}", exit_code);
        self.classify(invocation, exit_code, &stdout, stderr)
    }

    /// Read stdout and stderr together until the remote closes both, so a
    /// full stderr window never stalls the stdout reader
    fn drain(&self, session: &Session, channel: &mut Channel) -> Result<(String, String)> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut buf = [0u8; 8192];

        session.set_blocking(false);
        let result = loop {
            let mut progressed = false;

            match read_some(channel, &mut buf) {
                Ok(n) => {
                    progressed |= n > 0;
                    stdout.extend_from_slice(&buf[..n]);
                }
                Err(e) => break Err(self.io_failure("could not read remote output", e)),
            }
            match read_some(&mut channel.stderr(), &mut buf) {
                Ok(n) => {
                    progressed |= n > 0;
                    stderr.extend_from_slice(&buf[..n]);
                }
                Err(e) => break Err(self.io_failure("could not read remote error output", e)),
            }

            if progressed {
                continue;
            }
            if channel.eof() {
                break Ok(());
            }
            if let (Some(deadline), Some(after)) = (deadline, self.timeout) {
                if Instant::now() >= deadline {
                    break Err(Error::Timeout {
                        target: self.target.to_string(),
                        after,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };
        session.set_blocking(true);

        result.map(|()| {
            (
                String::from_utf8_lossy(&stdout).into_owned(),
                String::from_utf8_lossy(&stderr).into_owned(),
            )
        })
    }

    /// Separate remote engine failures from action outcomes
    fn classify(
        &self,
        invocation: &Invocation<'_>,
        exit_code: i32,
        stdout: &str,
        stderr: String,
    ) -> Result<ExecutionOutcome> {
        if exit_code == i32::from(ENGINE_FAILURE_EXIT_CODE) {
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("remote engine failure")
                .to_string();
            return Err(Error::Remote {
                target: self.target.to_string(),
                message,
            });
        }

        if exit_code == COMMAND_NOT_FOUND && stdout.trim().is_empty() {
            return Err(Error::transport(
                &self.target,
                format!(
                    "remote command `{}` not found",
                    self.options.remote_command
                ),
            ));
        }

        Ok(ExecutionOutcome {
            exit_code,
            stdout: report::strip_result_line(invocation.unit, invocation.action_name, stdout),
            stderr,
        })
    }

    fn ssh_failure(&self, what: &str, err: ssh2::Error, limit: Option<Duration>) -> Error {
        match (err.code(), limit) {
            (ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT), Some(after)) => Error::Timeout {
                target: self.target.to_string(),
                after,
            },
            _ => Error::transport(&self.target, format!("{}: {}", what, err)),
        }
    }

    fn io_failure(&self, what: &str, err: io::Error) -> Error {
        match (err.kind(), self.timeout) {
            (io::ErrorKind::TimedOut, Some(after)) => Error::Timeout {
                target: self.target.to_string(),
                after,
            },
            _ => Error::transport(&self.target, format!("{}: {}", what, err)),
        }
    }
}

impl Transport for SshTransport {
    fn target(&self) -> &Target {
        &self.target
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn execute(&mut self, invocation: &Invocation<'_>) -> Result<ExecutionOutcome> {
        let result = match self.connect() {
            Ok(()) => self.run_remote(invocation),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.set_state(TransportState::Completed),
            Err(_) => self.set_state(TransportState::Failed),
        }

        result
    }
}

fn auth_via_agent(session: &Session, user: &str) -> std::result::Result<(), ssh2::Error> {
    let mut agent = session.agent()?;
    agent.connect()?;
    agent.list_identities()?;

    for identity in agent.identities()? {
        if agent.userauth(user, &identity).is_ok() && session.authenticated() {
            return Ok(());
        }
    }

    Err(ssh2::Error::new(
        ErrorCode::Session(LIBSSH2_ERROR_AUTHENTICATION_FAILED),
        "no agent identity was accepted",
    ))
}

/// Non-blocking read; "nothing yet" reads as zero bytes
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    match reader.read(buf) {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        other => other,
    }
}

/// libssh2 treats 0 as "no timeout"
fn millis(timeout: Option<Duration>) -> u32 {
    timeout.map_or(0, |t| u32::try_from(t.as_millis()).unwrap_or(u32::MAX))
}

/// Build the remote shell command. Tokens are forwarded verbatim, quoted
/// for the remote shell; the remote command itself is used as configured.
pub fn remote_command_line(
    remote_command: &str,
    invocation: &Invocation<'_>,
    timeout: Option<Duration>,
) -> String {
    let mut parts = vec![
        remote_command.to_string(),
        shell_escape(invocation.action_name),
    ];
    if let Some(timeout) = timeout {
        parts.push("--timeout".to_string());
        parts.push(timeout.as_secs().max(1).to_string());
    }
    parts.push(shell_escape(invocation.unit));
    parts.extend(invocation.tokens.iter().map(|t| shell_escape(t)));
    parts.join(" ")
}

fn shell_escape(input: &str) -> String {
    if !input.is_empty()
        && input
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | ','))
    {
        return input.to_string();
    }
    let mut escaped = String::from("'");
    for ch in input.chars() {
        if ch == '\'' {
            escaped.push_str("'\"'\"'");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgumentContext;
    use crate::unit::{ActionContext, FnAction};

    fn noop(_ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome> {
        Ok(ExecutionOutcome::success(""))
    }

    const NOOP: FnAction = FnAction::new("noop", &[], noop);

    fn transport() -> SshTransport {
        let remote = SshTarget {
            user: "root".into(),
            host: "ssh_host".into(),
            port: None,
        };
        SshTransport::new(remote, SshOptions::default(), None, None)
    }

    fn with_invocation<R>(tokens: &[String], f: impl FnOnce(&Invocation<'_>) -> R) -> R {
        let args = ArgumentContext::from_tokens(tokens).unwrap();
        let invocation = Invocation {
            unit: "args",
            action_name: "apply",
            action: &NOOP,
            args: &args,
            tokens,
        };
        f(&invocation)
    }

    #[test]
    fn test_remote_command_line() {
        let tokens = vec!["name=bob".to_string()];
        let line = with_invocation(&tokens, |inv| remote_command_line("sysunit", inv, None));
        assert_eq!(line, "sysunit apply args name=bob");
    }

    #[test]
    fn test_remote_command_line_quotes_tokens() {
        let tokens = vec!["name=bob o'neil".to_string(), "motd=$(reboot)".to_string()];
        let line = with_invocation(&tokens, |inv| {
            remote_command_line("/usr/local/bin/sysunit", inv, Some(Duration::from_secs(30)))
        });
        assert_eq!(
            line,
            "/usr/local/bin/sysunit apply --timeout 30 args 'name=bob o'\"'\"'neil' 'motd=$(reboot)'"
        );
    }

    #[test]
    fn test_classify_strips_result_prefix() {
        let t = transport();
        let tokens = vec!["name=bob".to_string()];
        let outcome = with_invocation(&tokens, |inv| {
            t.classify(inv, 0, "[args|apply] hi bob\n", String::new())
        })
        .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.message(), "hi bob");
    }

    #[test]
    fn test_classify_action_failure_is_outcome() {
        let t = transport();
        let outcome = with_invocation(&[], |inv| {
            t.classify(inv, 3, "[args|apply] nope\n", "details".into())
        })
        .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr, "details");
    }

    #[test]
    fn test_classify_remote_engine_failure() {
        let t = transport();
        let err = with_invocation(&[], |inv| {
            t.classify(inv, 125, "", "✗ Unit resolution failed: unit not found: args\n".into())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Remote { ref message, .. } if message.contains("unit not found")));
    }

    #[test]
    fn test_classify_missing_remote_command() {
        let t = transport();
        let err = with_invocation(&[], |inv| {
            t.classify(inv, 127, "", "sh: sysunit: not found".into())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Transport { ref message, .. } if message.contains("not found")));
    }

    #[test]
    fn test_unreachable_host_is_transport_failure() {
        let remote = SshTarget {
            user: "root".into(),
            host: "host.invalid".into(),
            port: Some(22),
        };
        let mut t = SshTransport::new(remote, SshOptions::default(), None, None);
        let result = with_invocation(&[], |inv| t.execute(inv));
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Transport { .. } | Error::Timeout { .. }));
        assert_eq!(t.state(), TransportState::Failed);
    }

    #[test]
    fn test_millis() {
        assert_eq!(millis(None), 0);
        assert_eq!(millis(Some(Duration::from_secs(2))), 2000);
    }

    #[test]
    fn test_resolves_ipv6_literal() {
        let Target::Ssh(remote) = "ssh://root@[::1]:2222".parse::<Target>().unwrap() else {
            panic!("expected an SSH target");
        };
        let t = SshTransport::new(remote, SshOptions::default(), None, None);

        let addrs = t.resolve().unwrap();
        assert_eq!(addrs, vec!["[::1]:2222".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_read_some_treats_would_block_as_empty() {
        struct Pending;
        impl Read for Pending {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::WouldBlock.into())
            }
        }

        let mut buf = [0u8; 4];
        assert_eq!(read_some(&mut Pending, &mut buf).unwrap(), 0);
        assert_eq!(read_some(&mut &b"ab"[..], &mut buf).unwrap(), 2);
    }

    #[test]
    fn test_port_defaults_from_options() {
        let t = transport();
        assert_eq!(t.port(), 22);
    }
}
