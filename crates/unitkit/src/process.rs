//! Running local subprocesses with an optional timeout.
//!
//! Output is drained on reader threads while the child runs so a chatty
//! child cannot block on a full pipe. The timeout covers both the child
//! and its pipes.

use crate::error::{Error, Result};
use crate::outcome::ExecutionOutcome;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

const LOCAL: &str = "local";

/// Captured output of a finished child process
#[derive(Debug)]
pub struct ProcessOutput {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Convert into an outcome. A child killed by a signal has no exit code
    /// and is reported as a transport error.
    pub fn into_outcome(self) -> Result<ExecutionOutcome> {
        let Some(exit_code) = self.status.code() else {
            return Err(Error::transport(
                LOCAL,
                format!("`{}` was terminated by a signal", self.program),
            ));
        };

        Ok(ExecutionOutcome {
            exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}

/// Run a command to completion, capturing stdout and stderr.
///
/// A child still running after `timeout` is killed and reported as
/// [`Error::Timeout`].
pub fn run(mut cmd: Command, timeout: Option<Duration>) -> Result<ProcessOutput> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("Spawning {:?}", cmd);
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::transport(LOCAL, format!("could not execute `{}`: {}", program, e)))?;

    let deadline = timeout.map(|t| Instant::now() + t);
    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Stdout, child.stdout.take(), tx.clone());
    spawn_reader(Stream::Stderr, child.stderr.take(), tx);

    let waited = match timeout {
        Some(limit) => child.wait_timeout(limit),
        None => child.wait().map(Some),
    };

    let status = match waited {
        Ok(Some(status)) => status,
        Ok(None) => {
            log::warn!("`{}` exceeded {}s, killing", program, timeout.unwrap_or_default().as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out(timeout));
        }
        Err(e) => {
            return Err(Error::transport(
                LOCAL,
                format!("failed waiting for `{}`: {}", program, e),
            ));
        }
    };

    // A background process the child left behind can hold the pipes open
    let mut stdout = String::new();
    let mut stderr = String::new();
    for _ in 0..2 {
        let received = match deadline {
            Some(deadline) => rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .map_err(|_| ()),
            None => rx.recv().map_err(|_| ()),
        };
        match received {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(()) => {
                log::warn!("`{}` left its output open past the deadline", program);
                return Err(timed_out(timeout));
            }
        }
    }

    log::debug!("`{}` finished with {:?}", program, status.code());
    Ok(ProcessOutput {
        program,
        status,
        stdout,
        stderr,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R>(stream: Stream, source: Option<R>, tx: mpsc::Sender<(Stream, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

fn timed_out(timeout: Option<Duration>) -> Error {
    Error::Timeout {
        target: LOCAL.to_string(),
        after: timeout.unwrap_or_default(),
    }
}
