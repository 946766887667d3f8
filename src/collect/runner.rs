//! 带超时的子进程执行
//! 子进程放进独立进程组，超时直接 SIGKILL 整个组，不留孤儿。
//! 输出读取同样受截止时间约束：脱离进程组的后代握着管道也不会拖住调用方。

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::{ErrorKind, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::utils::{AgentError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Minimum time left for reading pipes after the child exits, so output
/// already written is not lost when the child finishes right at the deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Completed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    TimedOut,
}

/// A shell command's result reduced to the text a caller reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Trimmed output, whatever the exit code.
    Output(String),
    /// Killed at the deadline; holds the `[timeout] <cmd>` sentinel.
    TimedOut(String),
    /// Could not be spawned or waited on; holds an `[error]` line.
    Failed(String),
}

impl CommandOutcome {
    pub fn into_text(self) -> String {
        match self {
            CommandOutcome::Output(s) => s,
            CommandOutcome::TimedOut(s) => s,
            CommandOutcome::Failed(s) => s,
        }
    }
}

// ── 公开接口 ────────────────────────────────────────────────────────────────

/// Runs `command` through `sh` with stderr folded into stdout.
///
/// Never fails: a non-zero exit still returns whatever the command printed,
/// a timeout returns [`timeout_sentinel`], and a spawn failure returns an
/// `[error]` line naming the command.
pub fn run(command: &str, timeout: Duration) -> String {
    run_shell(command, timeout).into_text()
}

/// Same as [`run`] but keeps which of the three cases happened.
pub fn run_shell(command: &str, timeout: Duration) -> CommandOutcome {
    match execute(shell(command), timeout) {
        Ok(Execution::Completed { stdout, .. }) => {
            CommandOutcome::Output(stdout.trim().to_string())
        }
        Ok(Execution::TimedOut) => CommandOutcome::TimedOut(timeout_sentinel(command)),
        Err(e) => CommandOutcome::Failed(format!("[error] {}: {}", command, e)),
    }
}

pub fn timeout_sentinel(command: &str) -> String {
    format!("[timeout] {}", command)
}

/// `sh -c` wrapper whose stderr is interleaved into stdout.
pub fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(format!("exec 2>&1\n{}", command));
    cmd
}

/// Spawns `cmd` in its own process group and waits at most `timeout`.
///
/// Output is read until the pipes close or the deadline passes, whichever
/// comes first; on timeout nothing captured is returned.
pub fn execute(mut cmd: Command, timeout: Duration) -> Result<Execution> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = cmd.spawn()?;
    let pgid = Pid::from_raw(child.id() as i32);
    let deadline = Instant::now() + timeout;

    let (tx, rx) = mpsc::channel();
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, Stream::Stdout, tx.clone());
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, Stream::Stderr, tx.clone());
    }
    drop(tx);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                terminate(&mut child, pgid);
                debug!(pid = pgid.as_raw(), ?timeout, "process group killed on timeout");
                return Ok(Execution::TimedOut);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                terminate(&mut child, pgid);
                return Err(AgentError::Process(format!("wait failed: {}", e)));
            }
        }
    };

    // 子进程已退出，但后台残留进程可能还握着管道
    let _ = killpg(pgid, Signal::SIGKILL);

    let (stdout, stderr) = gather(&rx, deadline.max(Instant::now() + DRAIN_GRACE));
    Ok(Execution::Completed { stdout, stderr, exit_code: status.code() })
}

// ── 工具 ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forwards chunks from `pipe` until EOF. The thread is detached: if a
/// process outside the group keeps the pipe open, it simply outlives the call.
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

fn gather(rx: &Receiver<(Stream, Vec<u8>)>, until: Instant) -> (String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    loop {
        let remaining = until.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, chunk)) => stdout.extend_from_slice(&chunk),
            Ok((Stream::Stderr, chunk)) => stderr.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!("pipes still held open at deadline, keeping partial output");
                break;
            }
        }
    }
    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

fn terminate(child: &mut Child, pgid: Pid) {
    if killpg(pgid, Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
    let _ = child.wait();
}
