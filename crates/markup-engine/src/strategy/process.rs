//! Child process execution with concurrent pipe draining and timeouts.
//!
//! Standard input is written on its own thread while standard output and
//! standard error are drained on two more, so a tool that produces output
//! before consuming all of its input can never deadlock against us. The
//! readers report back over a channel, which keeps the time bound in force
//! until both streams are collected. On Unix the child leads its own process
//! group: the group is killed when the bound is exceeded, and again once the
//! child exits so that no descendant outlives the call.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of one finished child process.
#[derive(Debug)]
pub(crate) struct ProcessExecution {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Failure to run a child process to completion.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProcessError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),
    #[error("failed to read process output: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write process input: {0}")]
    Write(#[source] io::Error),
    #[error("process exceeded {0:?}")]
    TimedOut(Duration),
}

/// Time bound for one run.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    timeout: Duration,
    at: Instant,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        Self {
            timeout,
            at: Instant::now() + timeout,
        }
    }

    fn remaining(self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    fn expired(self) -> bool {
        Instant::now() >= self.at
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

/// Run `program` with `args`, feeding `input` on stdin.
///
/// Blocks until the process exits and both output streams are closed, or
/// until `timeout` elapses, whichever comes first.
pub(crate) fn run(
    program: &Path,
    args: &[String],
    input: &[u8],
    timeout: Option<Duration>,
) -> Result<ProcessExecution, ProcessError> {
    let deadline = timeout.map(Deadline::start);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(ProcessError::Spawn)?;

    // Helper threads own their pipes: on expiry they are abandoned rather
    // than joined, and finish once the pipes close.
    let writer = child.stdin.take().map(|mut pipe| {
        let input = input.to_vec();
        thread::spawn(move || write_input(&mut pipe, &input))
    });
    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Stdout, child.stdout.take(), tx.clone());
    spawn_reader(Stream::Stderr, child.stderr.take(), tx);

    let status = match wait(&mut child, deadline) {
        Ok(status) => status,
        Err(e) => {
            terminate(&mut child);
            return Err(e);
        }
    };
    kill_group(child.id());

    let (stdout, stderr) = collect(&rx, deadline)?;
    if let Some(writer) = writer {
        writer
            .join()
            .map_err(|_| ProcessError::Write(io::Error::other("input writer panicked")))??;
    }

    Ok(ProcessExecution {
        status,
        stdout,
        stderr,
    })
}

fn write_input(pipe: &mut ChildStdin, input: &[u8]) -> Result<(), ProcessError> {
    // A tool may legitimately exit before consuming its whole input.
    match pipe.write_all(input).and_then(|()| pipe.flush()) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(ProcessError::Write(e)),
        _ => Ok(()),
    }
}

fn spawn_reader(stream: Stream, pipe: Option<impl Read + Send + 'static>, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone when the run already gave up.
        let _ = tx.send((stream, result));
    });
}

/// Receive both output streams, bounded by `deadline`.
fn collect(
    rx: &Receiver<Chunk>,
    deadline: Option<Deadline>,
) -> Result<(Vec<u8>, Vec<u8>), ProcessError> {
    let mut stdout = None;
    let mut stderr = None;

    while stdout.is_none() || stderr.is_none() {
        let (stream, result) = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.remaining()).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    tracing::debug!("Output still open after the time bound");
                    ProcessError::TimedOut(deadline.timeout)
                }
                RecvTimeoutError::Disconnected => reader_stopped(),
            })?,
            None => rx.recv().map_err(|_| reader_stopped())?,
        };
        let bytes = result.map_err(ProcessError::Read)?;
        match stream {
            Stream::Stdout => stdout = Some(bytes),
            Stream::Stderr => stderr = Some(bytes),
        }
    }

    Ok((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
}

fn reader_stopped() -> ProcessError {
    ProcessError::Read(io::Error::other("output reader stopped"))
}

fn wait(child: &mut Child, deadline: Option<Deadline>) -> Result<ExitStatus, ProcessError> {
    let Some(deadline) = deadline else {
        return child.wait().map_err(ProcessError::Wait);
    };

    loop {
        if let Some(status) = child.try_wait().map_err(ProcessError::Wait)? {
            return Ok(status);
        }
        if deadline.expired() {
            return Err(ProcessError::TimedOut(deadline.timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child together with everything it spawned, then reap it.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "Failed to kill child process");
    }
    if let Err(e) = child.wait() {
        tracing::debug!(error = %e, "Failed to reap child process");
    }
}

/// SIGKILL the process group led by `pid`. An empty group is fine.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
