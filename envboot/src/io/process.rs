//! Helpers for running child processes with timeouts and bounded output.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long readers may keep draining after a timed-out child was killed.
///
/// Grandchildren (pip build backends, for instance) can inherit the pipes and
/// keep them open after the direct child is gone.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
/// With `echo`, every line the child writes is also copied to our stderr as it arrives, so long
/// installs show progress.
///
/// On timeout the child is killed and readers get [`KILL_GRACE`] to reach end of stream. Readers
/// still blocked after that are abandoned and whatever they captured so far is returned.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes, echo))]
pub fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    echo: bool,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_reader = StreamReader::spawn(stdout, output_limit_bytes, echo);
    let stderr_reader = StreamReader::spawn(stderr, output_limit_bytes, echo);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let deadline = timed_out.then(|| Instant::now() + KILL_GRACE);
    let (stdout, stdout_truncated) = stdout_reader.finish(deadline).context("join stdout")?;
    let (stderr, stderr_truncated) = stderr_reader.finish(deadline).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: usize,
}

/// A reader thread draining one pipe into a shared buffer.
struct StreamReader {
    captured: Arc<Mutex<Captured>>,
    done: Receiver<Result<()>>,
}

impl StreamReader {
    fn spawn<R: Read + Send + 'static>(reader: R, limit: usize, echo: bool) -> Self {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            // The receiver is gone only if the reader was abandoned.
            let _ = tx.send(read_stream_limited(reader, limit, echo, &sink));
        });
        Self { captured, done }
    }

    /// Wait for end of stream, or only until `deadline` when one is given.
    fn finish(self, deadline: Option<Instant>) -> Result<(Vec<u8>, usize)> {
        let outcome = match deadline {
            None => self
                .done
                .recv()
                .map_err(|_| anyhow!("output reader thread panicked"))?,
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match self.done.recv_timeout(wait) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        warn!("pipe still held open after kill, abandoning reader");
                        Ok(())
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        Err(anyhow!("output reader thread panicked"))
                    }
                }
            }
        };
        outcome?;

        let mut captured = self
            .captured
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        Ok((std::mem::take(&mut captured.bytes), captured.truncated))
    }
}

/// Read a stream line by line with a size limit, optionally echoing each line to stderr.
fn read_stream_limited<R: Read>(
    reader: R,
    limit: usize,
    echo: bool,
    sink: &Mutex<Captured>,
) -> Result<()> {
    let mut buf_reader = BufReader::new(reader);

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        if echo {
            let mut err = std::io::stderr().lock();
            if let Err(e) = err.write_all(&line).and_then(|()| err.flush()) {
                warn!(err = %e, "failed to echo child output");
            }
        }

        let mut captured = sink
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let remaining = limit.saturating_sub(captured.bytes.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            captured.bytes.extend_from_slice(&line[..keep]);
            captured.truncated += n.saturating_sub(keep);
        } else {
            captured.truncated += n;
        }
    }

    Ok(())
}
