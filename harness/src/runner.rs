use std::ffi::OsString;
use std::io::{self, Read, Write};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::HarnessError;
use crate::fixture::TestCase;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of running one test case.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    /// Output did not match; `actual` is the normalized output.
    WrongAnswer { actual: Vec<String> },
    /// Output did not match and the program exited unsuccessfully.
    RuntimeError { status: ExitStatus, stderr: String },
    /// The program was killed after running past the time limit.
    Timeout,
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Runs a compiled solution against test cases.
#[derive(Debug, Clone)]
pub struct Runner {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl Runner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Runner {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feed the case's input to a fresh process and judge its output.
    ///
    /// The time limit covers the process and the draining of its output,
    /// so a descendant that keeps stdout open also counts as a timeout.
    pub fn run(&self, case: &TestCase) -> Result<Outcome, HarnessError> {
        log::debug!("test #{}: running {}", case.num, self.program.display());

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can kill everything it started.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Feed stdin from its own thread: a program that never reads its
        // input must not block us past the deadline.
        let input = case.input.join("\n");
        let stdin = child.stdin.take();
        thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // The program may exit without reading everything.
                let _ = stdin.write_all(input.as_bytes());
            }
        });

        let (tx, rx) = mpsc::channel();
        spawn_reader(Stream::Stdout, child.stdout.take(), tx.clone());
        spawn_reader(Stream::Stderr, child.stderr.take(), tx);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::debug!("test #{}: killed after {:?}", case.num, self.timeout);
                terminate(&mut child);
                return Ok(Outcome::Timeout);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = None;
        let mut stderr = None;
        while stdout.is_none() || stderr.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((Stream::Stdout, bytes)) => stdout = Some(bytes?),
                Ok((Stream::Stderr, bytes)) => stderr = Some(bytes?),
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!(
                        "test #{}: output still open after {:?}",
                        case.num,
                        self.timeout
                    );
                    terminate(&mut child);
                    return Ok(Outcome::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("output reader thread exited early").into());
                }
            }
        }
        let stdout = stdout.unwrap_or_default();
        let stderr = stderr.unwrap_or_default();

        let actual = normalize_output(&String::from_utf8_lossy(&stdout));
        if case.check(&actual) {
            return Ok(Outcome::Pass);
        }
        if !status.success() {
            return Ok(Outcome::RuntimeError {
                status,
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok(Outcome::WrongAnswer { actual })
    }
}

/// Split program output into trimmed, non-empty lines.
pub fn normalize_output(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R>(stream: Stream, source: Option<R>, tx: Sender<(Stream, io::Result<Vec<u8>>)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match source {
            Some(mut source) => source.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone once the run has timed out.
        let _ = tx.send((stream, result));
    });
}

/// Kill the child and, on Unix, every process in its group.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) takes plain integers and touches no memory of ours.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
