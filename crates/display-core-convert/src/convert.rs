//! External format converters.
//!
//! A [`Converter`] wraps one external command invocation: input on stdin,
//! output on stdout, stderr captured for diagnostics. Synchronous use calls
//! [`Converter::convert`]; the async mode runs the child on a worker thread
//! and hands the result back through a [`ConvertHandle`] (block, poll, or
//! completion callback).

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use crossbeam_channel::{Receiver, bounded};
use log::debug;
use thiserror::Error;

/// A conversion pipeline failure.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The child process could not be spawned or piped.
    #[error("converter i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The child exited abnormally; stdout is discarded.
    #[error("converter exited with status {status}: {stderr}")]
    Failed {
        /// Exit status code (-1 when killed by a signal).
        status: i32,
        /// Captured stderr, lossily decoded.
        stderr: String,
    },
    /// The worker thread vanished without delivering a result.
    #[error("conversion abandoned")]
    Abandoned,
}

/// One external command template.
///
/// Argument templates may contain `{from}` and `{to}` placeholders, filled
/// with the format tags passed to [`Converter::convert`].
#[derive(Debug, Clone)]
pub struct Converter {
    program: String,
    args: Vec<String>,
}

impl Converter {
    /// Create a converter running `program` with `args`.
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Check whether the configured program can be spawned at all. Intended
    /// for gating strategy registration.
    pub fn available(&self) -> bool {
        match Command::new(&self.program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                let _ = child.kill();
                let _ = child.wait();
                true
            }
            Err(_) => false,
        }
    }

    /// Convert `input` from format `from` to format `to`.
    ///
    /// Spawns the child, writes `input` to its stdin, closes it, and reads
    /// stdout to EOF. Non-zero or abnormal exit is a hard
    /// [`ConvertError::Failed`] carrying the captured stderr.
    pub fn convert(&self, from: &str, to: &str, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{from}", from).replace("{to}", to))
            .collect();
        debug!("converting {from} -> {to} via {} {args:?}", self.program);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stdin is fed from a separate thread while stdout is drained here;
        // writing everything up front deadlocks once both pipes fill up. A
        // child that exits without draining stdin breaks the pipe, and the
        // exit status carries the real diagnosis, so write errors are
        // deliberately dropped.
        let stdin = child.stdin.take();
        let payload = input.to_vec();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(&payload);
            }
        });
        let output = child.wait_with_output()?;
        let _ = writer.join();

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    /// Run the conversion on a worker thread.
    ///
    /// Fire-and-forget: dropping the handle abandons the result. There is no
    /// cancellation; the one child process runs to completion and is reaped
    /// by the worker.
    pub fn convert_async(&self, from: &str, to: &str, input: Vec<u8>) -> ConvertHandle {
        let converter = self.clone();
        let from = from.to_string();
        let to = to.to_string();
        let (sender, receiver) = bounded(1);
        thread::spawn(move || {
            let _ = sender.send(converter.convert(&from, &to, &input));
        });
        ConvertHandle { receiver }
    }

    /// Run the conversion on a worker thread and invoke `callback` (on that
    /// thread) with the result, exactly once.
    pub fn convert_async_with<F>(&self, from: &str, to: &str, input: Vec<u8>, callback: F)
    where
        F: FnOnce(Result<Vec<u8>, ConvertError>) + Send + 'static,
    {
        let converter = self.clone();
        let from = from.to_string();
        let to = to.to_string();
        thread::spawn(move || {
            callback(converter.convert(&from, &to, &input));
        });
    }
}

/// Handle to an in-flight conversion.
pub struct ConvertHandle {
    receiver: Receiver<Result<Vec<u8>, ConvertError>>,
}

impl ConvertHandle {
    /// Block until the conversion completes.
    pub fn wait(self) -> Result<Vec<u8>, ConvertError> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(ConvertError::Abandoned))
    }

    /// Poll for the result without blocking; `None` while still running.
    pub fn try_result(&self) -> Option<Result<Vec<u8>, ConvertError>> {
        self.receiver.try_recv().ok()
    }
}
