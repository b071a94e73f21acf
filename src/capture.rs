//! Output capture
//!
//! The host session writes its standard output, standard error and rich
//! display payloads through a [`Console`]. While a capture is active those
//! writes are buffered (standard error is also forwarded live) so they can
//! be replayed once the cache decision has finished.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::CacheError;
use crate::logging::{operations, services};

/// A rich display payload: one representation per MIME type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DisplayData {
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DisplayData {
    /// Payload with a single `text/plain` representation
    pub fn text(text: impl Into<String>) -> Self {
        let mut data = BTreeMap::new();
        data.insert("text/plain".to_string(), text.into());
        Self {
            data,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>, content: impl Into<String>) -> Self {
        self.data.insert(mime.into(), content.into());
        self
    }
}

/// Destination of console output once it is not being captured
pub trait OutputSink: Send {
    fn write_stdout(&mut self, text: &str);
    fn write_stderr(&mut self, text: &str);
    fn publish(&mut self, output: &DisplayData);
}

/// Writes to the process's standard streams
#[derive(Debug, Default)]
pub struct TerminalSink;

impl OutputSink for TerminalSink {
    fn write_stdout(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn write_stderr(&mut self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }

    fn publish(&mut self, output: &DisplayData) {
        let rendered = match output.data.get("text/plain") {
            Some(text) => format!("{}\n", text),
            None => match serde_json::to_string(&output.data) {
                Ok(json) => format!("{}\n", json),
                Err(_) => return,
            },
        };
        self.write_stdout(&rendered);
    }
}

/// One piece of output as it reached a [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Stdout(String),
    Stderr(String),
    Display(DisplayData),
}

/// Records output in memory; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Concatenated standard output text
    pub fn stdout(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OutputEvent::Stdout(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Concatenated standard error text
    pub fn stderr(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OutputEvent::Stderr(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: OutputEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl OutputSink for MemorySink {
    fn write_stdout(&mut self, text: &str) {
        self.push(OutputEvent::Stdout(text.to_string()));
    }

    fn write_stderr(&mut self, text: &str) {
        self.push(OutputEvent::Stderr(text.to_string()));
    }

    fn publish(&mut self, output: &DisplayData) {
        self.push(OutputEvent::Display(output.clone()));
    }
}

#[derive(Debug, Default)]
struct CaptureBuffer {
    stdout: String,
    stderr: String,
    outputs: Vec<DisplayData>,
}

struct ConsoleState {
    sink: Box<dyn OutputSink>,
    capture: Option<CaptureBuffer>,
}

/// Shared handle to the session's output streams
///
/// Clones refer to the same streams, so the engine and the session can each
/// hold one.
#[derive(Clone)]
pub struct Console {
    state: Arc<Mutex<ConsoleState>>,
}

impl Console {
    pub fn new(sink: impl OutputSink + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConsoleState {
                sink: Box::new(sink),
                capture: None,
            })),
        }
    }

    /// Console over the process's standard streams
    pub fn stdio() -> Self {
        Self::new(TerminalSink)
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write standard output text
    pub fn print(&self, text: &str) {
        let mut state = self.lock();
        match state.capture.as_mut() {
            Some(buffer) => buffer.stdout.push_str(text),
            None => state.sink.write_stdout(text),
        }
    }

    /// Write a line of standard output
    pub fn println(&self, text: &str) {
        self.print(&format!("{}\n", text));
    }

    /// Write standard error text; forwarded immediately even when captured
    pub fn eprint(&self, text: &str) {
        let mut state = self.lock();
        state.sink.write_stderr(text);
        if let Some(buffer) = state.capture.as_mut() {
            buffer.stderr.push_str(text);
        }
    }

    /// Publish a rich display payload
    pub fn display(&self, output: DisplayData) {
        let mut state = self.lock();
        match state.capture.as_mut() {
            Some(buffer) => buffer.outputs.push(output),
            None => state.sink.publish(&output),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capture.is_some()
    }

    /// Start buffering output until the returned guard is finished or dropped
    ///
    /// Only one capture may be active per console.
    pub fn capture(&self) -> Result<CaptureGuard, CacheError> {
        let mut state = self.lock();
        if state.capture.is_some() {
            return Err(CacheError::CaptureActive);
        }
        state.capture = Some(CaptureBuffer::default());
        Ok(CaptureGuard {
            console: self.clone(),
            active: true,
        })
    }

    fn release(&self) -> CaptureBuffer {
        self.lock().capture.take().unwrap_or_default()
    }
}

/// An active capture scope
///
/// The console's real streams are restored when the guard is finished or
/// dropped, including during unwinding.
#[must_use = "dropping the guard discards the captured output"]
pub struct CaptureGuard {
    console: Console,
    active: bool,
}

impl CaptureGuard {
    /// Restore the real streams and hand back what was captured
    pub fn finish(mut self) -> CapturedOutput {
        self.active = false;
        let buffer = self.console.release();
        CapturedOutput {
            stdout: buffer.stdout,
            stderr: buffer.stderr,
            outputs: buffer.outputs,
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = self.console.release();
        }
    }
}

/// Output buffered during one capture scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub outputs: Vec<DisplayData>,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty() && self.outputs.is_empty()
    }

    /// Re-emit the buffered content on the console's real streams
    pub fn replay(self, console: &Console) {
        debug!(
            service = services::CAPTURE,
            operation = operations::REPLAY,
            stdout_bytes = self.stdout.len(),
            stderr_bytes = self.stderr.len(),
            outputs = self.outputs.len(),
            "replaying captured output"
        );

        let mut state = console.lock();
        if !self.stdout.is_empty() {
            state.sink.write_stdout(&self.stdout);
        }
        if !self.stderr.is_empty() {
            state.sink.write_stderr(&self.stderr);
        }
        for output in &self.outputs {
            state.sink.publish(output);
        }
    }
}
