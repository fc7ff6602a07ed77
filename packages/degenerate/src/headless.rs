//! Headless script execution.
//!
//! Drives an [`Interpreter`] without a renderer: the script is started, then
//! the host alternates between letting the run settle and delivering a frame
//! tick, until the script finishes or the frame budget is spent. Everything
//! the script sends is collected into a [`Transcript`].

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::filter::FilterState;
use crate::interpreter::{Interpreter, InterpreterState};
use crate::protocol::{HostMessage, WorkerMessage};
use crate::script_diagnostics::ScriptDiagnostic;

/// Configuration for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Maximum number of frame ticks to deliver.
    pub frames: u64,
    /// Wall-clock pause before each tick.
    pub interval: Duration,
    /// How long a run may go without suspending or finishing.
    pub settle_timeout: Duration,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 60,
            interval: Duration::ZERO,
            settle_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("script neither yielded nor finished within {timeout:?} (after {frames} frames)")]
    Stalled { frames: u64, timeout: Duration },
}

/// Everything a headless run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub messages: Vec<WorkerMessage>,
    /// Frame ticks delivered.
    pub frames: u64,
    /// Whether the script reached `done` within the frame budget.
    pub finished: bool,
    #[serde(skip)]
    pub diagnostics: Vec<ScriptDiagnostic>,
}

impl Transcript {
    pub fn snapshots(&self) -> impl Iterator<Item = &FilterState> {
        self.messages.iter().filter_map(WorkerMessage::as_render)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots().count()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                WorkerMessage::Error(e) => Some(e.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn done_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_done()).count()
    }

    /// One JSON message per line, in delivery order.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(&message.to_json()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// SHA-256 of the JSON lines encoding.
    pub fn hash(&self) -> serde_json::Result<String> {
        let lines = self.to_json_lines()?;
        Ok(format!("{:x}", Sha256::digest(lines.as_bytes())))
    }
}

pub struct HeadlessHost {
    interpreter: Interpreter,
    config: HeadlessConfig,
}

impl HeadlessHost {
    pub fn new(engine: EngineConfig, config: HeadlessConfig) -> Self {
        Self {
            interpreter: Interpreter::new(engine),
            config,
        }
    }

    /// Forward a host message, e.g. a widget value, before or between runs.
    pub fn send(&mut self, message: HostMessage) {
        self.interpreter.handle(message);
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Run `source` until it finishes or the frame budget runs out.
    pub fn run(&mut self, source: &str) -> Result<Transcript, HeadlessError> {
        let started = Instant::now();
        self.interpreter.start_at(source, started);

        let mut transcript = Transcript::default();
        loop {
            if !self.interpreter.settle_timeout(self.config.settle_timeout) {
                return Err(HeadlessError::Stalled {
                    frames: transcript.frames,
                    timeout: self.config.settle_timeout,
                });
            }
            transcript.messages.extend(self.interpreter.poll());

            if self.interpreter.state() == InterpreterState::Idle
                || transcript.frames >= self.config.frames
            {
                break;
            }

            if !self.config.interval.is_zero() {
                thread::sleep(self.config.interval);
            }
            self.interpreter.frame();
            transcript.frames += 1;
        }

        transcript.finished = self.interpreter.state() == InterpreterState::Idle;
        transcript.diagnostics = self.interpreter.take_diagnostics();
        log::info!(
            "headless run: {} frames, {} snapshots, finished={} in {:.1}ms",
            transcript.frames,
            transcript.snapshot_count(),
            transcript.finished,
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(transcript)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(EngineConfig::default(), HeadlessConfig::default())
    }
}
