//! Host-facing interpreter.
//!
//! The host feeds [`HostMessage`]s in and polls [`WorkerMessage`]s out. Each
//! `script` message starts a new run on its own thread; the previous run, if
//! any, is cancelled and never heard from again. Frame ticks resume suspended
//! runs through the [`FrameScheduler`].
//!
//! Guarantees:
//! - every run that is not superseded ends with exactly one `done`, preceded
//!   by one `error` if it failed;
//! - a superseded run emits nothing further, including messages it produced
//!   that the host has not polled yet;
//! - snapshots are delivered in the order `render()` was called.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::context::{lock, RunEvent, RunLink, RunOutcome};
use crate::error::ScriptError;
use crate::protocol::{HostMessage, WorkerMessage};
use crate::scheduler::{FrameScheduler, RunId};
use crate::script_diagnostics::{ScriptDiagnostic, ScriptDiagnosticKind, ScriptPhase};
use crate::scripting::ScriptEngine;
use crate::widget::WidgetRegistry;

/// Diagnostics kept for `take_diagnostics`; older entries are dropped.
const MAX_DIAGNOSTICS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterState {
    Idle,
    /// A run is executing.
    Running,
    /// The current run is parked in `frame()` or `render()`.
    Suspended,
}

struct ActiveRun {
    id: RunId,
    events: Receiver<RunEvent>,
    cancel: Arc<AtomicBool>,
    clock: Arc<Mutex<Clock>>,
    suspended: bool,
}

pub struct Interpreter {
    config: EngineConfig,
    widgets: Arc<Mutex<WidgetRegistry>>,
    scheduler: FrameScheduler,
    /// Id of the most recently started run.
    generation: RunId,
    run: Option<ActiveRun>,
    outbox: VecDeque<(RunId, WorkerMessage)>,
    diagnostics: VecDeque<ScriptDiagnostic>,
}

impl Interpreter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            widgets: Arc::new(Mutex::new(WidgetRegistry::new())),
            scheduler: FrameScheduler::new(),
            generation: 0,
            run: None,
            outbox: VecDeque::new(),
            diagnostics: VecDeque::new(),
        }
    }

    pub fn state(&self) -> InterpreterState {
        match &self.run {
            None => InterpreterState::Idle,
            Some(run) if run.suspended => InterpreterState::Suspended,
            Some(_) => InterpreterState::Running,
        }
    }

    /// Id of the most recently started run, 0 before the first.
    pub fn generation(&self) -> RunId {
        self.generation
    }

    /// Frame ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    pub fn handle(&mut self, message: HostMessage) {
        if let Some((name, value)) = message.widget_update() {
            lock(&self.widgets).update(name, value);
            return;
        }
        match message {
            HostMessage::Script(source) => self.start(&source),
            HostMessage::Frame => self.frame(),
            HostMessage::ClearWidgets => lock(&self.widgets).clear(),
            HostMessage::Checkbox { .. } | HostMessage::Radio { .. } | HostMessage::Slider { .. } => {}
        }
    }

    /// Replace whatever is running with `source`.
    pub fn start(&mut self, source: &str) {
        self.start_at(source, Instant::now());
    }

    /// Like [`start`](Self::start), with the run's clock starting at `now`.
    pub fn start_at(&mut self, source: &str, now: Instant) {
        self.supersede();

        self.generation += 1;
        let id = self.generation;
        let rejected = self.scheduler.begin(id);
        if rejected > 0 {
            log::debug!("rejected {} stale continuations", rejected);
        }

        let (events, receiver) = channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let clock = Arc::new(Mutex::new(Clock::new(now)));
        let link = RunLink {
            run: id,
            events,
            cancel: cancel.clone(),
            clock: clock.clone(),
            widgets: self.widgets.clone(),
        };

        let config = self.config.clone();
        let source = source.to_string();
        let spawned = thread::Builder::new()
            .name(format!("script-{id}"))
            .stack_size(self.config.thread_stack_size())
            .spawn(move || {
                let mut engine = ScriptEngine::new(link.clone(), &config);
                let outcome = engine.run(&source);
                // The interpreter may have moved on already.
                let _ = link.events.send(RunEvent::Finished(outcome));
            });

        self.run = Some(ActiveRun {
            id,
            events: receiver,
            cancel,
            clock,
            suspended: false,
        });
        log::info!("started script run {}", id);

        if let Err(err) = spawned {
            log::error!("failed to spawn script thread: {}", err);
            self.finish(RunOutcome::Failed {
                error: ScriptError::Runtime(format!("failed to start script: {err}")),
                diagnostic: internal_diagnostic(format!("failed to start script: {err}")),
            });
        }
    }

    /// Cancel the current run without letting it report anything else.
    fn supersede(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        run.cancel.store(true, Ordering::Relaxed);
        let before = self.outbox.len();
        self.outbox.retain(|(id, _)| *id != run.id);
        log::debug!(
            "superseded run {}, discarded {} undelivered messages",
            run.id,
            before - self.outbox.len()
        );
        // Dropping the receiver makes every later send from the old thread fail.
    }

    /// Deliver a frame tick now.
    pub fn frame(&mut self) {
        self.frame_at(Instant::now());
    }

    /// Deliver a frame tick: resume every parked continuation in order, then
    /// advance the current run's clock.
    pub fn frame_at(&mut self, now: Instant) {
        self.pump();
        let Some(run) = self.run.as_mut() else {
            log::debug!("frame tick with no script running");
            return;
        };
        // Resumed runs block on this lock until the clock has been advanced.
        let mut clock = lock(&run.clock);
        let resolved = self.scheduler.tick(&mut clock, now);
        drop(clock);
        if resolved > 0 {
            run.suspended = false;
        }
    }

    /// Collect everything the current run has sent so far without blocking.
    fn pump(&mut self) {
        loop {
            let event = match &self.run {
                None => return,
                Some(run) => run.events.try_recv(),
            };
            match event {
                Ok(event) => self.dispatch(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.lost_run();
                    return;
                }
            }
        }
    }

    /// Block until the current run is parked at a frame or has finished.
    pub fn settle(&mut self) {
        self.settle_until(None);
    }

    /// Like [`settle`](Self::settle), giving up after `timeout`. Returns
    /// whether the run settled.
    pub fn settle_timeout(&mut self, timeout: Duration) -> bool {
        self.settle_until(Some(Instant::now() + timeout))
    }

    fn settle_until(&mut self, deadline: Option<Instant>) -> bool {
        loop {
            let event = match &self.run {
                None => return true,
                Some(run) if run.suspended => return true,
                Some(run) => match deadline {
                    None => run.events.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        run.events.recv_timeout(remaining)
                    }
                },
            };
            match event {
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => self.lost_run(),
            }
        }
    }

    fn dispatch(&mut self, event: RunEvent) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        match event {
            RunEvent::Message(message) => self.outbox.push_back((run.id, message)),
            RunEvent::Suspend(continuation) => {
                self.scheduler.suspend(continuation);
                run.suspended = true;
            }
            RunEvent::Finished(outcome) => self.finish(outcome),
        }
    }

    /// The run's thread went away without reporting an outcome.
    fn lost_run(&mut self) {
        log::error!("script thread exited without finishing");
        self.finish(RunOutcome::Failed {
            error: ScriptError::Runtime("script terminated unexpectedly".into()),
            diagnostic: internal_diagnostic("script terminated unexpectedly".into()),
        });
    }

    fn finish(&mut self, outcome: RunOutcome) {
        let Some(run) = self.run.take() else {
            return;
        };
        match outcome {
            RunOutcome::Completed => log::info!("script run {} completed", run.id),
            RunOutcome::Cancelled => log::debug!("script run {} cancelled", run.id),
            RunOutcome::Failed { error, diagnostic } => {
                log::warn!("script run {} failed: {}", run.id, error);
                self.outbox.push_back((run.id, WorkerMessage::Error(error.to_string())));
                self.push_diagnostic(diagnostic);
            }
        }
        self.outbox.push_back((run.id, WorkerMessage::Done));
        self.scheduler.end();
    }

    fn push_diagnostic(&mut self, diagnostic: ScriptDiagnostic) {
        self.diagnostics.push_back(diagnostic);
        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }

    /// Take every message produced since the last poll, in order.
    pub fn poll(&mut self) -> Vec<WorkerMessage> {
        self.pump();
        self.outbox.drain(..).map(|(_, message)| message).collect()
    }

    pub fn take_diagnostics(&mut self) -> Vec<ScriptDiagnostic> {
        self.diagnostics.drain(..).collect()
    }

    /// Widgets the latest script did not declare.
    pub fn orphaned_widgets(&self) -> Vec<String> {
        lock(&self.widgets).orphans(self.generation)
    }

    /// Forget widgets the latest script did not declare.
    pub fn prune_widgets(&mut self) -> Vec<String> {
        lock(&self.widgets).prune(self.generation)
    }
}

fn internal_diagnostic(message: String) -> ScriptDiagnostic {
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::RuntimeError,
        phase: ScriptPhase::Run,
        message,
        location: None,
        raw: None,
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.store(true, Ordering::Relaxed);
        }
        self.scheduler.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn run_to_end(interpreter: &mut Interpreter, source: &str) -> Vec<WorkerMessage> {
        interpreter.start(source);
        assert!(interpreter.settle_timeout(TIMEOUT));
        interpreter.poll()
    }

    #[test]
    fn test_completes_with_done() {
        let mut interpreter = Interpreter::default();
        let out = run_to_end(&mut interpreter, "circle();");
        assert_eq!(out, vec![WorkerMessage::Done]);
        assert_eq!(interpreter.state(), InterpreterState::Idle);
    }

    #[test]
    fn test_error_then_done() {
        let mut interpreter = Interpreter::default();
        let out = run_to_end(&mut interpreter, "throw \"boom\";");
        assert_eq!(out, vec![WorkerMessage::Error("boom".into()), WorkerMessage::Done]);
        assert_eq!(interpreter.take_diagnostics().len(), 1);
    }

    #[test]
    fn test_render_suspends_until_frame() {
        let mut interpreter = Interpreter::default();
        interpreter.start("render(); render();");
        assert!(interpreter.settle_timeout(TIMEOUT));
        assert_eq!(interpreter.state(), InterpreterState::Suspended);
        assert_eq!(interpreter.poll().len(), 1);

        interpreter.frame();
        assert!(interpreter.settle_timeout(TIMEOUT));
        assert_eq!(interpreter.poll().len(), 1);

        interpreter.frame();
        assert!(interpreter.settle_timeout(TIMEOUT));
        assert_eq!(interpreter.poll(), vec![WorkerMessage::Done]);
    }

    #[test]
    fn test_widget_updates_reach_registry() {
        let mut interpreter = Interpreter::default();
        interpreter.handle(HostMessage::Checkbox { name: "a".into(), value: true });
        let out = run_to_end(&mut interpreter, "if checkbox(\"a\") { save(); }");
        assert!(out.contains(&WorkerMessage::Save));
    }

    #[test]
    fn test_orphaned_widgets() {
        let mut interpreter = Interpreter::default();
        run_to_end(&mut interpreter, "checkbox(\"a\"); checkbox(\"b\");");
        run_to_end(&mut interpreter, "checkbox(\"b\");");
        assert_eq!(interpreter.orphaned_widgets(), vec!["a".to_string()]);
        assert_eq!(interpreter.prune_widgets(), vec!["a".to_string()]);
        assert!(interpreter.orphaned_widgets().is_empty());
    }

    #[test]
    fn test_supersede_drops_pending_output() {
        let mut interpreter = Interpreter::default();
        interpreter.start("loop { render(); }");
        assert!(interpreter.settle_timeout(TIMEOUT));
        interpreter.start("circle();");
        assert!(interpreter.settle_timeout(TIMEOUT));
        assert_eq!(interpreter.poll(), vec![WorkerMessage::Done]);
    }
}
