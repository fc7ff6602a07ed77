//! Per-run interpreter context.
//!
//! Everything a script's primitives touch lives here: the filter being built,
//! the RNG, the run's view of the clock and widget registry, and the channel
//! back to the host. A fresh context is built for every `script` message, so
//! nothing leaks from one run into the next.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::Clock;
use crate::error::ScriptError;
use crate::filter::FilterState;
use crate::protocol::WorkerMessage;
use crate::rng::Rng;
use crate::scheduler::{Continuation, Resume, RunId};
use crate::script_diagnostics::ScriptDiagnostic;
use crate::script_log::ScriptLogger;
use crate::widget::{WidgetRegistry, WidgetShape};

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed,
    Failed {
        error: ScriptError,
        diagnostic: ScriptDiagnostic,
    },
    /// The run was superseded and unwound without finishing.
    Cancelled,
}

/// Events a run sends back to the interpreter.
#[derive(Debug)]
pub enum RunEvent {
    Message(WorkerMessage),
    Suspend(Continuation),
    Finished(RunOutcome),
}

/// The run was superseded, or the interpreter went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handles connecting a run to the interpreter that started it.
#[derive(Debug, Clone)]
pub struct RunLink {
    pub run: RunId,
    pub events: Sender<RunEvent>,
    pub cancel: Arc<AtomicBool>,
    pub clock: Arc<Mutex<Clock>>,
    pub widgets: Arc<Mutex<WidgetRegistry>>,
}

impl RunLink {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn send(&self, event: RunEvent) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        self.events.send(event).map_err(|_| Cancelled)
    }
}

/// Handle the native functions of one run share. Never leaves the run's thread.
pub type SharedContext = Rc<RefCell<InterpreterContext>>;

pub struct InterpreterContext {
    pub filter: FilterState,
    pub rng: Rng,
    link: RunLink,
    /// Widgets announced during this run, so repeated declarations are not
    /// re-sent.
    declared: HashMap<String, WidgetShape>,
    logger: ScriptLogger,
}

impl InterpreterContext {
    pub fn new(link: RunLink, log_limit_per_frame: u32) -> Self {
        Self {
            filter: FilterState::new(),
            rng: Rng::default(),
            link,
            declared: HashMap::new(),
            logger: ScriptLogger::new(log_limit_per_frame),
        }
    }

    pub fn run(&self) -> RunId {
        self.link.run
    }

    pub fn link(&self) -> &RunLink {
        &self.link
    }

    pub fn logger(&self) -> &ScriptLogger {
        &self.logger
    }

    pub fn is_cancelled(&self) -> bool {
        self.link.is_cancelled()
    }

    /// Rebuild the filter from scratch.
    pub fn reset(&mut self) {
        self.filter = FilterState::new();
    }

    pub fn post(&self, message: WorkerMessage) -> Result<(), Cancelled> {
        self.link.send(RunEvent::Message(message))
    }

    /// Publish a snapshot of the current filter.
    pub fn publish(&self) -> Result<(), Cancelled> {
        self.post(WorkerMessage::Render(self.filter.clone()))
    }

    /// Hand the interpreter a continuation and return the receiver to block
    /// on. The caller must release any borrow of the context before waiting.
    pub fn suspend(&self) -> Result<Receiver<Resume>, Cancelled> {
        let (continuation, wait) = Continuation::new(self.link.run);
        self.link.send(RunEvent::Suspend(continuation))?;
        Ok(wait)
    }

    /// Called after a frame tick woke the run.
    pub fn resumed(&self) {
        self.logger.reset_frame();
    }

    pub fn elapsed_ms(&self) -> f32 {
        lock(&self.link.clock).elapsed_ms()
    }

    pub fn delta_ms(&self) -> f32 {
        lock(&self.link.clock).delta_ms()
    }

    /// Announce a widget to the host unless this run already did so with the
    /// same shape.
    pub fn declare_widget(&mut self, name: &str, shape: WidgetShape) -> Result<(), Cancelled> {
        if self.declared.get(name) == Some(&shape) {
            return Ok(());
        }
        lock(&self.link.widgets).mark_declared(name, self.link.run);
        self.post(WorkerMessage::Widget {
            name: name.to_string(),
            widget: shape.clone(),
        })?;
        self.declared.insert(name.to_string(), shape);
        Ok(())
    }

    pub fn checkbox(&mut self, name: &str) -> Result<bool, Cancelled> {
        self.declare_widget(name, WidgetShape::Checkbox)?;
        Ok(lock(&self.link.widgets).checkbox(name))
    }

    /// `options` must be non-empty; the caller validates.
    pub fn radio(&mut self, name: &str, options: Vec<String>) -> Result<String, Cancelled> {
        self.declare_widget(name, WidgetShape::Radio { options: options.clone() })?;
        let selected = lock(&self.link.widgets).radio(name, &options);
        Ok(selected.unwrap_or_default())
    }

    pub fn slider(&mut self, name: &str, min: f32, max: f32, step: f32, initial: f32) -> Result<f32, Cancelled> {
        self.declare_widget(name, WidgetShape::Slider { min, max, step, initial })?;
        Ok(lock(&self.link.widgets).slider(name, initial))
    }
}
