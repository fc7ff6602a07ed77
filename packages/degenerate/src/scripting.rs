//! Rhai scripting integration.
//!
//! One `ScriptEngine` is built per script run, on the run's own thread. It owns
//! the sandboxed Rhai engine and the run's [`InterpreterContext`].
//!
//! Available API:
//! - Masks: `all()`, `circle()`, `cross()`, `square()`, `top()`, `check()`,
//!   `x()`, `mod(divisor, remainder)`, `rows(count, step)`,
//!   `equalizer()`, `frequency()`, `timeDomain()`, `wave()`
//! - Operations: `identity()`, `invert()`, `debugColor()`,
//!   `rotateColor(axis, turns)`
//! - Parameters: `alpha(v)`, `defaultColor([r, g, b])`, `wrap()`, `wrap(bool)`,
//!   `coordinates(bool)`, `repeat(n)`
//! - Transform: `scale(f)`, `rotate(r)`, `translate([x, y])`,
//!   `transform(r, [sx, sy], [tx, ty])`, `identityTransform()`
//! - `reset()`, `reboot()`
//! - Suspension: `render()`, `frame()`, `sleep(ms)`; clock: `elapsed()`,
//!   `delta()`
//! - Widgets: `checkbox(name)`, `radio(name, options)`, `slider(name, ...)`
//! - Randomness: `seed(n)`, `choose(items)`, `random()`
//! - Host directives: `clear()`, `save()`, `resolution(n)`, `record()`,
//!   `oscillatorFrequency(hz)`, `oscillatorGain(g)`, `decibelRange(min, max)`
//! - `assert(cond)`, `assert(cond, message)`, `range(n)`, `TAU`, `PI`
//!
//! Logging:
//! - `log.info(value)`, `log.warn(value)`, `log.error(value)`
//! - `print(value)` and `debug(value)` also go to the script logger

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;

use rhai::{Dynamic, Engine, EvalAltResult};

use crate::config::EngineConfig;
use crate::context::{InterpreterContext, RunLink, RunOutcome, SharedContext};
use crate::error::{innermost, ScriptError};
use crate::filter_rhai::register_filter_api;
use crate::frame_rhai::register_frame_api;
use crate::host_rhai::{register_globals, register_host_api};
use crate::rng_rhai::register_rng_api;
use crate::script_diagnostics::{from_eval_error, from_parse_error, ScriptDiagnostic};
use crate::widget_rhai::register_widget_api;

/// Engine with the sandbox limits applied and nothing registered.
fn sandboxed(config: &EngineConfig) -> Engine {
    let mut engine = Engine::new();
    config.apply(&mut engine);
    engine
}

/// Compile `script` without running it.
pub fn check(script: &str, config: &EngineConfig) -> Vec<ScriptDiagnostic> {
    match sandboxed(config).compile(script) {
        Ok(_) => Vec::new(),
        Err(err) => vec![from_parse_error(&err)],
    }
}

/// Scripting engine for a single run.
pub struct ScriptEngine {
    engine: Engine,
    context: SharedContext,
}

impl ScriptEngine {
    /// Create a sandboxed engine with the full primitive set bound to a fresh
    /// context.
    pub fn new(link: RunLink, config: &EngineConfig) -> Self {
        let mut engine = sandboxed(config);

        // A superseded run that never reaches a suspension point is stopped
        // here.
        let cancel = link.cancel.clone();
        engine.on_progress(move |_| {
            if cancel.load(Ordering::Relaxed) {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        let context = Rc::new(RefCell::new(InterpreterContext::new(
            link,
            config.log_limit_per_frame,
        )));

        register_globals(&mut engine);
        register_filter_api(&mut engine, &context);
        register_frame_api(&mut engine, &context);
        register_widget_api(&mut engine, &context);
        register_rng_api(&mut engine, &context);
        register_host_api(&mut engine, &context);

        Self { engine, context }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    fn is_cancelled(&self) -> bool {
        self.context.borrow().is_cancelled()
    }

    /// Compile and run `script` to completion, or until it is cancelled.
    pub fn run(&mut self, script: &str) -> RunOutcome {
        let ast = match self.engine.compile(script) {
            Ok(ast) => ast,
            Err(err) => {
                return RunOutcome::Failed {
                    error: ScriptError::from_parse_error(&err),
                    diagnostic: from_parse_error(&err),
                }
            }
        };

        match self.engine.run_ast(&ast) {
            Ok(()) => RunOutcome::Completed,
            Err(err) => {
                if self.is_cancelled() || matches!(innermost(&err), EvalAltResult::ErrorTerminated(..)) {
                    return RunOutcome::Cancelled;
                }
                RunOutcome::Failed {
                    error: ScriptError::from_eval_error(&err),
                    diagnostic: from_eval_error(&err),
                }
            }
        }
    }
}
