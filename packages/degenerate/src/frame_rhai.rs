//! Rhai registration for the suspension points and the clock.
//!
//! `frame()` and `render()` block the run's thread on a continuation until the
//! host delivers a frame tick. `sleep(ms)` blocks on wall-clock time instead.
//! A superseded run is unwound with a non-catchable termination error.

use std::thread;
use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, EvalAltResult, Position, FLOAT, INT};

use crate::context::SharedContext;
use crate::error::invalid_argument;
use crate::scheduler::Resume;

/// Granularity at which a sleeping run checks for cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Error that unwinds a cancelled run. Rhai does not let scripts catch it.
pub fn cancelled() -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorTerminated(Dynamic::UNIT, Position::NONE))
}

/// Suspend until the next frame tick.
pub fn wait_for_frame(ctx: &SharedContext) -> Result<(), Box<EvalAltResult>> {
    // Release the borrow before parking.
    let wait = ctx.borrow().suspend().map_err(|_| cancelled())?;
    match wait.recv() {
        Ok(Resume::Frame) => {
            ctx.borrow().resumed();
            Ok(())
        }
        Ok(Resume::Cancelled) | Err(_) => Err(cancelled()),
    }
}

fn sleep(ctx: &SharedContext, ms: f32) -> Result<(), Box<EvalAltResult>> {
    let total = Duration::from_secs_f32(ms.max(0.0) / 1000.0);
    let deadline = Instant::now() + total;
    loop {
        if ctx.borrow().is_cancelled() {
            return Err(cancelled());
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// Register `render`, `frame`, `sleep`, `elapsed` and `delta`.
pub fn register_frame_api(engine: &mut Engine, ctx: &SharedContext) {
    let c = ctx.clone();
    engine.register_fn("render", move || -> Result<(), Box<EvalAltResult>> {
        c.borrow().publish().map_err(|_| cancelled())?;
        wait_for_frame(&c)
    });

    let c = ctx.clone();
    engine.register_fn("frame", move || wait_for_frame(&c));

    // Typed overloads so they shadow the core package's `sleep(seconds)`.
    let c = ctx.clone();
    engine.register_fn("sleep", move |ms: INT| sleep(&c, ms as f32));

    let c = ctx.clone();
    engine.register_fn("sleep", move |ms: FLOAT| -> Result<(), Box<EvalAltResult>> {
        if !ms.is_finite() {
            return Err(invalid_argument("sleep expects a finite duration"));
        }
        sleep(&c, ms)
    });

    // Milliseconds since the run started.
    let c = ctx.clone();
    engine.register_fn("elapsed", move || c.borrow().elapsed_ms());

    // Milliseconds between the two most recent frame ticks.
    let c = ctx.clone();
    engine.register_fn("delta", move || c.borrow().delta_ms());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::Ordering;

    use crate::context::tests::detached_context;
    use crate::context::RunEvent;

    #[test]
    fn test_render_publishes_then_suspends() {
        let (ctx, rx, _link) = detached_context();
        let ctx = Rc::new(RefCell::new(ctx));
        ctx.borrow_mut().filter.alpha = 0.5;

        let host = thread::spawn(move || {
            let first = rx.recv().unwrap();
            assert!(matches!(first, RunEvent::Message(ref m) if m.as_render().is_some()));
            match rx.recv().unwrap() {
                RunEvent::Suspend(continuation) => {
                    let mut scheduler = crate::scheduler::FrameScheduler::new();
                    scheduler.begin(continuation.run());
                    scheduler.suspend(continuation);
                    let mut clock = crate::clock::Clock::default();
                    scheduler.tick(&mut clock, Instant::now());
                }
                other => panic!("expected suspend, got {other:?}"),
            }
        });

        let mut engine = Engine::new();
        register_frame_api(&mut engine, &ctx);
        engine.run("render();").unwrap();
        host.join().unwrap();
    }

    #[test]
    fn test_cancelled_run_terminates() {
        let (ctx, _rx, link) = detached_context();
        let ctx = Rc::new(RefCell::new(ctx));
        link.cancel.store(true, Ordering::Relaxed);

        let mut engine = Engine::new();
        register_frame_api(&mut engine, &ctx);
        let err = engine.run("try { frame(); } catch { } 1").unwrap_err();
        assert!(matches!(*err, EvalAltResult::ErrorTerminated(..)));
        let err = engine.run("sleep(1000);").unwrap_err();
        assert!(matches!(*err, EvalAltResult::ErrorTerminated(..)));
    }

    #[test]
    fn test_short_sleep_returns() {
        let (ctx, _rx, _link) = detached_context();
        let ctx = Rc::new(RefCell::new(ctx));
        let mut engine = Engine::new();
        register_frame_api(&mut engine, &ctx);
        engine.run("sleep(1); sleep(-5); sleep(0.5);").unwrap();
    }
}
