//! Rhai registration for host directives, constants, assertions and logging.
//!
//! Directives (`clear`, `save`, `resolution`, `record`, the oscillator and
//! decibel settings) are forwarded to the host untouched.

use std::f32::consts;

use rhai::{Array, Dynamic, Engine, EvalAltResult, INT};

use crate::context::SharedContext;
use crate::error::invalid_argument;
use crate::frame_rhai::cancelled;
use crate::protocol::WorkerMessage;
use crate::script_args::to_finite;
use crate::script_log::{stringify_dynamic, LogLevel};

fn post(ctx: &SharedContext, message: WorkerMessage) -> Result<(), Box<EvalAltResult>> {
    ctx.borrow().post(message).map_err(|_| cancelled())
}

/// Only whole, non-negative numbers are forwarded; anything else is ignored.
fn whole_resolution(value: &Dynamic) -> Option<u32> {
    if let Ok(i) = value.as_int() {
        return u32::try_from(i).ok();
    }
    let f = value.as_float().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f32 {
        return Some(f as u32);
    }
    None
}

/// Receiver of `log.info(v)`, `log.warn(v)` and `log.error(v)`.
#[derive(Debug, Clone, Copy)]
pub struct LogNamespace;

/// `TAU`, `PI` and `log`, visible everywhere including inside script
/// functions. A variable or parameter the script declares with one of these
/// names takes precedence.
// `on_var` is flagged deprecated by Rhai as a volatile API, not slated for removal.
#[allow(deprecated)]
pub fn register_globals(engine: &mut Engine) {
    engine.register_type_with_name::<LogNamespace>("Log");
    engine.on_var(|name, _, context| {
        if context.scope().contains(name) {
            return Ok(None);
        }
        Ok(match name {
            "TAU" => Some(Dynamic::from(consts::TAU)),
            "PI" => Some(Dynamic::from(consts::PI)),
            "log" => Some(Dynamic::from(LogNamespace)),
            _ => None,
        })
    });
}

pub fn register_host_api(engine: &mut Engine, ctx: &SharedContext) {
    // ========================================================================
    // Directives
    // ========================================================================

    let c = ctx.clone();
    engine.register_fn("clear", move || post(&c, WorkerMessage::Clear));

    let c = ctx.clone();
    engine.register_fn("save", move || post(&c, WorkerMessage::Save));

    let c = ctx.clone();
    engine.register_fn("record", move || post(&c, WorkerMessage::Record));

    let c = ctx.clone();
    engine.register_fn("resolution", move |value: Dynamic| -> Result<(), Box<EvalAltResult>> {
        match whole_resolution(&value) {
            Some(resolution) => post(&c, WorkerMessage::Resolution(resolution)),
            None => {
                log::debug!("ignoring non-integer resolution {}", value);
                Ok(())
            }
        }
    });

    let c = ctx.clone();
    engine.register_fn("oscillatorFrequency", move |hz: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let hz = to_finite(&hz, "oscillatorFrequency")?;
        post(&c, WorkerMessage::OscillatorFrequency(hz))
    });

    let c = ctx.clone();
    engine.register_fn("oscillatorGain", move |gain: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let gain = to_finite(&gain, "oscillatorGain")?;
        post(&c, WorkerMessage::OscillatorGain(gain))
    });

    let c = ctx.clone();
    engine.register_fn(
        "decibelRange",
        move |min: Dynamic, max: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let min = to_finite(&min, "decibelRange")?;
            let max = to_finite(&max, "decibelRange")?;
            post(&c, WorkerMessage::DecibelRange { min, max })
        },
    );

    // ========================================================================
    // Language helpers
    // ========================================================================

    engine.register_fn("assert", |condition: bool| -> Result<(), Box<EvalAltResult>> {
        if condition {
            Ok(())
        } else {
            Err("assertion failed".into())
        }
    });

    engine.register_fn(
        "assert",
        |condition: bool, message: Dynamic| -> Result<(), Box<EvalAltResult>> {
            if condition {
                Ok(())
            } else {
                Err(stringify_dynamic(&message).into())
            }
        },
    );

    // `range(n)` is `[0, 1, ..., n - 1]`. Checked against the array limit
    // before anything is allocated.
    let max_array_size = engine.max_array_size();
    engine.register_fn("range", move |n: INT| -> Result<Array, Box<EvalAltResult>> {
        let len = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
        if max_array_size > 0 && len > max_array_size {
            return Err(invalid_argument(format!(
                "range({n}) exceeds the array size limit of {max_array_size}"
            )));
        }
        Ok((0..n.max(0)).map(Dynamic::from_int).collect())
    });

    // ========================================================================
    // Logging
    // ========================================================================

    for (method, level) in [
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ] {
        let c = ctx.clone();
        // `log` resolves to a constant, so the receiver is taken by value.
        engine.register_fn(method, move |_: LogNamespace, value: Dynamic| {
            c.borrow().logger().log_value(level, &value);
        });
    }

    let c = ctx.clone();
    engine.on_print(move |text| {
        c.borrow().logger().log(LogLevel::Info, text);
    });

    let c = ctx.clone();
    engine.on_debug(move |text, _source, position| {
        let message = if position.is_none() {
            text.to_string()
        } else {
            format!("[{position}] {text}")
        };
        c.borrow().logger().log(LogLevel::Debug, &message);
    });
}
