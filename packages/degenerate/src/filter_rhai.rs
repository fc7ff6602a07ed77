//! Rhai registration for the filter builder primitives.
//!
//! Masks and operations replace the current value outright. Transform calls
//! compose onto whatever the filter already holds.

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString};

use crate::context::SharedContext;
use crate::error::invalid_argument;
use crate::filter::{ColorAxis, Mask, Operation, Transform};
use crate::frame_rhai::cancelled;
use crate::protocol::WorkerMessage;
use crate::script_args::{to_finite, to_rgb, to_scale, to_u32, to_vec2};

fn set_mask(engine: &mut Engine, ctx: &SharedContext, name: &str, mask: Mask) {
    let ctx = ctx.clone();
    engine.register_fn(name, move || {
        ctx.borrow_mut().filter.mask = mask;
    });
}

fn set_operation(engine: &mut Engine, ctx: &SharedContext, name: &str, operation: Operation) {
    let ctx = ctx.clone();
    engine.register_fn(name, move || {
        ctx.borrow_mut().filter.operation = operation;
    });
}

/// Register the filter builder API with the Rhai engine.
pub fn register_filter_api(engine: &mut Engine, ctx: &SharedContext) {
    // ========================================================================
    // Masks
    // ========================================================================

    set_mask(engine, ctx, "all", Mask::All);
    set_mask(engine, ctx, "circle", Mask::Circle);
    set_mask(engine, ctx, "cross", Mask::Cross);
    set_mask(engine, ctx, "square", Mask::Square);
    set_mask(engine, ctx, "top", Mask::Top);
    set_mask(engine, ctx, "check", Mask::Check);
    set_mask(engine, ctx, "x", Mask::X);

    // Audio driven; the renderer evaluates these from its analyser data.
    set_mask(engine, ctx, "equalizer", Mask::Equalizer);
    set_mask(engine, ctx, "frequency", Mask::Frequency);
    set_mask(engine, ctx, "timeDomain", Mask::TimeDomain);
    set_mask(engine, ctx, "wave", Mask::Wave);

    let c = ctx.clone();
    engine.register_fn(
        "mod",
        move |divisor: Dynamic, remainder: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let mask = Mask::Mod {
                divisor: to_u32(&divisor, "mod")?,
                remainder: to_u32(&remainder, "mod")?,
            };
            c.borrow_mut().filter.mask = mask;
            Ok(())
        },
    );

    let c = ctx.clone();
    engine.register_fn(
        "rows",
        move |rows: Dynamic, step: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let mask = Mask::Rows {
                rows: to_u32(&rows, "rows")?,
                step: to_u32(&step, "rows")?,
            };
            c.borrow_mut().filter.mask = mask;
            Ok(())
        },
    );

    // ========================================================================
    // Operations
    // ========================================================================

    set_operation(engine, ctx, "identity", Operation::Identity);
    set_operation(engine, ctx, "invert", Operation::Invert);
    // `debug` is a statement keyword in Rhai.
    set_operation(engine, ctx, "debugColor", Operation::Debug);

    let c = ctx.clone();
    engine.register_fn(
        "rotateColor",
        move |axis: ImmutableString, turns: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let axis: ColorAxis = axis.parse().map_err(invalid_argument)?;
            let turns = to_finite(&turns, "rotateColor")?;
            c.borrow_mut().filter.operation = Operation::RotateColor { axis, turns };
            Ok(())
        },
    );

    // ========================================================================
    // Blend and sampling parameters
    // ========================================================================

    let c = ctx.clone();
    engine.register_fn("alpha", move |value: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let alpha = to_finite(&value, "alpha")?;
        c.borrow_mut().filter.alpha = alpha;
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("defaultColor", move |color: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let rgb = to_rgb(&color, "defaultColor")?;
        c.borrow_mut().filter.default_color = rgb;
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("wrap", move || c.borrow_mut().filter.toggle_wrap());

    let c = ctx.clone();
    engine.register_fn("wrap", move |wrap: bool| {
        c.borrow_mut().filter.wrap = wrap;
    });

    let c = ctx.clone();
    engine.register_fn("coordinates", move |coordinates: bool| {
        c.borrow_mut().filter.coordinates = coordinates;
    });

    let c = ctx.clone();
    engine.register_fn("repeat", move |times: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let times = to_u32(&times, "repeat")?;
        if times == 0 {
            return Err(invalid_argument("repeat expects at least 1"));
        }
        c.borrow_mut().filter.repeat = times;
        Ok(())
    });

    // ========================================================================
    // Transform
    // ========================================================================

    let c = ctx.clone();
    engine.register_fn("scale", move |factor: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let factor = to_scale(&factor)?;
        c.borrow_mut().filter.transform.scale(factor);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("rotate", move |radians: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let radians = to_finite(&radians, "rotate")?;
        c.borrow_mut().filter.transform.rotate(radians);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("translate", move |offset: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let offset = to_vec2(&offset, "translate")?;
        c.borrow_mut().filter.transform.translate(offset);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn(
        "transform",
        move |rotation: Dynamic, scale: Dynamic, translation: Dynamic| -> Result<(), Box<EvalAltResult>> {
            let rotation = to_finite(&rotation, "transform")?;
            let scale = to_scale(&scale)?;
            let translation = to_vec2(&translation, "transform")?;
            let mut ctx = c.borrow_mut();
            let transform = &mut ctx.filter.transform;
            transform.rotate(rotation);
            transform.scale(scale);
            transform.translate(translation);
            Ok(())
        },
    );

    let c = ctx.clone();
    engine.register_fn("identityTransform", move || {
        c.borrow_mut().filter.transform = Transform::IDENTITY;
    });

    // ========================================================================
    // Whole-filter resets
    // ========================================================================

    let c = ctx.clone();
    engine.register_fn("reset", move || c.borrow_mut().reset());

    let c = ctx.clone();
    engine.register_fn("reboot", move || -> Result<(), Box<EvalAltResult>> {
        let mut ctx = c.borrow_mut();
        ctx.reset();
        ctx.post(WorkerMessage::Clear).map_err(|_| cancelled())
    });
}
