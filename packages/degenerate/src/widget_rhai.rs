//! Rhai registration for `checkbox`, `radio` and `slider`.

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString};

use crate::context::SharedContext;
use crate::frame_rhai::cancelled;
use crate::script_args::{to_finite, to_options};

const SLIDER_MIN: f32 = 0.0;
const SLIDER_MAX: f32 = 1.0;
const SLIDER_STEP: f32 = 0.001;

fn slider(
    ctx: &SharedContext,
    name: &str,
    min: f32,
    max: f32,
    step: f32,
    initial: f32,
) -> Result<f32, Box<EvalAltResult>> {
    ctx.borrow_mut()
        .slider(name, min, max, step, initial)
        .map_err(|_| cancelled())
}

pub fn register_widget_api(engine: &mut Engine, ctx: &SharedContext) {
    let c = ctx.clone();
    engine.register_fn("checkbox", move |name: ImmutableString| -> Result<bool, Box<EvalAltResult>> {
        c.borrow_mut().checkbox(&name).map_err(|_| cancelled())
    });

    let c = ctx.clone();
    engine.register_fn(
        "radio",
        move |name: ImmutableString, options: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let options = to_options(&options, "radio")?;
            c.borrow_mut().radio(&name, options).map_err(|_| cancelled())
        },
    );

    let c = ctx.clone();
    engine.register_fn("slider", move |name: ImmutableString| {
        slider(&c, &name, SLIDER_MIN, SLIDER_MAX, SLIDER_STEP, SLIDER_MIN)
    });

    // Without an explicit initial value the slider starts at `min`.
    let c = ctx.clone();
    engine.register_fn(
        "slider",
        move |name: ImmutableString,
              min: Dynamic,
              max: Dynamic,
              step: Dynamic|
              -> Result<f32, Box<EvalAltResult>> {
            let min = to_finite(&min, "slider")?;
            let max = to_finite(&max, "slider")?;
            let step = to_finite(&step, "slider")?;
            slider(&c, &name, min, max, step, min)
        },
    );

    let c = ctx.clone();
    engine.register_fn(
        "slider",
        move |name: ImmutableString,
              min: Dynamic,
              max: Dynamic,
              step: Dynamic,
              initial: Dynamic|
              -> Result<f32, Box<EvalAltResult>> {
            let min = to_finite(&min, "slider")?;
            let max = to_finite(&max, "slider")?;
            let step = to_finite(&step, "slider")?;
            let initial = to_finite(&initial, "slider")?;
            slider(&c, &name, min, max, step, initial)
        },
    );
}
