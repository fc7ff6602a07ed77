//! Rhai registration for `seed`, `choose` and `random`.

use rhai::{Array, Dynamic, Engine, EvalAltResult};

use crate::context::SharedContext;
use crate::error::invalid_argument;
use crate::script_args::to_seed;

pub fn register_rng_api(engine: &mut Engine, ctx: &SharedContext) {
    let c = ctx.clone();
    engine.register_fn("seed", move |n: Dynamic| -> Result<(), Box<EvalAltResult>> {
        let seed = to_seed(&n)?;
        c.borrow_mut().rng.seed(seed);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("choose", move |items: Array| -> Result<Dynamic, Box<EvalAltResult>> {
        c.borrow_mut()
            .rng
            .choose(&items)
            .cloned()
            .ok_or_else(|| invalid_argument("choose needs a non-empty array"))
    });

    let c = ctx.clone();
    engine.register_fn("random", move || c.borrow_mut().rng.random());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::context::tests::detached_context;
    use crate::error::ScriptError;
    use crate::rng::Rng;

    fn setup() -> (Engine, SharedContext) {
        let (ctx, _rx, _link) = detached_context();
        let ctx = Rc::new(RefCell::new(ctx));
        let mut engine = Engine::new();
        register_rng_api(&mut engine, &ctx);
        (engine, ctx)
    }

    #[test]
    fn test_reseed_repeats_choice() {
        let (engine, _ctx) = setup();
        let same: bool = engine
            .eval("seed(1); let a = choose([1, 2, 3]); seed(1); let b = choose([1, 2, 3]); a == b")
            .unwrap();
        assert!(same);
    }

    #[test]
    fn test_matches_rust_stream() {
        let (engine, ctx) = setup();
        let picked: i64 = engine.eval("seed(0); choose([10, 20, 30, 40, 50])").unwrap();
        let mut rng = Rng::new(0);
        let expected = *rng.choose(&[10_i64, 20, 30, 40, 50]).unwrap();
        assert_eq!(picked, expected);
        assert_eq!(ctx.borrow().rng.draws(), 1);
    }

    #[test]
    fn test_empty_choice_is_invalid() {
        let (engine, ctx) = setup();
        let err = engine.run("choose([]);").unwrap_err();
        assert!(matches!(ScriptError::from_eval_error(&err), ScriptError::InvalidArgument(_)));
        assert_eq!(ctx.borrow().rng.draws(), 0);
    }

    #[test]
    fn test_random_in_unit_interval() {
        let (engine, _ctx) = setup();
        let ok: bool = engine
            .eval("let ok = true; for i in 0..100 { let r = random(); if r < 0.0 || r >= 1.0 { ok = false; } } ok")
            .unwrap();
        assert!(ok);
    }
}
