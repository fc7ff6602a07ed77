//! Argument conversion for native script functions.
//!
//! Scripts pass numbers as either integers or floats, so numeric parameters are
//! registered as `Dynamic` and converted here. Every failure is an
//! `invalid argument` error naming the primitive.

use glam::Vec2;
use rhai::{Array, Dynamic, EvalAltResult};

use crate::error::invalid_argument;

type ArgResult<T> = Result<T, Box<EvalAltResult>>;

pub fn to_f32(value: &Dynamic, what: &str) -> ArgResult<f32> {
    if let Ok(f) = value.as_float() {
        return Ok(f);
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f32);
    }
    Err(invalid_argument(format!(
        "{what} expects a number, got {}",
        value.type_name()
    )))
}

/// Finite number.
pub fn to_finite(value: &Dynamic, what: &str) -> ArgResult<f32> {
    let f = to_f32(value, what)?;
    if !f.is_finite() {
        return Err(invalid_argument(format!("{what} expects a finite number, got {f}")));
    }
    Ok(f)
}

/// Non-negative whole number. Floats are accepted when they have no
/// fractional part.
pub fn to_u32(value: &Dynamic, what: &str) -> ArgResult<u32> {
    let n = if let Ok(i) = value.as_int() {
        i
    } else if let Ok(f) = value.as_float() {
        if f.fract() != 0.0 || !f.is_finite() {
            return Err(invalid_argument(format!("{what} expects a whole number, got {f}")));
        }
        f as i64
    } else {
        return Err(invalid_argument(format!(
            "{what} expects a whole number, got {}",
            value.type_name()
        )));
    };
    u32::try_from(n).map_err(|_| invalid_argument(format!("{what} expects a non-negative whole number, got {n}")))
}

pub fn to_seed(value: &Dynamic) -> ArgResult<u64> {
    if let Ok(i) = value.as_int() {
        // Negative seeds are reinterpreted bitwise.
        return Ok(i as u64);
    }
    if let Ok(f) = value.as_float() {
        if f.is_finite() && f.fract() == 0.0 {
            return Ok(f as i64 as u64);
        }
    }
    Err(invalid_argument(format!(
        "seed expects an integer, got {}",
        value.type_name()
    )))
}

pub fn to_vec2(value: &Dynamic, what: &str) -> ArgResult<Vec2> {
    let items = value
        .clone()
        .try_cast::<Array>()
        .ok_or_else(|| invalid_argument(format!("{what} expects a pair [x, y]")))?;
    if items.len() != 2 {
        return Err(invalid_argument(format!(
            "{what} expects a pair [x, y], got {} elements",
            items.len()
        )));
    }
    Ok(Vec2::new(to_finite(&items[0], what)?, to_finite(&items[1], what)?))
}

/// A scalar is promoted to a uniform pair.
pub fn to_scale(value: &Dynamic) -> ArgResult<Vec2> {
    if value.is_array() {
        return to_vec2(value, "scale");
    }
    Ok(Vec2::splat(to_finite(value, "scale")?))
}

pub fn to_rgb(value: &Dynamic, what: &str) -> ArgResult<[f32; 3]> {
    let items = value
        .clone()
        .try_cast::<Array>()
        .ok_or_else(|| invalid_argument(format!("{what} expects [r, g, b]")))?;
    if items.len() != 3 {
        return Err(invalid_argument(format!(
            "{what} expects [r, g, b], got {} elements",
            items.len()
        )));
    }
    Ok([
        to_finite(&items[0], what)?,
        to_finite(&items[1], what)?,
        to_finite(&items[2], what)?,
    ])
}

/// Non-empty list of strings.
pub fn to_options(value: &Dynamic, what: &str) -> ArgResult<Vec<String>> {
    let items = value
        .clone()
        .try_cast::<Array>()
        .ok_or_else(|| invalid_argument(format!("{what} expects an array of options")))?;
    if items.is_empty() {
        return Err(invalid_argument(format!("{what} needs at least one option")));
    }
    items
        .into_iter()
        .map(|item| {
            item.into_string()
                .map_err(|ty| invalid_argument(format!("{what} options must be strings, got {ty}")))
        })
        .collect()
}
