//! Filter state: the payload a script builds and the renderer consumes.
//!
//! A `FilterState` is a plain value. `render()` sends a clone, so anything a
//! script does afterwards only affects the next snapshot.
//!
//! Wire shape (camelCase JSON):
//! `{alpha, mask: {kind, params?}, operation: {kind, params?}, rotation,
//! scale, translation, wrap, defaultColor, coordinates, repeat}`.

use std::str::FromStr;

use glam::{Mat3, UVec2, Vec2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Pixel selection predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "params")]
pub enum Mask {
    #[default]
    All,
    Circle,
    Cross,
    Square,
    Top,
    Check,
    X,
    Mod { divisor: u32, remainder: u32 },
    Rows { rows: u32, step: u32 },
    /// Bars sized by the intensity of each frequency bucket.
    Equalizer,
    /// Pixels whose frequency bucket is loud.
    Frequency,
    /// Pixels where the time-domain sample is large.
    TimeDomain,
    /// The audio waveform drawn across the canvas.
    Wave,
}

/// Side length of one checkerboard cell in normalized coordinates.
const CHECK_CELL: f32 = 0.25;

impl Mask {
    /// Whether `pixel` is selected.
    ///
    /// `position` is the pixel centre in `[-1, 1]²` with y growing downwards.
    /// Index based masks (`Mod`, `Rows`) use `pixel`/`resolution` and never
    /// match when their modulus is zero. Audio masks depend on data only the
    /// renderer has, so they select nothing here.
    pub fn covers(&self, pixel: UVec2, resolution: UVec2, position: Vec2) -> bool {
        match *self {
            Mask::All => true,
            Mask::Circle => position.length() < 1.0,
            Mask::Cross => position.x.abs() < 0.25 || position.y.abs() < 0.25,
            Mask::Square => position.x.abs() < 0.5 && position.y.abs() < 0.5,
            Mask::Top => position.y < 0.0,
            Mask::Check => {
                let cell = ((position + Vec2::ONE) / CHECK_CELL).floor();
                (cell.x as i64 + cell.y as i64).rem_euclid(2) == 0
            }
            Mask::X => {
                (position.x - position.y).abs() < 0.25 || (position.x + position.y).abs() < 0.25
            }
            Mask::Mod { divisor, remainder } => {
                if divisor == 0 {
                    return false;
                }
                let index = pixel.y as u64 * resolution.x as u64 + pixel.x as u64;
                index % divisor as u64 == remainder as u64
            }
            Mask::Rows { rows, step } => {
                let period = rows as u64 + step as u64;
                if period == 0 {
                    return false;
                }
                (pixel.y as u64 % period) < rows as u64
            }
            Mask::Equalizer | Mask::Frequency | Mask::TimeDomain | Mask::Wave => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorAxis {
    Red,
    Green,
    Blue,
}

impl FromStr for ColorAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" | "r" => Ok(ColorAxis::Red),
            "green" | "g" => Ok(ColorAxis::Green),
            "blue" | "b" => Ok(ColorAxis::Blue),
            other => Err(format!(
                "color axis must be one of red, green, blue (got {other:?})"
            )),
        }
    }
}

/// Color transform applied to selected pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "params")]
pub enum Operation {
    Debug,
    Identity,
    #[default]
    Invert,
    RotateColor { axis: ColorAxis, turns: f32 },
}

/// Sample coordinate transform. Calls compose onto the existing value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Radians.
    pub rotation: f32,
    pub scale: Vec2,
    pub translation: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: 0.0,
        scale: Vec2::ONE,
        translation: Vec2::ZERO,
    };

    pub fn rotate(&mut self, radians: f32) {
        self.rotation += radians;
    }

    pub fn scale(&mut self, factor: Vec2) {
        self.scale *= factor;
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.translation += offset;
    }

    pub fn matrix(&self) -> Mat3 {
        Mat3::from_scale_angle_translation(self.scale, self.rotation, self.translation)
    }

    /// Map a position in `[-1, 1]²` to the position to sample from.
    ///
    /// With `wrap` the result is folded back into `[-1, 1)`. Without it,
    /// out-of-bounds samples yield `None` and the renderer uses the default
    /// color.
    pub fn sample(&self, position: Vec2, wrap: bool) -> Option<Vec2> {
        let p = self.matrix().transform_point2(position);
        if wrap {
            return Some(Vec2::new(
                (p.x + 1.0).rem_euclid(2.0) - 1.0,
                (p.y + 1.0).rem_euclid(2.0) - 1.0,
            ));
        }
        if p.x.abs() > 1.0 || p.y.abs() > 1.0 {
            None
        } else {
            Some(p)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub alpha: f32,
    pub mask: Mask,
    pub operation: Operation,
    #[serde(flatten)]
    pub transform: Transform,
    pub wrap: bool,
    pub default_color: [f32; 3],
    pub coordinates: bool,
    pub repeat: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            mask: Mask::All,
            operation: Operation::Invert,
            transform: Transform::IDENTITY,
            wrap: false,
            default_color: [0.0, 0.0, 0.0],
            coordinates: false,
            repeat: 1,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `wrap()` without an argument flips the flag.
    pub fn toggle_wrap(&mut self) {
        self.wrap = !self.wrap;
    }

    /// SHA-256 of the canonical JSON encoding, hex encoded. Used to compare
    /// runs byte for byte.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&json))
    }
}
