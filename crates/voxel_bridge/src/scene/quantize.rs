//! Numeric quantization policy
//!
//! Coordinates snap to the integer voxel grid unless float mode has been
//! switched on by the `float` command token. Colours, scales and intensities
//! always keep two decimals.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Decimal places kept when stripping floating residue before flooring
const NOISE_SCALE: f64 = 1e6;

/// Coordinate quantization mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberMode {
    /// Floor onto the integer grid
    #[default]
    Grid,
    /// Keep two decimals, no flooring
    Float,
}

impl NumberMode {
    /// Quantize a single coordinate.
    ///
    /// Grid mode first strips residue such as `2.9999999999` left by
    /// rotations, so it floors to `3` while `1.96` still floors to `1`.
    pub fn quantize(self, value: f64) -> f64 {
        let quantized = match self {
            Self::Grid => ((value * NOISE_SCALE).round() / NOISE_SCALE).floor(),
            Self::Float => round_two_decimals(value),
        };
        // Avoid emitting -0 on the wire
        quantized + 0.0
    }

    /// Quantize every component of a position
    pub fn quantize_vec(self, v: &Vec3) -> Vec3 {
        Vec3::new(self.quantize(v.x), self.quantize(v.y), self.quantize(v.z))
    }

    /// Whether float mode is active
    pub fn is_float(self) -> bool {
        self == Self::Float
    }
}

/// Round to two decimals
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}
