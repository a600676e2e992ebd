//! Fixed-point math utilities for the authoritative simulation.
//!
//! Every quantity the authority compares (positions, budgets, ranges) is
//! fixed-point so that the server, a replay and any mirror produce
//! bit-identical results.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 3D vector used for world positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (height).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Create a vector from whole-number coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    /// Euclidean distance to another point.
    ///
    /// The squared distance is accumulated over the raw bits in 128-bit
    /// integer space, so the result is the exact floor of the true distance
    /// at `Fixed` precision. Distances beyond `Fixed::MAX` saturate.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        Fixed::from_bits(i64::try_from(self.distance_bits(other)).unwrap_or(i64::MAX))
    }

    /// Distance in raw-bit units, unsaturated.
    fn distance_bits(self, other: Self) -> u128 {
        let diffs = [
            axis_diff(self.x, other.x),
            axis_diff(self.y, other.y),
            axis_diff(self.z, other.z),
        ];
        let exact = diffs
            .iter()
            .try_fold(0u128, |sum, &d| sum.checked_add(d * d));
        match exact {
            Some(sum) => isqrt(sum),
            // Only opposite corners of the coordinate space get here; drop
            // one bit of precision to stay in range.
            None => {
                let halved: u128 = diffs.iter().map(|&d| (d >> 1) * (d >> 1)).sum();
                isqrt(halved) * 2
            }
        }
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Returns `target` itself when it is within reach, otherwise the point
    /// `max_step` along the straight line to it. Each axis is interpolated
    /// over the raw bits in 128-bit space and clamped to the segment, so any
    /// two representable points give a representable result.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let dist = self.distance_bits(target);
        let step = u128::try_from(max_step.to_bits()).unwrap_or(0);
        if dist <= step {
            return target;
        }
        if step == 0 {
            return self;
        }
        Self {
            x: lerp_axis(self.x, target.x, max_step, dist),
            y: lerp_axis(self.y, target.y, max_step, dist),
            z: lerp_axis(self.z, target.z, max_step, dist),
        }
    }
}

/// `from + (to - from) * step / dist`, kept between `from` and `to`.
fn lerp_axis(from: Fixed, to: Fixed, step: Fixed, dist: u128) -> Fixed {
    let start = i128::from(from.to_bits());
    let end = i128::from(to.to_bits());
    // |end - start| < 2^64 and step < 2^63: the product fits in i128.
    // dist <= 2^65 here since step < dist.
    let dist = i128::try_from(dist).unwrap_or(i128::MAX);
    let offset = (end - start) * i128::from(step.to_bits()) / dist;
    let bits = (start + offset).clamp(start.min(end), start.max(end));
    i64::try_from(bits).map_or(to, Fixed::from_bits)
}

/// Absolute per-axis difference in raw-bit units; always below 2^64.
fn axis_diff(a: Fixed, b: Fixed) -> u128 {
    (i128::from(a.to_bits()) - i128::from(b.to_bits())).unsigned_abs()
}

/// Integer square root (floor) using Newton's method from an overestimate.
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}
