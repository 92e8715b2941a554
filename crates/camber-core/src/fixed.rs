//! Q32.32 fixed-point scalar and vector for deterministic world positions.
//!
//! Simulation-local math stays in `f32`; only positions that must survive
//! large worlds without precision loss are stored as [`FixedVec3`]. The
//! usable coordinate range is +/-[`MAX_WORLD_SIZE`].

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use glam::Vec3;

/// Number of fractional bits in [`Fixed`].
pub const FRACT_BITS: u32 = 32;

const ONE_RAW: i64 = 1 << FRACT_BITS;
const SCALE: f64 = ONE_RAW as f64;

/// Maximum world coordinate representable safely by the physics world.
pub const MAX_WORLD_SIZE: f32 = 32767.0;

// ============================================================================
// Fixed
// ============================================================================

/// Q32.32 signed fixed-point scalar.
///
/// Arithmetic is exact integer arithmetic, so results are identical on every
/// platform regardless of FPU behavior.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i64);

impl Fixed {
    /// Zero.
    pub const ZERO: Fixed = Fixed(0);
    /// One.
    pub const ONE: Fixed = Fixed(ONE_RAW);

    /// Creates a fixed-point value from an integer.
    pub const fn from_i64(n: i64) -> Self {
        Fixed(n << FRACT_BITS)
    }

    /// Creates a fixed-point value from its raw Q32.32 bit representation.
    pub const fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Creates a fixed-point value from a float.
    ///
    /// Converts through `f64` so the full 32-bit fraction is preserved.
    pub fn from_f32(v: f32) -> Self {
        Fixed((v as f64 * SCALE) as i64)
    }

    /// Returns the raw Q32.32 bit representation.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Converts to a float.
    pub fn to_f32(self) -> f32 {
        (self.0 as f64 / SCALE) as f32
    }

    /// Returns the absolute value.
    pub const fn abs(self) -> Self {
        Fixed(self.0.abs())
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = *self - rhs;
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i128 * rhs.0 as i128) >> FRACT_BITS) as i64)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i128) << FRACT_BITS) / rhs.0 as i128) as i64)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({})", self.to_f32())
    }
}

impl From<f32> for Fixed {
    fn from(v: f32) -> Self {
        Fixed::from_f32(v)
    }
}

// ============================================================================
// FixedVec3
// ============================================================================

/// 3-vector of [`Fixed`] components, used for world-space positions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FixedVec3 {
    /// X component.
    pub x: Fixed,
    /// Y component.
    pub y: Fixed,
    /// Z component.
    pub z: Fixed,
}

impl FixedVec3 {
    /// The zero vector.
    pub const ZERO: FixedVec3 = FixedVec3 {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Creates a vector from fixed-point components.
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector from a float vector.
    pub fn from_vec3(v: Vec3) -> Self {
        Self {
            x: Fixed::from_f32(v.x),
            y: Fixed::from_f32(v.y),
            z: Fixed::from_f32(v.z),
        }
    }

    /// Converts to a float vector. Lossy for coordinates far from origin.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x.to_f32(), self.y.to_f32(), self.z.to_f32())
    }

    /// Returns `self - base` as a float vector.
    ///
    /// The subtraction happens in fixed point, so small differences between
    /// large coordinates keep full precision.
    pub fn delta(self, base: FixedVec3) -> Vec3 {
        Vec3::new(
            (self.x - base.x).to_f32(),
            (self.y - base.y).to_f32(),
            (self.z - base.z).to_f32(),
        )
    }

    /// Returns this position offset by a float vector.
    pub fn offset(self, v: Vec3) -> FixedVec3 {
        FixedVec3 {
            x: self.x + Fixed::from_f32(v.x),
            y: self.y + Fixed::from_f32(v.y),
            z: self.z + Fixed::from_f32(v.z),
        }
    }
}

impl Add for FixedVec3 {
    type Output = FixedVec3;
    fn add(self, rhs: FixedVec3) -> FixedVec3 {
        FixedVec3 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for FixedVec3 {
    type Output = FixedVec3;
    fn sub(self, rhs: FixedVec3) -> FixedVec3 {
        FixedVec3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl fmt::Debug for FixedVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FixedVec3({}, {}, {})",
            self.x.to_f32(),
            self.y.to_f32(),
            self.z.to_f32()
        )
    }
}

impl From<Vec3> for FixedVec3 {
    fn from(v: Vec3) -> Self {
        FixedVec3::from_vec3(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_roundtrip() {
        let v = Fixed::from_f32(1.5);
        assert_eq!(v.to_f32(), 1.5);
        assert_eq!(v.raw(), 3 << 31);
    }

    #[test]
    fn test_fixed_arithmetic() {
        let a = Fixed::from_f32(2.25);
        let b = Fixed::from_f32(0.75);
        assert_eq!((a + b).to_f32(), 3.0);
        assert_eq!((a - b).to_f32(), 1.5);
        assert_eq!((a * b).to_f32(), 1.6875);
        assert_eq!((a / b).to_f32(), 3.0);
        assert_eq!((-a).to_f32(), -2.25);
    }

    #[test]
    fn test_fixed_large_coordinates_keep_fraction() {
        // f32 loses sub-millimeter precision out at 16km; Fixed does not.
        let far = Fixed::from_f32(16000.0) + Fixed::from_f32(0.001);
        let back = far - Fixed::from_f32(16000.0);
        assert!((back.to_f32() - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_vec3_delta_precision() {
        let a = FixedVec3::from_vec3(Vec3::new(20000.0, 0.0, -20000.0));
        let b = a.offset(Vec3::new(0.25, 0.5, -0.125));
        let d = b.delta(a);
        assert!((d - Vec3::new(0.25, 0.5, -0.125)).length() < 1e-5);
    }

    #[test]
    fn test_fixed_ordering() {
        assert!(Fixed::from_f32(-1.0) < Fixed::ZERO);
        assert!(Fixed::ONE > Fixed::from_f32(0.999));
    }
}
