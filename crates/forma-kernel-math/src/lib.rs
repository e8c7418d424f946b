#![warn(missing_docs)]

//! Math types for the forma B-rep kernel.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! mesh/B-rep interchange: points, vectors, directions, and the
//! library-wide tolerance constants used for vertex welding and
//! face sewing.

use nalgebra::Vector3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// The library-wide linear tolerance, in model length units.
///
/// Vertex welding and face sewing treat points closer than this as
/// coincident. A single shared constant keeps export and import
/// mutually consistent: a mesh welded on export sews back into the
/// same topology on import.
pub const TOLERANCE: f64 = 1e-4;

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in model length units.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances ([`TOLERANCE`] linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: TOLERANCE,
        angular: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if two angles are effectively equal (in radians).
    pub fn angles_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
