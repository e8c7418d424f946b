//! Face geometry: planar polygons, disks, cylinder walls, spheres.

use forma_kernel_math::{Point3, Vec3};

/// A triangular face defined by three corner points.
///
/// The face normal follows the right-hand rule over `(a, b, c)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriFace {
    /// First corner.
    pub a: Point3,
    /// Second corner.
    pub b: Point3,
    /// Third corner.
    pub c: Point3,
}

impl TriFace {
    /// Build a triangular face from three points.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    /// Face area. Zero when the three points are collinear or coincident.
    pub fn area(&self) -> f64 {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        e1.cross(&e2).norm() / 2.0
    }

    /// Unnormalized face normal (right-hand rule over `a → b → c`).
    pub fn normal(&self) -> Vec3 {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        e1.cross(&e2)
    }
}

/// A planar face bounded by a convex polygon.
///
/// The boundary is traversed counter-clockwise when viewed from the side
/// the natural normal points toward; `reversed` flips the face so the
/// material side is the other one. Every face this kernel constructs has
/// a convex boundary, which is what the fan triangulation in the
/// tessellator relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarFace {
    /// Boundary polygon, at least 3 points, no repeated vertices.
    pub boundary: Vec<Point3>,
    /// Whether the face normal opposes the boundary's winding.
    pub reversed: bool,
}

impl PlanarFace {
    /// Planar face over a polygon boundary with natural orientation.
    pub fn new(boundary: Vec<Point3>) -> Self {
        Self {
            boundary,
            reversed: false,
        }
    }

    /// Triangular planar face from three points.
    pub fn triangle(tri: &TriFace) -> Self {
        Self::new(vec![tri.a, tri.b, tri.c])
    }
}

/// A flat disk in a plane of constant Z, bounded by a circle.
///
/// Natural normal is +Z; `reversed` flips it to -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskFace {
    /// Circle center (also fixes the disk's plane).
    pub center: Point3,
    /// Circle radius.
    pub radius: f64,
    /// Whether the face normal is -Z instead of +Z.
    pub reversed: bool,
}

/// The full lateral wall of a cylinder, axis +Z, base circle at z = 0.
///
/// Natural orientation is outward from the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderFace {
    /// Cylinder radius.
    pub radius: f64,
    /// Wall height along +Z.
    pub height: f64,
    /// Whether the face normal points toward the axis.
    pub reversed: bool,
}

/// A complete sphere surface centered at the origin.
///
/// Natural orientation is outward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereFace {
    /// Sphere radius.
    pub radius: f64,
    /// Whether the face normal points inward.
    pub reversed: bool,
}

/// A B-rep face: one bounded piece of a shell's surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Face {
    /// Planar polygon face.
    Planar(PlanarFace),
    /// Flat circular cap.
    Disk(DiskFace),
    /// Cylindrical lateral wall.
    Cylinder(CylinderFace),
    /// Full sphere surface.
    Sphere(SphereFace),
}

impl Face {
    /// The face's oriented boundary as directed segments, outward winding.
    ///
    /// Analytic faces (disk, cylinder, sphere) pair their circular edges by
    /// construction and contribute no segments; manifoldness bookkeeping
    /// only tracks polygonal boundaries.
    pub fn boundary_segments(&self) -> Vec<(Point3, Point3)> {
        match self {
            Face::Planar(p) => {
                let n = p.boundary.len();
                if n < 2 {
                    return Vec::new();
                }
                let mut segs = Vec::with_capacity(n);
                for i in 0..n {
                    let j = (i + 1) % n;
                    if p.reversed {
                        segs.push((p.boundary[j], p.boundary[i]));
                    } else {
                        segs.push((p.boundary[i], p.boundary[j]));
                    }
                }
                segs
            }
            Face::Disk(_) | Face::Cylinder(_) | Face::Sphere(_) => Vec::new(),
        }
    }

    /// Signed volume contribution of this face via the divergence theorem.
    ///
    /// Defined for planar faces only (fan decomposition is exact there);
    /// analytic faces return `None` and callers fall back to tessellation
    /// if they need mass properties of curved shapes.
    pub fn signed_volume(&self) -> Option<f64> {
        match self {
            Face::Planar(p) => {
                let n = p.boundary.len();
                if n < 3 {
                    return Some(0.0);
                }
                let mut vol = 0.0;
                for i in 1..n - 1 {
                    let (a, b, c) = if p.reversed {
                        (p.boundary[0], p.boundary[i + 1], p.boundary[i])
                    } else {
                        (p.boundary[0], p.boundary[i], p.boundary[i + 1])
                    };
                    vol += a.coords.dot(&b.coords.cross(&c.coords)) / 6.0;
                }
                Some(vol)
            }
            _ => None,
        }
    }

}
