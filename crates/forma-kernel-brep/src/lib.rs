#![warn(missing_docs)]

//! B-rep shape model for the forma kernel.
//!
//! Provides the [`Shape`] type and its tagged [`Geometry`] — solids,
//! shells, and compounds — plus the topological operations the mesh
//! interchange layer needs: sewing triangular faces into shells,
//! manifoldness tests, and signed volume.

mod color;
mod face;
mod primitives;
mod sew;

pub use color::Color;
pub use face::{CylinderFace, DiskFace, Face, PlanarFace, SphereFace, TriFace};
pub use primitives::{box_solid, cylinder, sphere};
pub use sew::sew;

use std::collections::HashMap;

use forma_kernel_math::Tolerance;

/// A connected set of faces forming a surface boundary.
///
/// A shell may be open or closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shell {
    /// The faces that make up this shell.
    pub faces: Vec<Face>,
}

impl Shell {
    /// Shell over the given faces.
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    /// Whether every polygonal edge is shared by exactly two faces that
    /// traverse it in opposite directions.
    ///
    /// This is the watertightness condition for promotion to a solid:
    /// a consistent inside/outside exists only when it holds.
    pub fn is_manifold_and_oriented(&self, tol: &Tolerance) -> bool {
        let mut edges: HashMap<([i64; 3], [i64; 3]), (u32, u32)> = HashMap::new();
        for face in &self.faces {
            for (from, to) in face.boundary_segments() {
                let u = sew::quantize(&from, tol.linear);
                let v = sew::quantize(&to, tol.linear);
                if u == v {
                    // Collapsed segment, cannot pair.
                    return false;
                }
                let (key, forward) = if u < v { ((u, v), true) } else { ((v, u), false) };
                let counts = edges.entry(key).or_insert((0, 0));
                if forward {
                    counts.0 += 1;
                } else {
                    counts.1 += 1;
                }
            }
        }
        edges.values().all(|&(f, b)| f == 1 && b == 1)
    }

    /// Whether the shell has no boundary edges (every polygonal edge is
    /// shared by an even number of faces, two in the manifold case).
    pub fn is_closed(&self, tol: &Tolerance) -> bool {
        let mut edges: HashMap<([i64; 3], [i64; 3]), u32> = HashMap::new();
        for face in &self.faces {
            for (from, to) in face.boundary_segments() {
                let u = sew::quantize(&from, tol.linear);
                let v = sew::quantize(&to, tol.linear);
                let key = if u < v { (u, v) } else { (v, u) };
                *edges.entry(key).or_insert(0) += 1;
            }
        }
        edges.values().all(|&n| n == 2)
    }

    /// Signed enclosed volume, when every face is planar.
    pub fn volume(&self) -> Option<f64> {
        self.faces.iter().map(Face::signed_volume).sum()
    }
}

/// A bounded volume enclosed by one or more shells.
///
/// The first shell is the outer boundary; any further shells are voids
/// inside the material, wound so their volume contribution subtracts.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    /// Outer shell first, then void shells.
    pub shells: Vec<Shell>,
}

impl Solid {
    /// Solid bounded by a single outer shell.
    pub fn from_shell(shell: Shell) -> Self {
        Self {
            shells: vec![shell],
        }
    }

    /// Net enclosed volume, when every face is planar.
    pub fn volume(&self) -> Option<f64> {
        self.shells.iter().map(Shell::volume).sum()
    }
}

/// The geometry carried by a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A closed volume.
    Solid(Solid),
    /// A surface, possibly open.
    Shell(Shell),
    /// A group of child shapes.
    Compound(Vec<Shape>),
}

/// A geometric object with interchange attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// The underlying geometry.
    pub geometry: Geometry,
    /// Display label, carried into mesh containers as the object name.
    pub label: Option<String>,
    /// Display color, carried into mesh containers as a material.
    pub color: Option<Color>,
}

impl Shape {
    /// Shape over the given geometry, with no label or color.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            label: None,
            color: None,
        }
    }

    /// Shape wrapping a single shell.
    pub fn from_shell(shell: Shell) -> Self {
        Self::new(Geometry::Shell(shell))
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Leaf shapes in order: compounds flatten recursively, everything
    /// else yields itself.
    pub fn leaves(&self) -> Vec<&Shape> {
        match &self.geometry {
            Geometry::Compound(children) => children.iter().flat_map(Shape::leaves).collect(),
            _ => vec![self],
        }
    }

    /// All shells of this shape, in order.
    pub fn shells(&self) -> Vec<&Shell> {
        match &self.geometry {
            Geometry::Solid(solid) => solid.shells.iter().collect(),
            Geometry::Shell(shell) => vec![shell],
            Geometry::Compound(children) => children.iter().flat_map(Shape::shells).collect(),
        }
    }

    /// Whether every shell of the shape is manifold and oriented.
    pub fn is_manifold(&self) -> bool {
        let tol = Tolerance::DEFAULT;
        self.shells()
            .iter()
            .all(|s| s.is_manifold_and_oriented(&tol))
    }

    /// Net enclosed volume, when every face is planar.
    ///
    /// `None` for shapes with analytic (curved) faces; tessellate first
    /// if mass properties of those are needed.
    pub fn volume(&self) -> Option<f64> {
        match &self.geometry {
            Geometry::Solid(solid) => solid.volume(),
            Geometry::Shell(shell) => shell.volume(),
            Geometry::Compound(children) => children.iter().map(Shape::volume).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use forma_kernel_math::Point3;

    /// 12 outward-wound triangles covering the unit cube.
    fn unit_cube_tris() -> Vec<TriFace> {
        let v = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let idx: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        idx.iter()
            .map(|t| TriFace::new(v[t[0]], v[t[1]], v[t[2]]))
            .collect()
    }

    #[test]
    fn test_closed_cube_is_manifold() {
        let shells = sew(&unit_cube_tris(), 1e-4);
        assert_eq!(shells.len(), 1);
        let tol = Tolerance::DEFAULT;
        assert!(shells[0].is_manifold_and_oriented(&tol));
        assert!(shells[0].is_closed(&tol));
    }

    #[test]
    fn test_cube_with_missing_facet_is_open() {
        let mut tris = unit_cube_tris();
        tris.pop();
        let shells = sew(&tris, 1e-4);
        assert_eq!(shells.len(), 1);
        let tol = Tolerance::DEFAULT;
        assert!(!shells[0].is_manifold_and_oriented(&tol));
        assert!(!shells[0].is_closed(&tol));
    }

    #[test]
    fn test_cube_volume() {
        let shells = sew(&unit_cube_tris(), 1e-4);
        assert_relative_eq!(shells[0].volume().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_void_shell_subtracts_volume() {
        // Outer 1x1x1 cube plus an inward-wound half-size cube inside it.
        let outer = sew(&unit_cube_tris(), 1e-4).remove(0);
        let inner_tris: Vec<TriFace> = unit_cube_tris()
            .iter()
            .map(|t| {
                let scale = |p: &Point3| Point3::new(
                    0.25 + p.x * 0.5,
                    0.25 + p.y * 0.5,
                    0.25 + p.z * 0.5,
                );
                // Swap two corners to flip the winding inward.
                TriFace::new(scale(&t.a), scale(&t.c), scale(&t.b))
            })
            .collect();
        let inner = sew(&inner_tris, 1e-4).remove(0);
        let solid = Solid {
            shells: vec![outer, inner],
        };
        assert_relative_eq!(solid.volume().unwrap(), 1.0 - 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_compound_leaves_flatten() {
        let a = Shape::from_shell(Shell::default()).with_label("a");
        let b = Shape::from_shell(Shell::default()).with_label("b");
        let inner = Shape::new(Geometry::Compound(vec![b]));
        let top = Shape::new(Geometry::Compound(vec![a, inner]));
        let leaves = top.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].label.as_deref(), Some("a"));
        assert_eq!(leaves[1].label.as_deref(), Some("b"));
    }
}
