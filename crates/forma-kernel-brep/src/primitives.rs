//! Analytic primitive solids.
//!
//! Constructs valid shape geometry for the standard test solids: box,
//! cylinder, and sphere. Curved faces stay analytic here; the
//! tessellator turns them into triangles under deflection control.

use forma_kernel_math::Point3;

use crate::face::{CylinderFace, DiskFace, Face, PlanarFace, SphereFace};
use crate::{Geometry, Shape, Shell, Solid};

/// Build a box with corner at the origin and dimensions `(sx, sy, sz)`.
///
/// Six planar quad faces, wound counter-clockwise when viewed from
/// outside so all natural normals point outward.
pub fn box_solid(sx: f64, sy: f64, sz: f64) -> Shape {
    let v = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(sx, 0.0, 0.0),
        Point3::new(sx, sy, 0.0),
        Point3::new(0.0, sy, 0.0),
        Point3::new(0.0, 0.0, sz),
        Point3::new(sx, 0.0, sz),
        Point3::new(sx, sy, sz),
        Point3::new(0.0, sy, sz),
    ];
    // One quad per side: bottom, top, front, back, left, right.
    let quads: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    let faces = quads
        .iter()
        .map(|q| Face::Planar(PlanarFace::new(q.iter().map(|&i| v[i]).collect())))
        .collect();
    Shape::new(Geometry::Solid(Solid::from_shell(Shell::new(faces))))
}

/// Build a cylinder of the given radius and height, axis +Z, base at
/// the origin.
///
/// One lateral wall plus two disk caps; the bottom cap is reversed so
/// its normal points -Z, out of the material.
pub fn cylinder(radius: f64, height: f64) -> Shape {
    let faces = vec![
        Face::Cylinder(CylinderFace {
            radius,
            height,
            reversed: false,
        }),
        Face::Disk(DiskFace {
            center: Point3::new(0.0, 0.0, height),
            radius,
            reversed: false,
        }),
        Face::Disk(DiskFace {
            center: Point3::origin(),
            radius,
            reversed: true,
        }),
    ];
    Shape::new(Geometry::Solid(Solid::from_shell(Shell::new(faces))))
}

/// Build a sphere of the given radius centered at the origin.
pub fn sphere(radius: f64) -> Shape {
    let faces = vec![Face::Sphere(SphereFace {
        radius,
        reversed: false,
    })];
    Shape::new(Geometry::Solid(Solid::from_shell(Shell::new(faces))))
}
