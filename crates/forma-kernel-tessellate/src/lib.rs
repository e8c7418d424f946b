#![warn(missing_docs)]

//! B-rep to triangle mesh tessellation for the forma kernel.
//!
//! Converts B-rep faces into per-face triangle meshes under linear and
//! angular deflection control:
//! 1. Planar faces fan out from their convex boundary
//! 2. Curved faces sample rings whose segment count satisfies both
//!    deflection bounds
//! 3. Faces are processed independently, optionally in parallel
//!
//! Output keeps strict face order and within-face vertex order whether
//! or not parallelism is enabled, so downstream welding is
//! deterministic.

use std::f64::consts::PI;

use rayon::prelude::*;

use forma_kernel_brep::{CylinderFace, DiskFace, Face, PlanarFace, Shape, SphereFace};
use forma_kernel_math::Point3;

/// Upper bound on ring segments, matching what deflections below 1e-6
/// of the radius would otherwise request.
const MAX_SEGMENTS: usize = 512;

/// Triangulation of a single B-rep face.
#[derive(Debug, Clone)]
pub struct FaceMesh {
    /// Face-local vertex positions.
    pub points: Vec<Point3>,
    /// Triangles as index triples into `points`, wound for the face's
    /// natural orientation.
    pub triangles: Vec<[usize; 3]>,
    /// Whether the face's orientation is reversed; consumers emitting a
    /// global mesh swap the second and third index of each triangle to
    /// keep outward normals.
    pub reversed: bool,
}

impl FaceMesh {
    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }
}

/// Tessellate every face of a shape.
///
/// `linear_deflection` bounds the sagitta between a chord and the true
/// surface; `angular_deflection` bounds the turn angle per segment (in
/// radians). With `in_parallel`, faces are meshed concurrently; results
/// are collected by face index either way, so the output is identical.
pub fn tessellate(
    shape: &Shape,
    linear_deflection: f64,
    angular_deflection: f64,
    in_parallel: bool,
) -> Vec<FaceMesh> {
    let faces: Vec<&Face> = shape
        .shells()
        .iter()
        .flat_map(|s| s.faces.iter())
        .collect();

    if in_parallel {
        faces
            .par_iter()
            .map(|f| tessellate_face(f, linear_deflection, angular_deflection))
            .collect()
    } else {
        faces
            .iter()
            .map(|f| tessellate_face(f, linear_deflection, angular_deflection))
            .collect()
    }
}

/// Tessellate a single B-rep face.
pub fn tessellate_face(face: &Face, linear_deflection: f64, angular_deflection: f64) -> FaceMesh {
    match face {
        Face::Planar(p) => tessellate_planar(p),
        Face::Disk(d) => tessellate_disk(d, linear_deflection, angular_deflection),
        Face::Cylinder(c) => tessellate_cylinder(c, linear_deflection, angular_deflection),
        Face::Sphere(s) => tessellate_sphere(s, linear_deflection, angular_deflection),
    }
}

/// Segments for a full circle of the given radius under both deflection
/// bounds.
///
/// The sagitta of a chord spanning angle `t` is `r (1 - cos(t/2))`;
/// keeping it below the linear deflection bounds the step angle at
/// `2 acos(1 - d/r)`.
fn circle_segments(radius: f64, linear_deflection: f64, angular_deflection: f64) -> usize {
    let sagitta_step = if linear_deflection >= radius {
        PI
    } else {
        2.0 * (1.0 - linear_deflection / radius).acos()
    };
    let step = angular_deflection.min(sagitta_step);
    if step <= 0.0 {
        return MAX_SEGMENTS;
    }
    ((2.0 * PI / step).ceil() as usize).clamp(3, MAX_SEGMENTS)
}

/// Fan-triangulate a convex planar boundary.
fn tessellate_planar(face: &PlanarFace) -> FaceMesh {
    let points = face.boundary.clone();
    let mut triangles = Vec::new();
    for i in 1..points.len().saturating_sub(1) {
        triangles.push([0, i, i + 1]);
    }
    FaceMesh {
        points,
        triangles,
        reversed: face.reversed,
    }
}

/// Fan-triangulate a disk from its center.
fn tessellate_disk(face: &DiskFace, linear_deflection: f64, angular_deflection: f64) -> FaceMesh {
    let n = circle_segments(face.radius, linear_deflection, angular_deflection);
    let mut points = Vec::with_capacity(n + 1);
    points.push(face.center);
    for i in 0..n {
        let theta = 2.0 * PI * (i as f64) / (n as f64);
        points.push(Point3::new(
            face.center.x + face.radius * theta.cos(),
            face.center.y + face.radius * theta.sin(),
            face.center.z,
        ));
    }
    let mut triangles = Vec::with_capacity(n);
    for i in 0..n {
        triangles.push([0, 1 + i, 1 + (i + 1) % n]);
    }
    FaceMesh {
        points,
        triangles,
        reversed: face.reversed,
    }
}

/// Mesh a cylinder wall as one band of quads split into triangles.
///
/// Ring points use the same angular sampling as [`tessellate_disk`], so
/// wall and caps weld watertight when meshed with the same deflections.
fn tessellate_cylinder(
    face: &CylinderFace,
    linear_deflection: f64,
    angular_deflection: f64,
) -> FaceMesh {
    let n = circle_segments(face.radius, linear_deflection, angular_deflection);
    let mut points = Vec::with_capacity(2 * n);
    for z in [0.0, face.height] {
        for i in 0..n {
            let theta = 2.0 * PI * (i as f64) / (n as f64);
            points.push(Point3::new(
                face.radius * theta.cos(),
                face.radius * theta.sin(),
                z,
            ));
        }
    }
    let mut triangles = Vec::with_capacity(2 * n);
    for i in 0..n {
        let j = (i + 1) % n;
        let (b_i, b_j) = (i, j);
        let (t_i, t_j) = (n + i, n + j);
        triangles.push([b_i, b_j, t_i]);
        triangles.push([b_j, t_j, t_i]);
    }
    FaceMesh {
        points,
        triangles,
        reversed: face.reversed,
    }
}

/// Mesh a full sphere with latitude bands and a single vertex at each
/// pole.
fn tessellate_sphere(
    face: &SphereFace,
    linear_deflection: f64,
    angular_deflection: f64,
) -> FaceMesh {
    let n_lon = circle_segments(face.radius, linear_deflection, angular_deflection);
    let n_lat = (n_lon / 2).max(2);

    let mut points = Vec::new();
    // South pole.
    points.push(Point3::new(0.0, 0.0, -face.radius));
    for j in 1..n_lat {
        let phi = -PI / 2.0 + PI * (j as f64) / (n_lat as f64);
        for i in 0..n_lon {
            let theta = 2.0 * PI * (i as f64) / (n_lon as f64);
            points.push(Point3::new(
                face.radius * phi.cos() * theta.cos(),
                face.radius * phi.cos() * theta.sin(),
                face.radius * phi.sin(),
            ));
        }
    }
    // North pole.
    points.push(Point3::new(0.0, 0.0, face.radius));

    let south = 0;
    let north = points.len() - 1;
    let band = |j: usize, i: usize| 1 + (j - 1) * n_lon + (i % n_lon);

    let mut triangles = Vec::new();
    for i in 0..n_lon {
        triangles.push([south, band(1, i + 1), band(1, i)]);
    }
    for j in 1..n_lat - 1 {
        for i in 0..n_lon {
            let bl = band(j, i);
            let br = band(j, i + 1);
            let tl = band(j + 1, i);
            let tr = band(j + 1, i + 1);
            triangles.push([bl, br, tl]);
            triangles.push([br, tr, tl]);
        }
    }
    for i in 0..n_lon {
        triangles.push([north, band(n_lat - 1, i), band(n_lat - 1, i + 1)]);
    }

    FaceMesh {
        points,
        triangles,
        reversed: face.reversed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use forma_kernel_brep::{box_solid, cylinder, sphere};

    #[test]
    fn test_box_tessellation() {
        let meshes = tessellate(&box_solid(1.0, 1.0, 1.0), 0.001, 0.1, false);
        assert_eq!(meshes.len(), 6);
        for m in &meshes {
            assert_eq!(m.num_vertices(), 4);
            assert_eq!(m.num_triangles(), 2);
            assert!(!m.reversed);
        }
    }

    #[test]
    fn test_cylinder_wall_and_caps_share_sampling() {
        let meshes = tessellate(&cylinder(2.0, 5.0), 0.001, 0.1, false);
        assert_eq!(meshes.len(), 3);
        let wall = &meshes[0];
        let top = &meshes[1];
        let bottom = &meshes[2];
        // Caps have one extra center vertex over a single wall ring.
        assert_eq!(wall.num_vertices(), 2 * (top.num_vertices() - 1));
        assert_eq!(bottom.num_vertices(), top.num_vertices());
        assert!(bottom.reversed);
        assert!(!top.reversed);
    }

    #[test]
    fn test_smaller_deflection_means_more_segments() {
        let coarse = circle_segments(1.0, 0.01, 0.5);
        let fine = circle_segments(1.0, 0.0001, 0.5);
        assert!(fine > coarse);
        assert!(coarse >= 3);
    }

    #[test]
    fn test_angular_deflection_bounds_segments() {
        // Loose linear bound, angular bound of 0.1 rad dominates.
        let n = circle_segments(1.0, 10.0, 0.1);
        assert_eq!(n, (2.0 * PI / 0.1).ceil() as usize);
    }

    #[test]
    fn test_segment_count_is_clamped() {
        assert_eq!(circle_segments(1.0, 1e-12, 1e-12), MAX_SEGMENTS);
        assert_eq!(circle_segments(1.0, 100.0, 100.0), 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let shape = sphere(1.0);
        let seq = tessellate(&shape, 0.001, 0.1, false);
        let par = tessellate(&shape, 0.001, 0.1, true);
        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(par.iter()) {
            assert_eq!(a.triangles, b.triangles);
            assert_eq!(a.points.len(), b.points.len());
            for (p, q) in a.points.iter().zip(b.points.iter()) {
                assert_relative_eq!((p - q).norm(), 0.0);
            }
        }
    }

    #[test]
    fn test_sphere_poles_are_single_vertices() {
        let meshes = tessellate(&sphere(1.0), 0.01, 0.3, false);
        assert_eq!(meshes.len(), 1);
        let m = &meshes[0];
        let n_lon = circle_segments(1.0, 0.01, 0.3);
        let n_lat = (n_lon / 2).max(2);
        assert_eq!(m.num_vertices(), 2 + (n_lat - 1) * n_lon);
        assert_eq!(m.num_triangles(), 2 * n_lon + 2 * n_lon * (n_lat - 2));
    }

    #[test]
    fn test_planar_triangle_passes_through() {
        use forma_kernel_brep::{Face, PlanarFace, TriFace};
        let tri = TriFace::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let mesh = tessellate_face(&Face::Planar(PlanarFace::triangle(&tri)), 0.001, 0.1);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
    }
}
