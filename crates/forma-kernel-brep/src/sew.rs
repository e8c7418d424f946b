//! Tolerance-based sewing of triangular faces into shells.

use std::collections::HashMap;

use forma_kernel_math::Point3;

use crate::face::{Face, PlanarFace, TriFace};
use crate::Shell;

/// Quantize a point onto the tolerance lattice.
///
/// Two points land on the same lattice cell iff every coordinate rounds
/// to the same multiple of `tolerance`.
pub(crate) fn quantize(p: &Point3, tolerance: f64) -> [i64; 3] {
    [
        (p.x / tolerance).round() as i64,
        (p.y / tolerance).round() as i64,
        (p.z / tolerance).round() as i64,
    ]
}

/// Sew a collection of triangular faces into connected shells.
///
/// Corner points within `tolerance` of the same lattice cell are treated
/// as one topological vertex; faces sharing an (undirected) edge between
/// two such vertices belong to the same shell. Shells are returned in
/// order of their first face, and faces within a shell keep input order.
pub fn sew(faces: &[TriFace], tolerance: f64) -> Vec<Shell> {
    if faces.is_empty() {
        return Vec::new();
    }

    // Assign a topological vertex id to each distinct lattice cell.
    let mut cell_ids: HashMap<[i64; 3], usize> = HashMap::new();
    let mut corner_ids: Vec<[usize; 3]> = Vec::with_capacity(faces.len());
    for face in faces {
        let mut ids = [0usize; 3];
        for (slot, p) in [face.a, face.b, face.c].iter().enumerate() {
            let key = quantize(p, tolerance);
            let next = cell_ids.len();
            ids[slot] = *cell_ids.entry(key).or_insert(next);
        }
        corner_ids.push(ids);
    }

    // Faces incident to each undirected edge.
    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (fi, ids) in corner_ids.iter().enumerate() {
        for k in 0..3 {
            let (u, v) = (ids[k], ids[(k + 1) % 3]);
            let key = if u < v { (u, v) } else { (v, u) };
            edge_faces.entry(key).or_default().push(fi);
        }
    }

    // Connected components over shared edges, discovered in face order.
    let mut component = vec![usize::MAX; faces.len()];
    let mut n_components = 0;
    for start in 0..faces.len() {
        if component[start] != usize::MAX {
            continue;
        }
        let comp = n_components;
        n_components += 1;
        let mut stack = vec![start];
        component[start] = comp;
        while let Some(fi) = stack.pop() {
            let ids = corner_ids[fi];
            for k in 0..3 {
                let (u, v) = (ids[k], ids[(k + 1) % 3]);
                let key = if u < v { (u, v) } else { (v, u) };
                for &other in &edge_faces[&key] {
                    if component[other] == usize::MAX {
                        component[other] = comp;
                        stack.push(other);
                    }
                }
            }
        }
    }

    let mut shells: Vec<Shell> = (0..n_components).map(|_| Shell::default()).collect();
    for (fi, face) in faces.iter().enumerate() {
        shells[component[fi]]
            .faces
            .push(Face::Planar(PlanarFace::triangle(face)));
    }
    shells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64, z: f64) -> TriFace {
        TriFace::new(
            Point3::new(ax, ay, z),
            Point3::new(bx, by, z),
            Point3::new(cx, cy, z),
        )
    }

    #[test]
    fn test_sew_two_adjacent_triangles_into_one_shell() {
        let faces = [
            tri(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            tri(1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0),
        ];
        let shells = sew(&faces, 1e-4);
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].faces.len(), 2);
    }

    #[test]
    fn test_sew_disconnected_patches_into_separate_shells() {
        let faces = [
            tri(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            tri(10.0, 0.0, 11.0, 0.0, 10.0, 1.0, 0.0),
        ];
        let shells = sew(&faces, 1e-4);
        assert_eq!(shells.len(), 2);
    }

    #[test]
    fn test_sew_merges_edges_within_tolerance() {
        // Second triangle's shared edge is offset by less than the lattice
        // half-step; sewing must still join the faces.
        let faces = [
            tri(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            TriFace::new(
                Point3::new(1.0 + 2e-5, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0 - 2e-5, 0.0),
            ),
        ];
        let shells = sew(&faces, 1e-4);
        assert_eq!(shells.len(), 1);
    }

    #[test]
    fn test_sew_empty_input() {
        assert!(sew(&[], 1e-4).is_empty());
    }

    #[test]
    fn test_sew_keeps_first_face_order() {
        let faces = [
            tri(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
            tri(10.0, 0.0, 11.0, 0.0, 10.0, 1.0, 0.0),
            tri(1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0),
        ];
        let shells = sew(&faces, 1e-4);
        // Shell 0 starts at face 0 and also holds face 2.
        assert_eq!(shells.len(), 2);
        assert_eq!(shells[0].faces.len(), 2);
        assert_eq!(shells[1].faces.len(), 1);
    }
}
