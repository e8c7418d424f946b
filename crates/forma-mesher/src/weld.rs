//! Vertex welding and degenerate triangle filtering.
//!
//! Tessellation emits one vertex per face-local sample, so shared
//! boundaries between faces duplicate points. Welding collapses
//! near-duplicates onto one canonical vertex so downstream consumers
//! see a minimal indexed mesh; filtering then drops the triangles that
//! welding collapsed to zero area.

use std::collections::HashMap;

use forma_kernel_math::Point3;

/// Rounding precision derived from a welding tolerance.
///
/// A tolerance of `1e-4` yields 4: coordinates are compared after
/// rounding to 4 decimal places.
pub fn weld_digits(tolerance: f64) -> i32 {
    -(tolerance.log10().round() as i32)
}

/// Weld raw vertices onto canonical indices.
///
/// Coordinates rounded to `weld_digits(tolerance)` decimals form the
/// equivalence key; the first occurrence of each key keeps its original
/// (unrounded) coordinates and claims the next canonical index. Returns
/// the canonical vertex list and, for every raw vertex in input order,
/// its canonical index.
///
/// Welding never relocates a vertex by more than half a rounding step
/// per axis, and is deterministic for a given input order.
pub fn weld_vertices(raw: &[Point3], tolerance: f64) -> (Vec<Point3>, Vec<usize>) {
    let digits = weld_digits(tolerance);
    let scale = 10f64.powi(digits);

    let mut key_to_index: HashMap<[i64; 3], usize> = HashMap::new();
    let mut vertices: Vec<Point3> = Vec::new();
    let mut raw_to_canonical: Vec<usize> = Vec::with_capacity(raw.len());

    for p in raw {
        let key = [
            (p.x * scale).round() as i64,
            (p.y * scale).round() as i64,
            (p.z * scale).round() as i64,
        ];
        let index = *key_to_index.entry(key).or_insert_with(|| {
            vertices.push(*p);
            vertices.len() - 1
        });
        raw_to_canonical.push(index);
    }

    (vertices, raw_to_canonical)
}

/// Drop triangles that welding collapsed.
///
/// Maps each raw index triple through the canonical table and keeps the
/// triangle only if all three canonical indices are pairwise distinct.
/// Surviving triangles stay in input order.
pub fn filter_degenerate(raw_triangles: &[[usize; 3]], raw_to_canonical: &[usize]) -> Vec<[u32; 3]> {
    let mut triangles = Vec::with_capacity(raw_triangles.len());
    for tri in raw_triangles {
        let a = raw_to_canonical[tri[0]];
        let b = raw_to_canonical[tri[1]];
        let c = raw_to_canonical[tri[2]];
        if a != b && b != c && c != a {
            triangles.push([a as u32, b as u32, c as u32]);
        }
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    #[test]
    fn test_weld_digits() {
        assert_eq!(weld_digits(1e-4), 4);
        assert_eq!(weld_digits(1e-6), 6);
    }

    #[test]
    fn test_weld_merges_duplicates() {
        let raw = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let (vertices, map) = weld_vertices(&raw, TOL);
        assert_eq!(vertices.len(), 2);
        assert_eq!(map, vec![0, 1, 0]);
    }

    #[test]
    fn test_weld_keeps_original_coordinates() {
        // Both land in the same cell; the first occurrence wins and its
        // unrounded coordinates are preserved.
        let first = Point3::new(1.000_04, 0.0, 0.0);
        let raw = [first, Point3::new(1.0, 0.0, 0.0)];
        let (vertices, map) = weld_vertices(&raw, TOL);
        assert_eq!(vertices.len(), 1);
        assert_eq!(vertices[0], first);
        assert_eq!(map, vec![0, 0]);
    }

    #[test]
    fn test_weld_is_idempotent() {
        let raw = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let (first, _) = weld_vertices(&raw, TOL);
        let (second, map) = weld_vertices(&first, TOL);
        assert_eq!(second, first);
        assert_eq!(map, vec![0, 1, 2]);
    }

    #[test]
    fn test_weld_tolerance_bounds() {
        // Less than half a rounding step apart on every axis: same cell.
        let near = [
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0 + 4e-5, 1.0 - 4e-5, 1.0 + 4e-5),
        ];
        let (vertices, _) = weld_vertices(&near, TOL);
        assert_eq!(vertices.len(), 1);

        // More than the tolerance apart on one axis: never welded.
        let far = [Point3::new(1.0, 1.0, 1.0), Point3::new(1.0 + 2e-4, 1.0, 1.0)];
        let (vertices, _) = weld_vertices(&far, TOL);
        assert_eq!(vertices.len(), 2);
    }

    #[test]
    fn test_filter_drops_collapsed_triangles() {
        // Vertices 0 and 2 weld together, collapsing the second triangle.
        let raw = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let (_, map) = weld_vertices(&raw, TOL);
        let triangles = filter_degenerate(&[[0, 1, 3], [0, 1, 2]], &map);
        assert_eq!(triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_filter_keeps_input_order() {
        let raw = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let (_, map) = weld_vertices(&raw, TOL);
        let triangles = filter_degenerate(&[[0, 1, 2], [1, 3, 2]], &map);
        assert_eq!(triangles, vec![[0, 1, 2], [1, 3, 2]]);
    }
}
