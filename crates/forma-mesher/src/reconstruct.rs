//! Shell/solid reconstruction from indexed meshes.
//!
//! The inverse of export: a flat triangle list comes back as the
//! richest topology the data supports. Sewing may split the mesh into
//! several shells when the file encodes voids or disconnected parts.

use forma_kernel_brep::{sew, Geometry, Shape, Shell, Solid, TriFace};
use forma_kernel_math::{Tolerance, TOLERANCE};

use crate::error::{MesherError, Result};
use crate::model::Mesh;

/// Rebuild a shape from an indexed mesh.
///
/// Every triangle becomes a planar face (zero-area triangles are
/// discarded, independent of the exporter's own filtering, since meshes
/// may originate from third-party tools); the faces are sewn into
/// shells by positional tolerance. When every sewn shell is manifold
/// and oriented the result is one solid owning all of them (outer
/// boundary plus voids); a single open shell comes back as a shell, and
/// several come back as a compound of shells.
///
/// Topology problems never fail: an empty mesh, or one sewing cannot
/// close, yields an open shell. Only indices pointing past the vertex
/// array are an error.
pub fn shape_from_mesh(mesh: &Mesh) -> Result<Shape> {
    let vertex_count = mesh.vertices.len() as u32;
    let mut faces = Vec::with_capacity(mesh.triangle_count());
    for tri in &mesh.triangles {
        for &index in tri {
            if index >= vertex_count {
                return Err(MesherError::MalformedMesh(format!(
                    "triangle index {index} out of range ({vertex_count} vertices)"
                )));
            }
        }
        let face = TriFace::new(
            mesh.vertices[tri[0] as usize],
            mesh.vertices[tri[1] as usize],
            mesh.vertices[tri[2] as usize],
        );
        if face.area() > 0.0 {
            faces.push(face);
        }
    }

    let mut shells = sew(&faces, TOLERANCE);
    let tol = Tolerance::DEFAULT;

    if shells.is_empty() {
        return Ok(Shape::from_shell(Shell::default()));
    }
    if shells.iter().all(|s| s.is_manifold_and_oriented(&tol)) {
        return Ok(Shape::new(Geometry::Solid(Solid { shells })));
    }
    if shells.len() == 1 {
        return Ok(Shape::from_shell(shells.remove(0)));
    }
    Ok(Shape::new(Geometry::Compound(
        shells.into_iter().map(Shape::from_shell).collect(),
    )))
}
