//! STL container read/write.
//!
//! STL is a plain facet soup: no units, colors, names, or metadata.
//! Writing flattens every mesh object into one file; reading yields raw
//! corner triples that the caller welds back into an indexed mesh.
//!
//! Binary layout:
//!
//! ```text
//! u8[80]      header (ignored)
//! u32         triangle count
//! per triangle:
//!     f32[3]  normal
//!     f32[9]  corners
//!     u16     attribute byte count (0)
//! ```
//!
//! ASCII files start with `solid` and wrap each facet in
//! `facet normal` / `outer loop` / `vertex` lines.

use forma_kernel_math::Point3;

use crate::error::{MesherError, Result};
use crate::model::MeshObject;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Serialize all mesh objects as one binary STL file.
pub(crate) fn write_stl(objects: &[MeshObject]) -> Vec<u8> {
    let triangle_count: usize = objects.iter().map(|o| o.mesh.triangle_count()).sum();

    let mut bytes = Vec::with_capacity(HEADER_SIZE + 4 + triangle_count * TRIANGLE_SIZE);
    let mut header = [0u8; HEADER_SIZE];
    let tag = b"forma binary STL";
    header[..tag.len()].copy_from_slice(tag);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&(triangle_count as u32).to_le_bytes());

    for object in objects {
        for tri in &object.mesh.triangles {
            let a = object.mesh.vertices[tri[0] as usize];
            let b = object.mesh.vertices[tri[1] as usize];
            let c = object.mesh.vertices[tri[2] as usize];
            let normal = (b - a).cross(&(c - a));
            let normal = if normal.norm() > 0.0 {
                normal.normalize()
            } else {
                normal
            };
            for v in [normal.x, normal.y, normal.z] {
                bytes.extend_from_slice(&(v as f32).to_le_bytes());
            }
            for p in [a, b, c] {
                for v in [p.x, p.y, p.z] {
                    bytes.extend_from_slice(&(v as f32).to_le_bytes());
                }
            }
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
    }
    bytes
}

/// Decode an STL file into raw facet corner triples.
///
/// Detects ASCII against binary: ASCII files start with `solid`, but so
/// do some binary headers, so the binary record arithmetic gets the
/// final say.
pub(crate) fn read_stl(bytes: &[u8]) -> Result<Vec<[Point3; 3]>> {
    if bytes.len() < 6 {
        return Err(MesherError::container("file too small to be valid STL"));
    }
    let looks_ascii = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| bytes[start..].starts_with(b"solid"))
        .unwrap_or(false);

    if looks_ascii && !has_binary_layout(bytes) {
        read_stl_ascii(bytes)
    } else {
        read_stl_binary(bytes)
    }
}

/// Whether the declared binary triangle count matches the file size.
fn has_binary_layout(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ]) as usize;
    bytes.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE
}

fn read_stl_binary(bytes: &[u8]) -> Result<Vec<[Point3; 3]>> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(MesherError::container("binary STL truncated before count"));
    }
    let count = u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ]) as usize;
    let expected = HEADER_SIZE + 4 + count * TRIANGLE_SIZE;
    if bytes.len() < expected {
        return Err(MesherError::container(format!(
            "binary STL truncated: {} bytes, {expected} expected",
            bytes.len()
        )));
    }

    let mut facets = Vec::with_capacity(count);
    for i in 0..count {
        // Skip the stored normal; corners define the facet.
        let record = HEADER_SIZE + 4 + i * TRIANGLE_SIZE + 12;
        let mut corners = [Point3::origin(); 3];
        for (k, corner) in corners.iter_mut().enumerate() {
            let at = record + k * 12;
            let coord = |j: usize| {
                f32::from_le_bytes([
                    bytes[at + j * 4],
                    bytes[at + j * 4 + 1],
                    bytes[at + j * 4 + 2],
                    bytes[at + j * 4 + 3],
                ]) as f64
            };
            *corner = Point3::new(coord(0), coord(1), coord(2));
        }
        facets.push(corners);
    }
    Ok(facets)
}

fn read_stl_ascii(bytes: &[u8]) -> Result<Vec<[Point3; 3]>> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| MesherError::container(format!("ASCII STL is not UTF-8: {e}")))?;

    let mut corners: Vec<Point3> = Vec::new();
    for line in content.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("vertex") {
            continue;
        }
        let mut coord = || -> Result<f64> {
            words
                .next()
                .ok_or_else(|| MesherError::container("vertex line with missing coordinate"))?
                .parse()
                .map_err(|e| MesherError::container(format!("bad vertex coordinate: {e}")))
        };
        corners.push(Point3::new(coord()?, coord()?, coord()?));
    }

    if corners.len() % 3 != 0 {
        return Err(MesherError::container(format!(
            "ASCII STL vertex count {} is not a multiple of 3",
            corners.len()
        )));
    }
    Ok(corners
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}
