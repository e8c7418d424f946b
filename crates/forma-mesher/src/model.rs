//! Container data model: units, mesh roles, metadata, mesh objects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forma_kernel_math::Point3;

/// Model length unit of a mesh container.
///
/// The mapping to 3MF unit strings is a fixed bijection and part of the
/// stable interchange contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Micrometers (3MF `micron`).
    Micrometer,
    /// Millimeters.
    Millimeter,
    /// Centimeters.
    Centimeter,
    /// Inches.
    Inch,
    /// Feet.
    Foot,
    /// Meters.
    Meter,
}

impl Unit {
    /// The 3MF model unit string.
    pub fn as_3mf_str(&self) -> &'static str {
        match self {
            Unit::Micrometer => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        }
    }

    /// Parse a 3MF model unit string.
    pub fn from_3mf_str(s: &str) -> Option<Self> {
        match s {
            "micron" => Some(Unit::Micrometer),
            "millimeter" => Some(Unit::Millimeter),
            "centimeter" => Some(Unit::Centimeter),
            "inch" => Some(Unit::Inch),
            "foot" => Some(Unit::Foot),
            "meter" => Some(Unit::Meter),
            _ => None,
        }
    }
}

/// Functional purpose of a mesh object within a fabrication container.
///
/// The mapping to 3MF object type strings is a fixed bijection and part
/// of the stable interchange contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshRole {
    /// No specific role.
    Other,
    /// Printable model geometry.
    Model,
    /// Support structure.
    Support,
    /// Solid support structure.
    SolidSupport,
}

impl MeshRole {
    /// The 3MF object type string.
    pub fn as_3mf_str(&self) -> &'static str {
        match self {
            MeshRole::Other => "other",
            MeshRole::Model => "model",
            MeshRole::Support => "support",
            MeshRole::SolidSupport => "solidsupport",
        }
    }

    /// Parse a 3MF object type string.
    pub fn from_3mf_str(s: &str) -> Option<Self> {
        match s {
            "other" => Some(MeshRole::Other),
            "model" => Some(MeshRole::Model),
            "support" => Some(MeshRole::Support),
            "solidsupport" => Some(MeshRole::SolidSupport),
            _ => None,
        }
    }
}

/// One namespaced metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    /// Categorizer of different metadata entries.
    pub namespace: String,
    /// Metadata label.
    pub name: String,
    /// Metadata content.
    pub value: String,
    /// Metadata type tag.
    pub metadata_type: String,
    /// Advisory hint that consumers should keep the record even if
    /// nothing references it.
    pub must_preserve: bool,
}

/// An indexed triangle mesh.
///
/// Vertices are unique (first-occurrence order from welding) and every
/// triangle indexes three pairwise-distinct vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as index triples into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether every triangle indexes three distinct existing vertices.
    pub fn is_valid(&self) -> bool {
        let n = self.vertices.len() as u32;
        self.triangles
            .iter()
            .all(|t| t[0] < n && t[1] < n && t[2] < n && t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
    }

    /// Whether every edge is shared by exactly two triangles traversing
    /// it in opposite directions.
    ///
    /// Open shells and soups fail this; they are still legitimate
    /// meshes, just not watertight.
    pub fn is_manifold_and_oriented(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }
        let mut edges: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
        for t in &self.triangles {
            for k in 0..3 {
                let (u, v) = (t[k], t[(k + 1) % 3]);
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
}

/// Object-level material reference: a base-material group and an entry
/// index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectProperty {
    /// Resource id of the base-material group.
    pub group_id: u32,
    /// Index of the material within the group.
    pub index: u32,
}

/// One mesh object in a container.
#[derive(Debug, Clone)]
pub struct MeshObject {
    /// Container resource id.
    pub id: u32,
    /// The indexed mesh geometry.
    pub mesh: Mesh,
    /// Functional role of the mesh.
    pub role: MeshRole,
    /// Display name, from the source shape's label.
    pub name: Option<String>,
    /// Part number.
    pub part_number: Option<String>,
    /// Stable identifier.
    pub uuid: Option<Uuid>,
    /// Object-level material binding, if the source shape had a color.
    pub property: Option<ObjectProperty>,
}

/// Summary of a mesh object's non-geometric properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshProperties {
    /// Display name.
    pub name: Option<String>,
    /// Part number.
    pub part_number: Option<String>,
    /// Functional role.
    pub role: MeshRole,
    /// Stable identifier.
    pub uuid: Option<Uuid>,
}
