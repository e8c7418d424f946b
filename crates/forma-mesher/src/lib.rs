#![warn(missing_docs)]

//! 3MF/STL mesh export and import for the forma kernel.
//!
//! The [`Mesher`] is a mesh container: shapes added to it are
//! tessellated into welded, minimal indexed meshes, and containers read
//! back from disk are reconstructed into the richest topology their
//! triangles support.
//!
//! # Example
//!
//! ```no_run
//! use forma_kernel_brep::box_solid;
//! use forma_mesher::{AddShapeOptions, Mesher};
//!
//! let mut mesher = Mesher::new();
//! let cube = box_solid(10.0, 10.0, 10.0).with_label("cube");
//! mesher.add_shape(&cube, &AddShapeOptions::default()).unwrap();
//! mesher.write("cube.3mf").unwrap();
//! ```

pub use forma_kernel_brep;
pub use forma_kernel_tessellate;

mod error;
mod material;
mod model;
mod reconstruct;
mod stl;
mod threemf;
mod weld;

pub use error::{MesherError, Result};
pub use material::{color_from_hex, color_to_hex, BaseMaterial, BaseMaterialGroup};
pub use model::{Mesh, MeshObject, MeshProperties, MeshRole, MetaData, ObjectProperty, Unit};
pub use reconstruct::shape_from_mesh;
pub use weld::{filter_degenerate, weld_digits, weld_vertices};

use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use forma_kernel_brep::{Color, Shape};
use forma_kernel_math::{Point3, TOLERANCE};
use forma_kernel_tessellate::tessellate;

/// Container file formats this crate can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    ThreeMf,
    Stl,
}

fn container_format(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if extension.eq_ignore_ascii_case("3mf") {
        Ok(Format::ThreeMf)
    } else if extension.eq_ignore_ascii_case("stl") {
        Ok(Format::Stl)
    } else {
        Err(MesherError::UnsupportedExtension(format!(".{extension}")))
    }
}

/// Export controls for [`Mesher::add_shape`].
#[derive(Debug, Clone)]
pub struct AddShapeOptions {
    /// Mesh control for edges: maximum chord-to-surface distance.
    pub linear_deflection: f64,
    /// Mesh control for non-planar surfaces: maximum turn angle per
    /// segment, in radians.
    pub angular_deflection: f64,
    /// Functional role recorded on each generated mesh object.
    pub role: MeshRole,
    /// Part number recorded on each generated mesh object.
    pub part_number: Option<String>,
    /// Stable identifier recorded on each generated mesh object.
    pub identifier: Option<Uuid>,
}

impl Default for AddShapeOptions {
    fn default() -> Self {
        Self {
            linear_deflection: 0.001,
            angular_deflection: 0.1,
            role: MeshRole::Model,
            part_number: None,
            identifier: None,
        }
    }
}

/// Tool for exporting and importing meshed shapes stored in 3MF or STL
/// files.
#[derive(Debug)]
pub struct Mesher {
    unit: Unit,
    mesh_objects: Vec<MeshObject>,
    metadata: Vec<MetaData>,
    material_groups: Vec<BaseMaterialGroup>,
    next_id: u32,
}

impl Mesher {
    /// Container using millimeters.
    pub fn new() -> Self {
        Self::with_unit(Unit::Millimeter)
    }

    /// Container using the given model unit.
    pub fn with_unit(unit: Unit) -> Self {
        Self {
            unit,
            mesh_objects: Vec::new(),
            metadata: Vec::new(),
            material_groups: Vec::new(),
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Unit used in the model.
    pub fn model_unit(&self) -> Unit {
        self.unit
    }

    /// Number of mesh objects in the container.
    pub fn mesh_count(&self) -> usize {
        self.mesh_objects.len()
    }

    /// Number of triangles in each of the container's meshes.
    pub fn triangle_counts(&self) -> Vec<usize> {
        self.mesh_objects
            .iter()
            .map(|m| m.mesh.triangle_count())
            .collect()
    }

    /// Number of vertices in each of the container's meshes.
    pub fn vertex_counts(&self) -> Vec<usize> {
        self.mesh_objects
            .iter()
            .map(|m| m.mesh.vertex_count())
            .collect()
    }

    /// The container's mesh objects.
    pub fn mesh_objects(&self) -> &[MeshObject] {
        &self.mesh_objects
    }

    /// Non-geometric properties of every mesh object.
    pub fn mesh_properties(&self) -> Vec<MeshProperties> {
        self.mesh_objects
            .iter()
            .map(|m| MeshProperties {
                name: m.name.clone(),
                part_number: m.part_number.clone(),
                role: m.role,
                uuid: m.uuid,
            })
            .collect()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Add a metadata record.
    ///
    /// `must_preserve` hints that consumers should keep the record even
    /// when nothing references it; it has no effect on geometry.
    pub fn add_meta_data(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        metadata_type: impl Into<String>,
        must_preserve: bool,
    ) {
        self.metadata.push(MetaData {
            namespace: namespace.into(),
            name: name.into(),
            value: value.into(),
            metadata_type: metadata_type.into(),
            must_preserve,
        });
    }

    /// All metadata records, in insertion order.
    pub fn get_meta_data(&self) -> &[MetaData] {
        &self.metadata
    }

    /// The metadata record with the given namespace and name, if any.
    pub fn get_meta_data_by_key(&self, namespace: &str, name: &str) -> Option<&MetaData> {
        self.metadata
            .iter()
            .find(|m| m.namespace == namespace && m.name == name)
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Add a shape to the container.
    ///
    /// Compound shapes expand into their leaves, one mesh object per
    /// leaf. Leaves that tessellate to fewer than 3 welded vertices or
    /// no surviving triangles are skipped with a warning; the call only
    /// fails if a generated mesh is invalid, which indicates a corrupt
    /// geometry pipeline rather than bad input data.
    pub fn add_shape(&mut self, shape: &Shape, options: &AddShapeOptions) -> Result<()> {
        for leaf in shape.leaves() {
            let face_meshes = tessellate(
                leaf,
                options.linear_deflection,
                options.angular_deflection,
                true,
            );

            // Concatenate per-face meshes with a running vertex offset,
            // flipping reversed faces so outward normals survive.
            let mut raw_vertices: Vec<Point3> = Vec::new();
            let mut raw_triangles: Vec<[usize; 3]> = Vec::new();
            for face_mesh in &face_meshes {
                let offset = raw_vertices.len();
                raw_vertices.extend_from_slice(&face_mesh.points);
                for tri in &face_mesh.triangles {
                    let tri = if face_mesh.reversed {
                        [tri[0], tri[2], tri[1]]
                    } else {
                        *tri
                    };
                    raw_triangles.push([tri[0] + offset, tri[1] + offset, tri[2] + offset]);
                }
            }

            let (vertices, raw_to_canonical) = weld_vertices(&raw_vertices, TOLERANCE);
            let triangles = filter_degenerate(&raw_triangles, &raw_to_canonical);

            if vertices.len() < 3 || triangles.is_empty() {
                log::warn!(
                    "degenerate shape {} - skipped",
                    leaf.label.as_deref().unwrap_or("<unnamed>")
                );
                continue;
            }

            let mesh = Mesh {
                vertices,
                triangles,
            };
            if !mesh.is_valid() {
                return Err(MesherError::InvalidMesh(format!(
                    "generated mesh for shape {} is invalid",
                    leaf.label.as_deref().unwrap_or("<unnamed>")
                )));
            }
            if !mesh.is_manifold_and_oriented() {
                log::warn!(
                    "mesh for shape {} is not manifold",
                    leaf.label.as_deref().unwrap_or("<unnamed>")
                );
            }

            let property = leaf.color.map(|color| self.bind_color(color));
            let id = self.alloc_id();
            self.mesh_objects.push(MeshObject {
                id,
                mesh,
                role: options.role,
                name: leaf.label.clone(),
                part_number: options.part_number.clone(),
                uuid: options.identifier,
                property,
            });
        }
        Ok(())
    }

    /// Add several shapes with the same options.
    pub fn add_shapes(&mut self, shapes: &[Shape], options: &AddShapeOptions) -> Result<()> {
        for shape in shapes {
            self.add_shape(shape, options)?;
        }
        Ok(())
    }

    /// Record a shape color as a base-material group entry.
    fn bind_color(&mut self, color: Color) -> ObjectProperty {
        let group_id = self.alloc_id();
        let mut group = BaseMaterialGroup::new(group_id);
        let index = group.add_material(material::color_to_hex(&color), color);
        self.material_groups.push(group);
        ObjectProperty { group_id, index }
    }

    /// Look up a mesh object's bound display color.
    ///
    /// An absent binding is the normal state for uncolored shapes, so
    /// this never fails, it just returns `None`.
    fn resolve_color(&self, property: Option<ObjectProperty>) -> Option<Color> {
        let property = property?;
        let group = self
            .material_groups
            .iter()
            .find(|g| g.id == property.group_id)?;
        group
            .materials
            .get(property.index as usize)
            .map(|m| m.display_color)
    }

    // =========================================================================
    // File I/O
    // =========================================================================

    /// Write the container to a `.3mf` or `.stl` file.
    ///
    /// The full file is assembled in memory first, so a failed export
    /// never leaves a partially written file at the target path.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = match container_format(path)? {
            Format::ThreeMf => threemf::write_3mf(
                self.unit,
                &self.metadata,
                &self.material_groups,
                &self.mesh_objects,
            )?,
            Format::Stl => stl::write_stl(&self.mesh_objects),
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a `.3mf` or `.stl` file, returning the reconstructed
    /// shapes.
    ///
    /// Mesh objects accumulate in the container alongside anything
    /// already added; for 3MF input the container unit is updated to
    /// the file's declared unit, and labels and colors are carried onto
    /// the returned shapes. A missing file surfaces as the underlying
    /// I/O error.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Vec<Shape>> {
        let path = path.as_ref();
        let format = container_format(path)?;
        let bytes = std::fs::read(path)?;
        match format {
            Format::ThreeMf => self.read_3mf(&bytes),
            Format::Stl => self.read_stl(&bytes),
        }
    }

    fn read_3mf(&mut self, bytes: &[u8]) -> Result<Vec<Shape>> {
        let parsed = threemf::read_3mf(bytes)?;
        if let Some(unit) = parsed.unit {
            self.unit = unit;
        }
        self.metadata.extend(parsed.metadata);

        // Resource ids are container-local; everything imported gets a
        // fresh id, and object property references follow.
        let mut group_ids: HashMap<u32, u32> = HashMap::new();
        for mut group in parsed.material_groups {
            let id = self.alloc_id();
            group_ids.insert(group.id, id);
            group.id = id;
            self.material_groups.push(group);
        }

        let mut shapes = Vec::with_capacity(parsed.objects.len());
        for object in parsed.objects {
            let property = object.property.and_then(|p| {
                group_ids.get(&p.group_id).map(|&group_id| ObjectProperty {
                    group_id,
                    index: p.index,
                })
            });
            let mut shape = shape_from_mesh(&object.mesh)?;
            shape.label = object.name.clone();
            shape.color = self.resolve_color(property);

            let id = self.alloc_id();
            self.mesh_objects.push(MeshObject {
                id,
                mesh: object.mesh,
                role: object.role,
                name: object.name,
                part_number: object.part_number,
                uuid: object.uuid,
                property,
            });
            shapes.push(shape);
        }
        Ok(shapes)
    }

    fn read_stl(&mut self, bytes: &[u8]) -> Result<Vec<Shape>> {
        let facets = stl::read_stl(bytes)?;

        // STL is an unindexed soup; welding rebuilds the shared
        // vertices before reconstruction.
        let mut raw_vertices = Vec::with_capacity(facets.len() * 3);
        let mut raw_triangles = Vec::with_capacity(facets.len());
        for (i, facet) in facets.iter().enumerate() {
            raw_vertices.extend_from_slice(facet);
            raw_triangles.push([3 * i, 3 * i + 1, 3 * i + 2]);
        }
        let (vertices, raw_to_canonical) = weld_vertices(&raw_vertices, TOLERANCE);
        let triangles = filter_degenerate(&raw_triangles, &raw_to_canonical);
        let mesh = Mesh {
            vertices,
            triangles,
        };

        let shape = shape_from_mesh(&mesh)?;
        let id = self.alloc_id();
        self.mesh_objects.push(MeshObject {
            id,
            mesh,
            role: MeshRole::Model,
            name: None,
            part_number: None,
            uuid: None,
            property: None,
        });
        Ok(vec![shape])
    }
}

impl Default for Mesher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use forma_kernel_brep::{box_solid, cylinder, Geometry, Shape, Shell};

    fn temp_path(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn test_cube_3mf_round_trip() {
        let (_dir, path) = temp_path("cube.3mf");
        let cube = box_solid(1.0, 1.0, 1.0)
            .with_label("cube")
            .with_color(Color::new(1.0, 0.0, 0.0, 1.0));

        let mut out = Mesher::new();
        out.add_shape(&cube, &AddShapeOptions::default()).unwrap();
        assert_eq!(out.mesh_count(), 1);
        assert_eq!(out.vertex_counts(), vec![8]);
        assert_eq!(out.triangle_counts(), vec![12]);
        out.write(&path).unwrap();

        let mut back = Mesher::new();
        let shapes = back.read(&path).unwrap();
        assert_eq!(shapes.len(), 1);
        let shape = &shapes[0];
        assert!(matches!(shape.geometry, Geometry::Solid(_)));
        assert_relative_eq!(shape.volume().unwrap(), 1.0, epsilon = 1e-5);
        assert_eq!(shape.label.as_deref(), Some("cube"));
        assert_eq!(shape.color, Some(Color::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_unit_round_trip() {
        let (_dir, path) = temp_path("unit.3mf");
        let mut out = Mesher::with_unit(Unit::Inch);
        out.add_shape(&box_solid(1.0, 1.0, 1.0), &AddShapeOptions::default())
            .unwrap();
        out.write(&path).unwrap();

        let mut back = Mesher::new();
        assert_eq!(back.model_unit(), Unit::Millimeter);
        back.read(&path).unwrap();
        assert_eq!(back.model_unit(), Unit::Inch);
    }

    #[test]
    fn test_stl_round_trip() {
        let (_dir, path) = temp_path("cube.stl");
        let mut out = Mesher::new();
        out.add_shape(&box_solid(1.0, 1.0, 1.0), &AddShapeOptions::default())
            .unwrap();
        out.write(&path).unwrap();

        let mut back = Mesher::new();
        let shapes = back.read(&path).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(back.vertex_counts(), vec![8]);
        assert_relative_eq!(shapes[0].volume().unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_add_shape_appends() {
        let mut mesher = Mesher::new();
        let cube = box_solid(1.0, 1.0, 1.0);
        mesher.add_shape(&cube, &AddShapeOptions::default()).unwrap();
        mesher.add_shape(&cube, &AddShapeOptions::default()).unwrap();
        assert_eq!(mesher.mesh_count(), 2);
    }

    #[test]
    fn test_compound_expands_to_leaves() {
        let compound = Shape::new(Geometry::Compound(vec![
            box_solid(1.0, 1.0, 1.0).with_label("a"),
            box_solid(2.0, 2.0, 2.0).with_label("b"),
        ]));
        let mut mesher = Mesher::new();
        mesher
            .add_shape(&compound, &AddShapeOptions::default())
            .unwrap();
        assert_eq!(mesher.mesh_count(), 2);
        let names: Vec<_> = mesher
            .mesh_properties()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec![Some("a".to_string()), Some("b".to_string())]);
    }

    #[test]
    fn test_degenerate_shape_is_skipped() {
        let mut mesher = Mesher::new();
        mesher
            .add_shape(&box_solid(1.0, 1.0, 1.0), &AddShapeOptions::default())
            .unwrap();
        let empty = Shape::from_shell(Shell::default()).with_label("empty");
        mesher.add_shape(&empty, &AddShapeOptions::default()).unwrap();
        assert_eq!(mesher.mesh_count(), 1);
    }

    #[test]
    fn test_cylinder_export_is_watertight() {
        let mut mesher = Mesher::new();
        mesher
            .add_shape(&cylinder(1.0, 2.0), &AddShapeOptions::default())
            .unwrap();
        assert!(mesher.mesh_objects()[0].mesh.is_manifold_and_oriented());
    }

    #[test]
    fn test_part_number_and_identifier_recorded() {
        let options = AddShapeOptions {
            part_number: Some("PN-42".to_string()),
            identifier: Some(Uuid::new_v4()),
            role: MeshRole::Support,
            ..AddShapeOptions::default()
        };
        let mut mesher = Mesher::new();
        mesher
            .add_shape(&box_solid(1.0, 1.0, 1.0), &options)
            .unwrap();
        let properties = mesher.mesh_properties();
        assert_eq!(properties[0].part_number.as_deref(), Some("PN-42"));
        assert_eq!(properties[0].role, MeshRole::Support);
        assert_eq!(properties[0].uuid, options.identifier);
    }

    #[test]
    fn test_metadata_bookkeeping() {
        let mut mesher = Mesher::new();
        mesher.add_meta_data("forma", "source", "cube.rs", "xs:string", false);
        mesher.add_meta_data("", "Title", "demo", "xs:string", true);
        assert_eq!(mesher.get_meta_data().len(), 2);
        let record = mesher.get_meta_data_by_key("forma", "source").unwrap();
        assert_eq!(record.value, "cube.rs");
        assert!(mesher.get_meta_data_by_key("forma", "missing").is_none());
    }

    #[test]
    fn test_metadata_survives_3mf_round_trip() {
        let (_dir, path) = temp_path("meta.3mf");
        let mut out = Mesher::new();
        out.add_meta_data("forma", "source", "cube.rs", "xs:string", true);
        out.write(&path).unwrap();

        let mut back = Mesher::new();
        back.read(&path).unwrap();
        let record = back.get_meta_data_by_key("forma", "source").unwrap();
        assert_eq!(record.value, "cube.rs");
        assert!(record.must_preserve);
    }

    #[test]
    fn test_unsupported_extension() {
        let mesher = Mesher::new();
        assert!(matches!(
            mesher.write("model.obj"),
            Err(MesherError::UnsupportedExtension(_))
        ));
        let mut mesher = Mesher::new();
        assert!(matches!(
            mesher.read("model.step"),
            Err(MesherError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn test_missing_file_propagates_io_error() {
        let mut mesher = Mesher::new();
        assert!(matches!(
            mesher.read("does-not-exist.3mf"),
            Err(MesherError::Io(_))
        ));
    }
}
