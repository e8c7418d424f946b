//! 3MF container read/write.
//!
//! A 3MF file is a zip package holding `[Content_Types].xml`,
//! `_rels/.rels`, and the model document `3D/3dmodel.model`. The model
//! document carries the unit, metadata records, base-material groups,
//! one object per mesh, and the build items instantiating them.

use std::io::{Cursor, Read, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{MesherError, Result};
use crate::material::{color_from_hex, color_to_hex, BaseMaterialGroup};
use crate::model::{Mesh, MeshObject, MeshRole, MetaData, ObjectProperty, Unit};

use forma_kernel_math::Point3;
use uuid::Uuid;

const NAMESPACE_CORE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
const NAMESPACE_PRODUCTION: &str =
    "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Everything a 3MF model document describes.
#[derive(Debug, Default)]
pub(crate) struct ParsedModel {
    pub unit: Option<Unit>,
    pub metadata: Vec<MetaData>,
    pub material_groups: Vec<BaseMaterialGroup>,
    pub objects: Vec<ParsedObject>,
}

/// One mesh object as read from a model document, before the container
/// assigns it a fresh resource id.
#[derive(Debug)]
pub(crate) struct ParsedObject {
    pub mesh: Mesh,
    pub role: MeshRole,
    pub name: Option<String>,
    pub part_number: Option<String>,
    pub uuid: Option<Uuid>,
    pub property: Option<ObjectProperty>,
}

/// Generate a full 3MF package as bytes.
pub(crate) fn write_3mf(
    unit: Unit,
    metadata: &[MetaData],
    groups: &[BaseMaterialGroup],
    objects: &[MeshObject],
) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let mut archive = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(6));

    for (path, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        ("3D/3dmodel.model", model_xml(unit, metadata, groups, objects)),
    ] {
        archive
            .start_file(path, options)
            .map_err(|e| MesherError::container(e.to_string()))?;
        archive.write_all(content.as_bytes())?;
    }

    archive
        .finish()
        .map_err(|e| MesherError::container(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Generate the model document.
fn model_xml(
    unit: Unit,
    metadata: &[MetaData],
    groups: &[BaseMaterialGroup],
    objects: &[MeshObject],
) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<model unit=\"{}\" xml:lang=\"en-US\" xmlns=\"{NAMESPACE_CORE}\" xmlns:p=\"{NAMESPACE_PRODUCTION}\">\n",
        unit.as_3mf_str()
    ));

    for record in metadata {
        let key = if record.namespace.is_empty() {
            record.name.clone()
        } else {
            format!("{}:{}", record.namespace, record.name)
        };
        xml.push_str(&format!(
            "    <metadata name=\"{}\" preserve=\"{}\" type=\"{}\">{}</metadata>\n",
            escape(&key),
            u8::from(record.must_preserve),
            escape(&record.metadata_type),
            escape(&record.value)
        ));
    }

    xml.push_str("    <resources>\n");
    for group in groups {
        xml.push_str(&format!("        <basematerials id=\"{}\">\n", group.id));
        for material in &group.materials {
            xml.push_str(&format!(
                "            <base name=\"{}\" displaycolor=\"{}\"/>\n",
                escape(&material.name),
                color_to_hex(&material.display_color)
            ));
        }
        xml.push_str("        </basematerials>\n");
    }

    for object in objects {
        xml.push_str(&format!(
            "        <object id=\"{}\" type=\"{}\"",
            object.id,
            object.role.as_3mf_str()
        ));
        if let Some(name) = &object.name {
            xml.push_str(&format!(" name=\"{}\"", escape(name)));
        }
        if let Some(part_number) = &object.part_number {
            xml.push_str(&format!(" partnumber=\"{}\"", escape(part_number)));
        }
        if let Some(property) = &object.property {
            xml.push_str(&format!(
                " pid=\"{}\" pindex=\"{}\"",
                property.group_id, property.index
            ));
        }
        if let Some(uuid) = &object.uuid {
            xml.push_str(&format!(" p:UUID=\"{uuid}\""));
        }
        xml.push_str(">\n            <mesh>\n                <vertices>\n");
        for v in &object.mesh.vertices {
            xml.push_str(&format!(
                "                    <vertex x=\"{:.6}\" y=\"{:.6}\" z=\"{:.6}\"/>\n",
                v.x, v.y, v.z
            ));
        }
        xml.push_str("                </vertices>\n                <triangles>\n");
        for t in &object.mesh.triangles {
            xml.push_str(&format!(
                "                    <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
                t[0], t[1], t[2]
            ));
        }
        xml.push_str("                </triangles>\n            </mesh>\n        </object>\n");
    }
    xml.push_str("    </resources>\n    <build>\n");
    for object in objects {
        xml.push_str(&format!(
            "        <item objectid=\"{}\" transform=\"1 0 0 0 1 0 0 0 1 0 0 0\"/>\n",
            object.id
        ));
    }
    xml.push_str("    </build>\n</model>");
    xml
}

/// Decode a 3MF package.
pub(crate) fn read_3mf(bytes: &[u8]) -> Result<ParsedModel> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| MesherError::container(format!("invalid zip archive: {e}")))?;
    let content = read_model_document(&mut archive)?;
    parse_model_document(&content)
}

/// Pull the model document out of the package.
fn read_model_document(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String> {
    for path in ["3D/3dmodel.model", "3d/3dmodel.model"] {
        if let Ok(mut file) = archive.by_name(path) {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            return Ok(content);
        }
    }
    // Fall back to the first entry with a .model extension.
    let names: Vec<String> = archive.file_names().map(String::from).collect();
    for name in names {
        if name.to_lowercase().ends_with(".model") {
            let mut file = archive
                .by_name(&name)
                .map_err(|e| MesherError::container(e.to_string()))?;
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            return Ok(content);
        }
    }
    Err(MesherError::container("no model document in archive"))
}

fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| MesherError::container(format!("bad attribute: {e}")))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| MesherError::container(format!("bad attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_f64(element: &BytesStart<'_>, name: &[u8]) -> Result<f64> {
    attr_value(element, name)?
        .ok_or_else(|| {
            MesherError::container(format!("missing {} attribute", String::from_utf8_lossy(name)))
        })?
        .parse()
        .map_err(|e| MesherError::container(format!("bad coordinate: {e}")))
}

fn parse_u32(element: &BytesStart<'_>, name: &[u8]) -> Result<u32> {
    attr_value(element, name)?
        .ok_or_else(|| {
            MesherError::container(format!("missing {} attribute", String::from_utf8_lossy(name)))
        })?
        .parse()
        .map_err(|e| MesherError::container(format!("bad index: {e}")))
}

/// Parse the model document into container pieces.
fn parse_model_document(content: &str) -> Result<ParsedModel> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut model = ParsedModel::default();
    let mut current_object: Option<ParsedObject> = None;
    let mut current_group: Option<BaseMaterialGroup> = None;
    let mut pending_metadata: Option<MetaData> = None;

    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| MesherError::container(format!("XML parse error: {e}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"model" => {
                        if let Some(unit) = attr_value(e, b"unit")? {
                            model.unit = Some(Unit::from_3mf_str(&unit).ok_or_else(|| {
                                MesherError::container(format!("unknown model unit {unit:?}"))
                            })?);
                        }
                    }
                    b"metadata" => {
                        let key = attr_value(e, b"name")?.unwrap_or_default();
                        // Namespaces may be URIs, so split on the last colon.
                        let (namespace, name) = match key.rsplit_once(':') {
                            Some((ns, n)) => (ns.to_string(), n.to_string()),
                            None => (String::new(), key),
                        };
                        let record = MetaData {
                            namespace,
                            name,
                            value: String::new(),
                            metadata_type: attr_value(e, b"type")?
                                .unwrap_or_else(|| "xs:string".to_string()),
                            must_preserve: attr_value(e, b"preserve")?
                                .map(|p| p == "1" || p == "true")
                                .unwrap_or(false),
                        };
                        if empty {
                            model.metadata.push(record);
                        } else {
                            pending_metadata = Some(record);
                        }
                    }
                    b"basematerials" => {
                        let id = parse_u32(e, b"id")?;
                        current_group = Some(BaseMaterialGroup::new(id));
                    }
                    b"base" => {
                        if let Some(group) = current_group.as_mut() {
                            let name = attr_value(e, b"name")?.unwrap_or_default();
                            let color = attr_value(e, b"displaycolor")?
                                .and_then(|hex| color_from_hex(&hex))
                                .ok_or_else(|| {
                                    MesherError::container("base material without display color")
                                })?;
                            group.add_material(name, color);
                        }
                    }
                    b"object" => {
                        let role = match attr_value(e, b"type")? {
                            Some(t) => MeshRole::from_3mf_str(&t).ok_or_else(|| {
                                MesherError::container(format!("unknown object type {t:?}"))
                            })?,
                            None => MeshRole::Model,
                        };
                        let property = match (attr_value(e, b"pid")?, attr_value(e, b"pindex")?) {
                            (Some(pid), pindex) => {
                                let group_id = pid.parse().map_err(|e| {
                                    MesherError::container(format!("bad pid: {e}"))
                                })?;
                                let index = match pindex {
                                    Some(pindex) => pindex.parse().map_err(|e| {
                                        MesherError::container(format!("bad pindex: {e}"))
                                    })?,
                                    None => 0,
                                };
                                Some(ObjectProperty { group_id, index })
                            }
                            (None, _) => None,
                        };
                        current_object = Some(ParsedObject {
                            mesh: Mesh::new(),
                            role,
                            name: attr_value(e, b"name")?,
                            part_number: attr_value(e, b"partnumber")?,
                            uuid: attr_value(e, b"UUID")?
                                .and_then(|u| Uuid::parse_str(&u).ok()),
                            property,
                        });
                    }
                    b"vertex" => {
                        if let Some(object) = current_object.as_mut() {
                            object.mesh.vertices.push(Point3::new(
                                parse_f64(e, b"x")?,
                                parse_f64(e, b"y")?,
                                parse_f64(e, b"z")?,
                            ));
                        }
                    }
                    b"triangle" => {
                        if let Some(object) = current_object.as_mut() {
                            object.mesh.triangles.push([
                                parse_u32(e, b"v1")?,
                                parse_u32(e, b"v2")?,
                                parse_u32(e, b"v3")?,
                            ]);
                        }
                    }
                    _ => {}
                }
                // Empty-element objects and groups close immediately.
                if empty {
                    match e.local_name().as_ref() {
                        b"object" => {
                            if let Some(object) = current_object.take() {
                                model.objects.push(object);
                            }
                        }
                        b"basematerials" => {
                            if let Some(group) = current_group.take() {
                                model.material_groups.push(group);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if let Some(record) = pending_metadata.as_mut() {
                    record.value = t
                        .unescape()
                        .map_err(|e| MesherError::container(format!("bad text: {e}")))?
                        .into_owned();
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"metadata" => {
                    if let Some(record) = pending_metadata.take() {
                        model.metadata.push(record);
                    }
                }
                b"object" => {
                    if let Some(object) = current_object.take() {
                        model.objects.push(object);
                    }
                }
                b"basematerials" => {
                    if let Some(group) = current_group.take() {
                        model.material_groups.push(group);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(model)
}
