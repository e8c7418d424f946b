//! Base-material groups and color conversion.
//!
//! A shape's color travels through the container as a named material
//! whose display color is the shape's RGBA value; the mesh object
//! references the material through an object-level property.

use forma_kernel_brep::Color;

/// One named material with a display color.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterial {
    /// Material name.
    pub name: String,
    /// Display color.
    pub display_color: Color,
}

/// A base-material group resource.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterialGroup {
    /// Container resource id.
    pub id: u32,
    /// Materials in the group, referenced by index.
    pub materials: Vec<BaseMaterial>,
}

impl BaseMaterialGroup {
    /// Empty group with the given resource id.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            materials: Vec::new(),
        }
    }

    /// Add a material, returning its index within the group.
    pub fn add_material(&mut self, name: impl Into<String>, display_color: Color) -> u32 {
        self.materials.push(BaseMaterial {
            name: name.into(),
            display_color,
        });
        (self.materials.len() - 1) as u32
    }
}

/// Format a color as a 3MF `#RRGGBBAA` display color string.
pub fn color_to_hex(color: &Color) -> String {
    let channel = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02X}{:02X}{:02X}{:02X}",
        channel(color.red),
        channel(color.green),
        channel(color.blue),
        channel(color.alpha)
    )
}

/// Parse a 3MF `#RRGGBB` or `#RRGGBBAA` display color string.
pub fn color_from_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |i: usize| -> Option<f32> {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    let red = channel(0)?;
    let green = channel(2)?;
    let blue = channel(4)?;
    let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some(Color::new(red, green, blue, alpha))
}
