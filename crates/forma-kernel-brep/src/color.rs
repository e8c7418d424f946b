//! RGBA color attached to shapes.

use serde::{Deserialize, Serialize};

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red component.
    pub red: f32,
    /// Green component.
    pub green: f32,
    /// Blue component.
    pub blue: f32,
    /// Alpha (opacity) component.
    pub alpha: f32,
}

impl Color {
    /// Create a color from RGBA components, clamped to `[0, 1]`.
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Opaque color from RGB components.
    pub fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self::new(red, green, blue, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let c = Color::new(1.5, -0.5, 0.25, 2.0);
        assert_eq!(c.red, 1.0);
        assert_eq!(c.green, 0.0);
        assert_eq!(c.blue, 0.25);
        assert_eq!(c.alpha, 1.0);
    }

    #[test]
    fn test_rgb_is_opaque() {
        assert_eq!(Color::rgb(0.1, 0.2, 0.3).alpha, 1.0);
    }
}
