//! Color Utilities
//!
//! Stroke and particle colors are stored as 8-bit sRGB ([`Rgba8`]), which is
//! what the page's `<input type="color">` produces and what a 2D canvas
//! context consumes. The desktop renderer accumulates layers in a linear
//! float texture, so colors are converted to linear right before upload.

use crate::error::{OverlayError, Result};

/// An 8-bit sRGB color with straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rgb` (the formats color inputs emit)
    pub fn parse_hex(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| OverlayError::InvalidStyle(format!("color '{trimmed}' must start with '#'")))?;
        if !hex.is_ascii() {
            return Err(OverlayError::InvalidStyle(format!("color '{trimmed}' is not hexadecimal")));
        }

        let channel = |s: &str| {
            u8::from_str_radix(s, 16)
                .map_err(|_| OverlayError::InvalidStyle(format!("color '{trimmed}' is not hexadecimal")))
        };

        match hex.len() {
            6 => Ok(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                // #abc expands to #aabbcc
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Ok(Self::rgb(expand(&hex[0..1])?, expand(&hex[1..2])?, expand(&hex[2..3])?))
            }
            _ => Err(OverlayError::InvalidStyle(format!(
                "color '{trimmed}' must have 3 or 6 hex digits"
            ))),
        }
    }

    /// CSS `rgba()` string for 2D canvas fill/stroke styles
    pub fn to_css(self, alpha: f32) -> String {
        let a = (self.a as f32 / 255.0) * alpha.clamp(0.0, 1.0);
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, a)
    }

    /// Linear RGBA (0.0-1.0) for GPU shading
    pub fn to_linear(self) -> [f32; 4] {
        srgb_u8_to_linear_f32(self.r, self.g, self.b, self.a as f32 / 255.0)
    }
}

/// Convert a single sRGB color component to linear space
///
/// sRGB uses a gamma curve with a linear segment near black.
/// Formula from: https://en.wikipedia.org/wiki/SRGB#From_sRGB_to_CIE_XYZ
#[inline]
pub fn srgb_to_linear(srgb: f32) -> f32 {
    if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert RGB color from 0-255 sRGB to linear 0.0-1.0
///
/// # Arguments
/// * `r, g, b` - Color components in 0-255 sRGB space
/// * `a` - Alpha in 0.0-1.0 (already linear)
#[inline]
pub fn srgb_u8_to_linear_f32(r: u8, g: u8, b: u8, a: f32) -> [f32; 4] {
    [
        srgb_to_linear(r as f32 / 255.0),
        srgb_to_linear(g as f32 / 255.0),
        srgb_to_linear(b as f32 / 255.0),
        a,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_to_linear() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 0.001);

        // Middle gray (sRGB 0.5 ≈ linear 0.214)
        let linear = srgb_to_linear(0.5);
        assert!((linear - 0.214).abs() < 0.01);
    }

    #[test]
    fn test_parse_long_hex() {
        let color = Rgba8::parse_hex("#ff8000").unwrap();
        assert_eq!(color, Rgba8::rgb(255, 128, 0));
    }

    #[test]
    fn test_parse_short_hex() {
        let color = Rgba8::parse_hex(" #0af ").unwrap();
        assert_eq!(color, Rgba8::rgb(0, 170, 255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgba8::parse_hex("ff0000").is_err());
        assert!(Rgba8::parse_hex("#ff00").is_err());
        assert!(Rgba8::parse_hex("#gg0000").is_err());
    }

    #[test]
    fn test_css_string_scales_alpha() {
        assert_eq!(Rgba8::rgb(10, 20, 30).to_css(0.5), "rgba(10, 20, 30, 0.500)");
    }

    #[test]
    fn test_paper_color_to_linear() {
        // #F4F3EF (244, 243, 239), the desktop page color
        let linear = Rgba8::rgb(244, 243, 239).to_linear();
        assert!(linear[0] > 0.9 && linear[0] <= 1.0);
        assert!(linear[1] > 0.9 && linear[1] <= 1.0);
        assert!(linear[2] > 0.9 && linear[2] <= 1.0);
        assert_eq!(linear[3], 1.0);
    }
}
