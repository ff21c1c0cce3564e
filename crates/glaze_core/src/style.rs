//! Drawing style state
//!
//! Fill/stroke colors keep both the parsed value and the normalized source
//! string so style getters can echo what was set. The cosmetic attribute
//! block mirrors the 2D canvas surface: those values are stored verbatim
//! and have no rendering effect in this pipeline.

use crate::color::Color;

/// A style slot: parsed color plus the normalized string it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorStyle {
    pub color: Color,
    pub css: String,
}

impl ColorStyle {
    pub fn new(color: Color) -> Self {
        Self {
            css: color.to_css(),
            color,
        }
    }

    pub fn set(&mut self, color: Color) {
        self.color = color;
        self.css = color.to_css();
    }
}

/// Stored-but-inert style attributes accepted for API compatibility.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CosmeticStyle {
    pub line_cap: Option<String>,
    pub line_join: Option<String>,
    pub miter_limit: Option<f32>,
    pub shadow_offset_x: Option<f32>,
    pub shadow_offset_y: Option<f32>,
    pub shadow_blur: Option<f32>,
    pub shadow_color: Option<String>,
    pub font: Option<String>,
    pub text_align: Option<String>,
    pub text_baseline: Option<String>,
    pub global_alpha: Option<f32>,
    pub global_composite_operation: Option<String>,
}

/// The mutable style state of one rendering context.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    pub fill: ColorStyle,
    pub stroke: ColorStyle,
    pub line_width: f32,
    pub cosmetic: CosmeticStyle,
}

impl DrawState {
    pub fn new() -> Self {
        Self {
            fill: ColorStyle::new(Color::BLACK),
            stroke: ColorStyle::new(Color::BLACK),
            line_width: 1.0,
            cosmetic: CosmeticStyle::default(),
        }
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_canvas() {
        let state = DrawState::new();
        assert_eq!(state.fill.color, Color::BLACK);
        assert_eq!(state.stroke.color, Color::BLACK);
        assert_eq!(state.line_width, 1.0);
    }

    #[test]
    fn test_set_normalizes_css() {
        let mut state = DrawState::new();
        state.fill.set(Color::parse("#f00").unwrap());
        assert_eq!(state.fill.css, "rgba(255, 0, 0, 1)");
    }
}
