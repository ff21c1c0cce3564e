//! Color values and CSS-style color string parsing

use thiserror::Error;

/// Error parsing a CSS-style color string.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ColorParseError {
    #[error("unrecognized color syntax: {0:?}")]
    Syntax(String),
    #[error("invalid color component: {0:?}")]
    Component(String),
}

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
        Color::new(r, g, b, 1.0)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Normalized `rgba(r, g, b, a)` form with byte channels.
    pub fn to_css(self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            self.a
        )
    }

    /// Parse a CSS-style color string.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and a handful of named colors. Channel values
    /// are bytes, alpha is a float in `0..=1`.
    pub fn parse(css: &str) -> Result<Color, ColorParseError> {
        let s = css.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex, css);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_channels(args, lower.starts_with("rgba("));
        }
        match lower.as_str() {
            "transparent" => Ok(Color::TRANSPARENT),
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "red" => Ok(Color::RED),
            "green" => Ok(Color::new(0.0, 128.0 / 255.0, 0.0, 1.0)),
            "lime" => Ok(Color::GREEN),
            "blue" => Ok(Color::BLUE),
            "yellow" => Ok(Color::rgb(1.0, 1.0, 0.0)),
            "cyan" | "aqua" => Ok(Color::rgb(0.0, 1.0, 1.0)),
            "magenta" | "fuchsia" => Ok(Color::rgb(1.0, 0.0, 1.0)),
            "gray" | "grey" => Ok(Color::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0)),
            "orange" => Ok(Color::rgb(1.0, 165.0 / 255.0, 0.0)),
            _ => Err(ColorParseError::Syntax(css.to_string())),
        }
    }

    fn parse_hex(hex: &str, original: &str) -> Result<Color, ColorParseError> {
        // Byte-offset slicing below; non-ASCII input would split a char.
        if !hex.is_ascii() {
            return Err(ColorParseError::Syntax(original.to_string()));
        }
        let byte = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| ColorParseError::Component(original.to_string()))
        };
        match hex.len() {
            3 => {
                let mut c = [0.0f32; 3];
                for (i, v) in c.iter_mut().enumerate() {
                    let d = byte(&hex[i..i + 1])?;
                    *v = (d * 16 + d) as f32 / 255.0;
                }
                Ok(Color::rgb(c[0], c[1], c[2]))
            }
            6 | 8 => {
                let mut c = [255u8; 4];
                for (i, v) in c.iter_mut().take(hex.len() / 2).enumerate() {
                    *v = byte(&hex[i * 2..i * 2 + 2])?;
                }
                Ok(Color::new(
                    c[0] as f32 / 255.0,
                    c[1] as f32 / 255.0,
                    c[2] as f32 / 255.0,
                    c[3] as f32 / 255.0,
                ))
            }
            _ => Err(ColorParseError::Syntax(original.to_string())),
        }
    }

    fn parse_channels(args: &str, has_alpha: bool) -> Result<Color, ColorParseError> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(ColorParseError::Syntax(args.to_string()));
        }
        let channel = |s: &str| -> Result<f32, ColorParseError> {
            let v: f32 = s
                .parse()
                .map_err(|_| ColorParseError::Component(s.to_string()))?;
            Ok((v / 255.0).clamp(0.0, 1.0))
        };
        let a = if has_alpha {
            parts[3]
                .parse::<f32>()
                .map_err(|_| ColorParseError::Component(parts[3].to_string()))?
                .clamp(0.0, 1.0)
        } else {
            1.0
        };
        Ok(Color::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            a,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgba() {
        let c = Color::parse("rgba(255, 0, 0, 1)").unwrap();
        assert_eq!(c, Color::RED);
    }

    #[test]
    fn test_parse_rgb_and_half_alpha() {
        assert_eq!(Color::parse("rgb(0, 0, 255)").unwrap(), Color::BLUE);
        let c = Color::parse("rgba(0, 255, 0, 0.5)").unwrap();
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("#f00").unwrap(), Color::RED);
        assert_eq!(Color::parse("#0000ff").unwrap(), Color::BLUE);
        let c = Color::parse("#00ff0080").unwrap();
        assert_eq!((c.r, c.g, c.b), (0.0, 1.0, 0.0));
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(Color::parse("white").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("Transparent").unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Color::parse("not-a-color").is_err());
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("rgb(1, 2)").is_err());
        assert!(Color::parse("rgba(a, b, c, d)").is_err());
    }

    #[test]
    fn test_parse_rejects_multibyte_hex() {
        // Multibyte chars can make the byte length look like a valid hex
        // form; parsing must reject them, not panic on a slice.
        assert!(Color::parse("#€€").is_err());
        assert!(Color::parse("#é4").is_err());
        assert!(Color::parse("#ααα").is_err());
    }

    #[test]
    fn test_to_css_round_trips() {
        let c = Color::parse("rgba(255, 0, 0, 1)").unwrap();
        assert_eq!(c.to_css(), "rgba(255, 0, 0, 1)");
        assert_eq!(Color::parse(&c.to_css()).unwrap(), c);
    }
}
