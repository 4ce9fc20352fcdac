//! Typeface fonts.
//!
//! The font resource is a typeface JSON document: a map from characters to
//! glyphs, each glyph carrying its horizontal advance (`ha`) and an outline
//! string (`o`) of space-separated drawing commands in font units:
//!
//! - `m x y` starts a new contour
//! - `l x y` draws a straight line
//! - `q x y cx cy` draws a quadratic curve to `(x, y)` through control `(cx, cy)`
//! - `b x y c1x c1y c2x c2y` draws a cubic curve to `(x, y)`
//!
//! [`Font::layout`] turns a string into scaled outline commands ready for
//! extrusion.

use std::collections::HashMap;

use cgmath::Point2;
use serde::Deserialize;

use crate::resources::load_string;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("malformed typeface json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("font resolution must be positive, got {0}")]
    Resolution(f32),
    #[error("glyph key {0:?} is not a single character")]
    GlyphKey(String),
    #[error("glyph {glyph:?}: unknown outline command {command:?}")]
    UnknownCommand { glyph: char, command: String },
    #[error("glyph {glyph:?}: outline command {command:?} is missing coordinates")]
    MissingCoordinates { glyph: char, command: String },
    #[error("glyph {glyph:?}: {value:?} is not a number")]
    Coordinate { glyph: char, value: String },
}

#[derive(Deserialize)]
struct TypefaceJson {
    glyphs: HashMap<String, GlyphJson>,
    #[serde(rename = "familyName", default)]
    family_name: String,
    resolution: f32,
    #[serde(rename = "boundingBox")]
    bounding_box: BoundingBoxJson,
    #[serde(rename = "underlineThickness", default)]
    underline_thickness: f32,
}

#[derive(Deserialize)]
struct GlyphJson {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingBoxJson {
    y_min: f32,
    y_max: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Point2<f32>),
    LineTo(Point2<f32>),
    QuadTo {
        ctrl: Point2<f32>,
        to: Point2<f32>,
    },
    CubicTo {
        ctrl1: Point2<f32>,
        ctrl2: Point2<f32>,
        to: Point2<f32>,
    },
}

impl OutlineCommand {
    fn map(self, f: impl Fn(Point2<f32>) -> Point2<f32>) -> Self {
        match self {
            OutlineCommand::MoveTo(p) => OutlineCommand::MoveTo(f(p)),
            OutlineCommand::LineTo(p) => OutlineCommand::LineTo(f(p)),
            OutlineCommand::QuadTo { ctrl, to } => OutlineCommand::QuadTo {
                ctrl: f(ctrl),
                to: f(to),
            },
            OutlineCommand::CubicTo { ctrl1, ctrl2, to } => OutlineCommand::CubicTo {
                ctrl1: f(ctrl1),
                ctrl2: f(ctrl2),
                to: f(to),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    pub outline: Vec<OutlineCommand>,
}

#[derive(Clone, Debug)]
pub struct Font {
    family: String,
    resolution: f32,
    line_height: f32,
    glyphs: HashMap<char, Glyph>,
}

impl Font {
    pub fn from_json(json: &str) -> Result<Self, FontError> {
        let raw: TypefaceJson = serde_json::from_str(json)?;
        if raw.resolution <= 0.0 {
            return Err(FontError::Resolution(raw.resolution));
        }

        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, glyph) in raw.glyphs {
            let mut chars = key.chars();
            let ch = match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => return Err(FontError::GlyphKey(key)),
            };
            let outline = match &glyph.o {
                Some(o) => parse_outline(ch, o)?,
                None => Vec::new(),
            };
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    outline,
                },
            );
        }

        Ok(Self {
            family: raw.family_name,
            resolution: raw.resolution,
            line_height: raw.bounding_box.y_max - raw.bounding_box.y_min + raw.underline_thickness,
            glyphs,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Lays `text` out on a baseline at the origin, scaled so one em is `size`
    /// units tall. `\n` starts a new line below. Characters the font lacks
    /// are drawn as `?`, or skipped if that is missing too.
    pub fn layout(&self, text: &str, size: f32) -> Vec<OutlineCommand> {
        let scale = size / self.resolution;
        let line_height = self.line_height * scale;
        let mut commands = Vec::new();
        let mut offset_x = 0.0;
        let mut offset_y = 0.0;

        for ch in text.chars() {
            if ch == '\n' {
                offset_x = 0.0;
                offset_y -= line_height;
                continue;
            }
            let glyph = match self.glyph(ch).or_else(|| self.glyph('?')) {
                Some(glyph) => glyph,
                None => {
                    log::warn!("font '{}' has no glyph for {:?}", self.family, ch);
                    continue;
                }
            };
            commands.extend(glyph.outline.iter().map(|cmd| {
                cmd.map(|p| Point2::new(p.x * scale + offset_x, p.y * scale + offset_y))
            }));
            offset_x += glyph.advance * scale;
        }

        commands
    }
}

fn parse_outline(glyph: char, outline: &str) -> Result<Vec<OutlineCommand>, FontError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    while let Some(command) = tokens.next() {
        let arity = match command {
            "m" | "l" => 2,
            "q" => 4,
            "b" => 6,
            "z" => continue,
            other => {
                return Err(FontError::UnknownCommand {
                    glyph,
                    command: other.to_string(),
                });
            }
        };
        let mut values = [0.0f32; 6];
        for value in values.iter_mut().take(arity) {
            let token = tokens.next().ok_or_else(|| FontError::MissingCoordinates {
                glyph,
                command: command.to_string(),
            })?;
            *value = token.parse().map_err(|_| FontError::Coordinate {
                glyph,
                value: token.to_string(),
            })?;
        }
        let [x, y, a, b, c, d] = values;
        // Curves list the end point before their control points
        commands.push(match command {
            "m" => OutlineCommand::MoveTo(Point2::new(x, y)),
            "l" => OutlineCommand::LineTo(Point2::new(x, y)),
            "q" => OutlineCommand::QuadTo {
                ctrl: Point2::new(a, b),
                to: Point2::new(x, y),
            },
            _ => OutlineCommand::CubicTo {
                ctrl1: Point2::new(a, b),
                ctrl2: Point2::new(c, d),
                to: Point2::new(x, y),
            },
        });
    }

    Ok(commands)
}

/// Fetches and parses a typeface font from the asset root.
pub async fn load_font(file_name: &str) -> anyhow::Result<Font> {
    let json = load_string(file_name).await?;
    let font = Font::from_json(&json)?;
    log::info!(
        "font '{}' loaded from {} ({} glyphs)",
        font.family(),
        file_name,
        font.glyph_count()
    );
    Ok(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = r#"{
        "familyName": "Blocks",
        "resolution": 1000,
        "underlineThickness": 50,
        "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 800, "xMax": 700 },
        "glyphs": {
            "I": { "ha": 400, "x_min": 0, "x_max": 300, "o": "m 0 0 l 300 0 l 300 700 l 0 700 z" },
            "D": { "ha": 600, "o": "m 0 0 q 500 350 500 0 q 0 700 500 700 l 0 0" },
            " ": { "ha": 300 }
        }
    }"#;

    #[test]
    fn parses_commands_with_end_point_first() {
        let font = Font::from_json(FONT).unwrap();
        let d = font.glyph('D').unwrap();
        assert_eq!(
            d.outline[1],
            OutlineCommand::QuadTo {
                ctrl: Point2::new(500.0, 0.0),
                to: Point2::new(500.0, 350.0),
            }
        );
        assert_eq!(font.glyph(' ').unwrap().outline.len(), 0);
    }

    #[test]
    fn layout_scales_and_advances() {
        let font = Font::from_json(FONT).unwrap();
        let commands = font.layout("II", 0.5);
        assert_eq!(commands.len(), 8);
        assert_eq!(commands[4], OutlineCommand::MoveTo(Point2::new(0.2, 0.0)));
        assert_eq!(commands[6], OutlineCommand::LineTo(Point2::new(0.35, 0.35)));
    }

    #[test]
    fn newline_moves_down_by_line_height() {
        let font = Font::from_json(FONT).unwrap();
        let commands = font.layout("I\nI", 1.0);
        assert_eq!(commands[4], OutlineCommand::MoveTo(Point2::new(0.0, -1.05)));
    }

    #[test]
    fn missing_glyph_without_fallback_is_skipped() {
        let font = Font::from_json(FONT).unwrap();
        assert_eq!(font.layout("I%I", 1.0).len(), 8);
    }

    #[test]
    fn rejects_unknown_command() {
        let json = FONT.replace("l 300 0", "x 300 0");
        assert!(matches!(
            Font::from_json(&json),
            Err(FontError::UnknownCommand { glyph: 'I', .. })
        ));
    }

    #[test]
    fn rejects_truncated_command() {
        let json = FONT.replace("l 0 700 z", "l 0");
        assert!(matches!(
            Font::from_json(&json),
            Err(FontError::MissingCoordinates { glyph: 'I', .. })
        ));
    }
}
