use crate::draw::geometry::{Bounds, Point};
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Font size in pixels is the stroke size times this factor.
pub const TEXT_FONT_SCALE: f64 = 4.0;
/// Estimated glyph advance (per unit of stroke size) used for text bounds.
pub const TEXT_ADVANCE_SCALE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Highlighter,
    Eraser,
    Line,
    Rectangle,
    Circle,
    Arrow,
    Text,
    Select,
}

impl Tool {
    pub fn is_shape(self) -> bool {
        self.shape_kind().is_some()
    }

    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Circle => Some(ShapeKind::Circle),
            Tool::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }

    pub fn freehand_kind(self) -> Option<FreehandKind> {
        match self {
            Tool::Pen => Some(FreehandKind::Pen),
            Tool::Highlighter => Some(FreehandKind::Highlighter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Highlighter => "highlighter",
            Tool::Eraser => "eraser",
            Tool::Line => "line",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Arrow => "arrow",
            Tool::Text => "text",
            Tool::Select => "select",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_shape_tool(tool: Tool) -> bool {
    tool.is_shape()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreehandKind {
    Pen,
    Highlighter,
}

impl FreehandKind {
    pub fn opacity(self) -> f32 {
        match self {
            FreehandKind::Pen => 1.0,
            FreehandKind::Highlighter => 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Circle,
    Arrow,
}

/// Straight RGBA color. Serialized as a `#RRGGBB` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Perceived brightness in `0.0..=255.0`.
    pub fn luminance(self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color {s:?} is missing a leading '#'"))?;
        if !hex.is_ascii() {
            bail!("color {s:?} contains non-hex characters");
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| anyhow!("invalid hex color {s:?}"))
        };
        let short = |idx: usize| channel(idx..idx + 1).map(|v| v * 17);
        match hex.len() {
            3 => Ok(Color::rgb(short(0)?, short(1)?, short(2)?)),
            6 => Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => bail!("invalid hex color {s:?}"),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Freehand {
        kind: FreehandKind,
        color: Color,
        size: u32,
        points: Vec<Point>,
    },
    Shape {
        kind: ShapeKind,
        color: Color,
        size: u32,
        start: Point,
        end: Point,
    },
    Text {
        color: Color,
        size: u32,
        text: String,
        anchor: Point,
    },
}

impl Annotation {
    /// Builds a text annotation from raw input. Returns `None` when the
    /// trimmed input is empty.
    pub fn text(color: Color, size: u32, input: &str, anchor: Point) -> Option<Self> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        Some(Annotation::Text {
            color,
            size,
            text: text.to_owned(),
            anchor,
        })
    }

    pub fn color(&self) -> Color {
        match self {
            Annotation::Freehand { color, .. }
            | Annotation::Shape { color, .. }
            | Annotation::Text { color, .. } => *color,
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            Annotation::Freehand { size, .. }
            | Annotation::Shape { size, .. }
            | Annotation::Text { size, .. } => *size,
        }
    }

    pub fn set_color(&mut self, new_color: Color) {
        match self {
            Annotation::Freehand { color, .. }
            | Annotation::Shape { color, .. }
            | Annotation::Text { color, .. } => *color = new_color,
        }
    }

    pub fn set_size(&mut self, new_size: u32) {
        match self {
            Annotation::Freehand { size, .. }
            | Annotation::Shape { size, .. }
            | Annotation::Text { size, .. } => *size = new_size,
        }
    }

    /// Moves the annotation in place so selection indices stay valid.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Annotation::Freehand { points, .. } => {
                for point in points.iter_mut() {
                    *point = point.offset(dx, dy);
                }
            }
            Annotation::Shape { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            Annotation::Text { anchor, .. } => {
                *anchor = anchor.offset(dx, dy);
            }
        }
    }

    /// Text bounds are estimated from the character count; the engine has no
    /// access to real font metrics.
    pub fn bounding_box(&self) -> Bounds {
        match self {
            Annotation::Freehand { points, .. } => Bounds::from_points(points)
                .unwrap_or_else(|| Bounds::from_corners(Point::default(), Point::default())),
            Annotation::Shape { start, end, .. } => Bounds::from_corners(*start, *end),
            Annotation::Text {
                size, text, anchor, ..
            } => {
                let size = *size as f64;
                let width = text.chars().count() as f64 * size * TEXT_ADVANCE_SCALE;
                Bounds {
                    min_x: anchor.x,
                    min_y: anchor.y - size * TEXT_FONT_SCALE,
                    max_x: anchor.x + width,
                    max_y: anchor.y,
                }
            }
        }
    }
}

pub fn font_size(stroke_size: u32) -> f64 {
    stroke_size as f64 * TEXT_FONT_SCALE
}

pub fn arrow_head_length(stroke_size: u32) -> f64 {
    15.0 + stroke_size as f64
}
