use crate::draw::geometry::{distance, distance_to_segment, Bounds, Point};
use crate::draw::model::{arrow_head_length, font_size, Annotation, Color, FreehandKind, ShapeKind};

/// Accent used for the selection outline on light pages.
pub const SELECTION_ACCENT: Color = Color::rgb(0x00, 0x66, 0xCC);
const SELECTION_ON_DARK: Color = Color::WHITE;
const SELECTION_LINE_WIDTH: f64 = 2.0;
const SELECTION_DASH: [f64; 2] = [5.0, 5.0];
const SELECTION_PADDING: f64 = 8.0;
const LUMINANCE_THRESHOLD: f64 = 128.0;
const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub opacity: f32,
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
            dash: None,
        }
    }
}

/// Drawing target for the render pipeline. Coordinates are document
/// coordinates; implementations map them onto their own pixel grid.
///
/// Strokes use round caps and joins.
pub trait Surface {
    fn clear(&mut self);
    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle);
    fn stroke_rect(&mut self, bounds: Bounds, style: &StrokeStyle);
    fn stroke_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64, style: &StrokeStyle);
    fn fill_text(&mut self, text: &str, anchor: Point, font_size: f64, color: Color);

    /// Matches the backing store to the document size at the given device
    /// pixel ratio. Returns `true` when the contents were discarded.
    fn resize(&mut self, _document_size: (u32, u32), _device_pixel_ratio: f64) -> bool {
        false
    }
}

pub fn render_annotation<S: Surface + ?Sized>(surface: &mut S, annotation: &Annotation) {
    match annotation {
        Annotation::Freehand {
            kind,
            color,
            size,
            points,
        } => render_freehand(surface, *kind, *color, *size, points),
        Annotation::Shape {
            kind,
            color,
            size,
            start,
            end,
        } => render_shape(surface, *kind, *color, *size, *start, *end),
        Annotation::Text {
            color,
            size,
            text,
            anchor,
        } => surface.fill_text(text, *anchor, font_size(*size), *color),
    }
}

fn freehand_style(kind: FreehandKind, color: Color, size: u32) -> StrokeStyle {
    StrokeStyle {
        opacity: kind.opacity(),
        ..StrokeStyle::solid(color, size as f64)
    }
}

fn render_freehand<S: Surface + ?Sized>(
    surface: &mut S,
    kind: FreehandKind,
    color: Color,
    size: u32,
    points: &[Point],
) {
    if points.len() < 2 {
        return;
    }
    surface.stroke_polyline(points, &freehand_style(kind, color, size));
}

pub fn render_shape<S: Surface + ?Sized>(
    surface: &mut S,
    kind: ShapeKind,
    color: Color,
    size: u32,
    start: Point,
    end: Point,
) {
    let style = StrokeStyle::solid(color, size as f64);
    match kind {
        ShapeKind::Line => surface.stroke_polyline(&[start, end], &style),
        ShapeKind::Rectangle => surface.stroke_rect(Bounds::from_corners(start, end), &style),
        ShapeKind::Circle => {
            let center = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
            let rx = (end.x - start.x).abs() / 2.0;
            let ry = (end.y - start.y).abs() / 2.0;
            surface.stroke_ellipse(center, rx, ry, &style);
        }
        ShapeKind::Arrow => {
            surface.stroke_polyline(&[start, end], &style);
            let [left, right] = arrow_head(start, end, arrow_head_length(size));
            surface.stroke_polyline(&[end, left], &style);
            surface.stroke_polyline(&[end, right], &style);
        }
    }
}

/// End points of the two head strokes, angled 30 degrees off the shaft.
pub fn arrow_head(start: Point, end: Point, head_length: f64) -> [Point; 2] {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let wing = |offset: f64| {
        Point::new(
            end.x - head_length * (angle + offset).cos(),
            end.y - head_length * (angle + offset).sin(),
        )
    };
    [wing(-ARROW_HEAD_ANGLE), wing(ARROW_HEAD_ANGLE)]
}

/// Appends one segment of an in-progress freehand stroke without a full redraw.
pub fn render_segment<S: Surface + ?Sized>(
    surface: &mut S,
    kind: FreehandKind,
    color: Color,
    size: u32,
    from: Point,
    to: Point,
) {
    surface.stroke_polyline(&[from, to], &freehand_style(kind, color, size));
}

pub fn render_selection<S: Surface + ?Sized>(
    surface: &mut S,
    annotation: &Annotation,
    highlight: Color,
) {
    let style = StrokeStyle {
        dash: Some(SELECTION_DASH),
        ..StrokeStyle::solid(highlight, SELECTION_LINE_WIDTH)
    };
    surface.stroke_rect(annotation.bounding_box().padded(SELECTION_PADDING), &style);
}

/// Everything one full redraw needs.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub committed: &'a [Annotation],
    pub preview: Option<&'a Annotation>,
    pub selected: Option<&'a Annotation>,
    pub highlight: Color,
}

/// Clears the surface and paints committed annotations in z-order, then the
/// live preview, then the selection outline.
pub fn render_frame<S: Surface + ?Sized>(surface: &mut S, frame: Frame<'_>) {
    surface.clear();
    for annotation in frame.committed {
        render_annotation(surface, annotation);
    }
    if let Some(preview) = frame.preview {
        render_annotation(surface, preview);
    }
    if let Some(selected) = frame.selected {
        render_selection(surface, selected, frame.highlight);
    }
}

/// White outline on dark pages, accent blue otherwise.
pub fn selection_color(page_background: Color) -> Color {
    if page_background.luminance() < LUMINANCE_THRESHOLD {
        SELECTION_ON_DARK
    } else {
        SELECTION_ACCENT
    }
}

/// Picks the effective page background from computed CSS colors of the body
/// and root element. Transparent or unreadable values fall through; a page
/// with neither is treated as white.
pub fn resolve_page_background(body: Option<&str>, root: Option<&str>) -> Color {
    [body, root]
        .into_iter()
        .flatten()
        .filter_map(parse_css_color)
        .find(|color| color.a != 0)
        .unwrap_or(Color::WHITE)
}

/// Parses `rgb(r, g, b)`, `rgba(r, g, b, a)`, `transparent` and hex colors.
pub fn parse_css_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Some(Color::rgba(0, 0, 0, 0));
    }
    if value.starts_with('#') {
        return value.parse().ok();
    }
    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let mut channel = || parts.next()?.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
    let (r, g, b) = (channel()?, channel()?, channel()?);
    let a = match parts.next() {
        Some(alpha) => (alpha.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Color::rgba(r, g, b, a))
}

/// Splits a closed outline into the "on" pieces of a dash pattern. The
/// pattern phase carries across corners.
pub fn dash_segments(outline: &[Point], pattern: [f64; 2]) -> Vec<(Point, Point)> {
    let mut segments = Vec::new();
    let period = pattern[0] + pattern[1];
    if outline.len() < 2 || period <= 0.0 {
        return segments;
    }
    let mut phase = 0.0_f64;
    for pair in outline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = distance(a, b);
        if length == 0.0 {
            continue;
        }
        let at = |t: f64| Point::new(a.x + (b.x - a.x) * t / length, a.y + (b.y - a.y) * t / length);
        let mut travelled = 0.0;
        while travelled < length {
            let in_period = phase % period;
            let (on, remaining) = if in_period < pattern[0] {
                (true, pattern[0] - in_period)
            } else {
                (false, period - in_period)
            };
            let step = remaining.min(length - travelled);
            if on {
                segments.push((at(travelled), at(travelled + step)));
            }
            travelled += step;
            phase += step;
        }
    }
    segments
}

fn rect_outline(bounds: Bounds) -> [Point; 5] {
    let top_left = Point::new(bounds.min_x, bounds.min_y);
    [
        top_left,
        Point::new(bounds.max_x, bounds.min_y),
        Point::new(bounds.max_x, bounds.max_y),
        Point::new(bounds.min_x, bounds.max_y),
        top_left,
    ]
}

fn ellipse_outline(center: Point, rx: f64, ry: f64, scale: f64) -> Vec<Point> {
    let circumference = std::f64::consts::TAU * rx.max(ry) * scale;
    let steps = circumference.max(12.0) as usize;
    (0..=steps)
        .map(|step| {
            let t = (step as f64 / steps as f64) * std::f64::consts::TAU;
            Point::new(center.x + rx * t.cos(), center.y + ry * t.sin())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// Software RGBA surface covering the whole document at device resolution.
/// Cleared pixels are fully transparent.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    scale: f64,
    allocation_count: usize,
}

impl FrameBuffer {
    pub fn new(document_size: (u32, u32), device_pixel_ratio: f64) -> Self {
        let mut buffer = Self::default();
        buffer.resize(document_size, device_pixel_ratio);
        buffer
    }

    pub fn device_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    pub fn rgba_pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Pixel under a document coordinate.
    pub fn pixel_at(&self, point: Point) -> Option<[u8; 4]> {
        let device = self.to_device(point);
        if device.x < 0.0 || device.y < 0.0 {
            return None;
        }
        self.pixel(device.x as u32, device.y as u32)
    }

    pub fn painted_pixel_count(&self) -> usize {
        self.rgba.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    fn to_device(&self, point: Point) -> Point {
        Point::new(point.x * self.scale, point.y * self.scale)
    }

    fn clip(&self, bounds: Bounds) -> Option<PixelRect> {
        let x0 = bounds.min_x.floor().max(0.0) as usize;
        let y0 = bounds.min_y.floor().max(0.0) as usize;
        let x1 = bounds.max_x.ceil().min(self.width as f64).max(0.0) as usize;
        let y1 = bounds.max_y.ceil().min(self.height as f64).max(0.0) as usize;
        (x1 > x0 && y1 > y0).then_some(PixelRect { x0, y0, x1, y1 })
    }

    fn blend(&mut self, x: usize, y: usize, color: Color) {
        let idx = (y * self.width as usize + x) * 4;
        let Some(dst) = self.rgba.get_mut(idx..idx + 4) else {
            return;
        };
        let sa = color.a as f32 / 255.0;
        if sa >= 1.0 {
            dst.copy_from_slice(&[color.r, color.g, color.b, color.a]);
            return;
        }
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }
        let mix = |s: u8, d: u8| {
            ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = (out_a * 255.0).round() as u8;
    }

    /// Rasterizes capsules into a coverage mask first so overlapping
    /// segments of one translucent stroke blend only once.
    fn stroke_segments(&mut self, segments: &[(Point, Point)], style: &StrokeStyle) {
        let Some(&(first, _)) = segments.first() else {
            return;
        };
        let radius = (style.width * self.scale / 2.0).max(0.5);
        let device: Vec<(Point, Point)> = segments
            .iter()
            .map(|&(a, b)| (self.to_device(a), self.to_device(b)))
            .collect();
        let mut bounds = Bounds::from_corners(self.to_device(first), self.to_device(first));
        for &(a, b) in &device {
            bounds.include(a);
            bounds.include(b);
        }
        let Some(area) = self.clip(bounds.padded(radius + 1.0)) else {
            return;
        };
        let area_width = area.x1 - area.x0;
        let mut mask = vec![false; area_width * (area.y1 - area.y0)];

        for &(a, b) in &device {
            let Some(seg) = self.clip(Bounds::from_corners(a, b).padded(radius + 1.0)) else {
                continue;
            };
            for y in seg.y0..seg.y1 {
                for x in seg.x0..seg.x1 {
                    let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    if distance_to_segment(center, a, b) <= radius {
                        mask[(y - area.y0) * area_width + (x - area.x0)] = true;
                    }
                }
            }
        }

        let color = style.color.with_opacity(style.opacity);
        for y in area.y0..area.y1 {
            for x in area.x0..area.x1 {
                if mask[(y - area.y0) * area_width + (x - area.x0)] {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, bounds: Bounds, color: Color) {
        let device = Bounds::from_corners(
            self.to_device(Point::new(bounds.min_x, bounds.min_y)),
            self.to_device(Point::new(bounds.max_x, bounds.max_y)),
        );
        let Some(area) = self.clip(device) else {
            return;
        };
        for y in area.y0..area.y1 {
            for x in area.x0..area.x1 {
                self.blend(x, y, color);
            }
        }
    }
}

fn polyline_segments(points: &[Point]) -> Vec<(Point, Point)> {
    match points {
        [] => Vec::new(),
        [only] => vec![(*only, *only)],
        _ => points.windows(2).map(|pair| (pair[0], pair[1])).collect(),
    }
}

impl Surface for FrameBuffer {
    fn clear(&mut self) {
        self.rgba.fill(0);
    }

    /// Reallocates only when the device size or scale changes.
    fn resize(&mut self, document_size: (u32, u32), device_pixel_ratio: f64) -> bool {
        let scale = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let width = (document_size.0 as f64 * scale).round() as u32;
        let height = (document_size.1 as f64 * scale).round() as u32;
        if width == self.width && height == self.height && scale == self.scale {
            return false;
        }
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        self.rgba = vec![0; len];
        self.width = width;
        self.height = height;
        self.scale = scale;
        self.allocation_count += 1;
        true
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        let segments = match style.dash {
            Some(pattern) => dash_segments(points, pattern),
            None => polyline_segments(points),
        };
        self.stroke_segments(&segments, style);
    }

    fn stroke_rect(&mut self, bounds: Bounds, style: &StrokeStyle) {
        self.stroke_polyline(&rect_outline(bounds), style);
    }

    fn stroke_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64, style: &StrokeStyle) {
        let outline = ellipse_outline(center, radius_x, radius_y, self.scale);
        self.stroke_polyline(&outline, style);
    }

    /// Glyphs are approximated by filled cells: there is no font rasterizer
    /// here, only a readable mark of where and how large the text is.
    fn fill_text(&mut self, text: &str, anchor: Point, font_size: f64, color: Color) {
        let advance = font_size * 0.625;
        let cap_height = font_size * 0.7;
        for (index, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x = anchor.x + index as f64 * advance;
            self.fill_rect(
                Bounds {
                    min_x: x + advance * 0.1,
                    min_y: anchor.y - cap_height,
                    max_x: x + advance * 0.9,
                    max_y: anchor.y,
                },
                color,
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Polyline {
        points: Vec<Point>,
        style: StrokeStyle,
    },
    Rect {
        bounds: Bounds,
        style: StrokeStyle,
    },
    Ellipse {
        center: Point,
        radius_x: f64,
        radius_y: f64,
        style: StrokeStyle,
    },
    Text {
        text: String,
        anchor: Point,
        font_size: f64,
        color: Color,
    },
    Resize {
        document_size: (u32, u32),
        device_pixel_ratio: f64,
    },
}

/// Surface that records calls instead of painting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    /// Operations issued since the last clear.
    pub fn since_clear(&self) -> &[DrawOp] {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear))
            .map_or(0, |idx| idx + 1);
        &self.ops[start..]
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn stroke_rect(&mut self, bounds: Bounds, style: &StrokeStyle) {
        self.ops.push(DrawOp::Rect {
            bounds,
            style: *style,
        });
    }

    fn stroke_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64, style: &StrokeStyle) {
        self.ops.push(DrawOp::Ellipse {
            center,
            radius_x,
            radius_y,
            style: *style,
        });
    }

    fn fill_text(&mut self, text: &str, anchor: Point, font_size: f64, color: Color) {
        self.ops.push(DrawOp::Text {
            text: text.to_owned(),
            anchor,
            font_size,
            color,
        });
    }

    fn resize(&mut self, document_size: (u32, u32), device_pixel_ratio: f64) -> bool {
        let op = DrawOp::Resize {
            document_size,
            device_pixel_ratio,
        };
        let last = self
            .ops
            .iter()
            .rev()
            .find(|op| matches!(op, DrawOp::Resize { .. }));
        let changed = last != Some(&op);
        if changed {
            self.ops.push(op);
        }
        changed
    }
}
