use crate::draw::geometry::Point;

/// Window metrics the overlay follows. The drawing surface spans the whole
/// document and is shifted by the scroll offset, so annotations keep their
/// document position while the page scrolls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub inner_width: u32,
    pub inner_height: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            inner_width: 0,
            inner_height: 0,
            content_width: 0,
            content_height: 0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(inner_width: u32, inner_height: u32) -> Self {
        Self {
            inner_width,
            inner_height,
            ..Self::default()
        }
    }

    /// Converts a pointer position relative to the visible window into
    /// document coordinates.
    pub fn to_document(&self, client: Point) -> Point {
        client.offset(self.scroll_x, self.scroll_y)
    }

    /// Size of the drawing surface in CSS pixels: the larger of the scrollable
    /// content and the window itself.
    pub fn document_size(&self) -> (u32, u32) {
        (
            self.content_width.max(self.inner_width),
            self.content_height.max(self.inner_height),
        )
    }

    /// Offset applied to the surface so it tracks the page scroll.
    pub fn surface_offset(&self) -> (f64, f64) {
        (-self.scroll_x, -self.scroll_y)
    }
}
