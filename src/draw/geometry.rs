use serde::{Deserialize, Serialize};

/// A position in document coordinates. Scrolling does not change it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_corners(*first, *first);
        for point in rest {
            bounds.include(*point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    pub fn padded(self, pad: f64) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    (dx * dx + dy * dy).sqrt()
}

/// Distance from `point` to the closest point of segment `a`-`b`.
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq == 0.0 {
        return distance(point, a);
    }
    let t = (((point.x - a.x) * vx + (point.y - a.y) * vy) / len_sq).clamp(0.0, 1.0);
    distance(point, Point::new(a.x + vx * t, a.y + vy * t))
}

pub fn near_rectangle(point: Point, corner1: Point, corner2: Point, radius: f64) -> bool {
    let b = Bounds::from_corners(corner1, corner2);
    let top_left = Point::new(b.min_x, b.min_y);
    let top_right = Point::new(b.max_x, b.min_y);
    let bottom_right = Point::new(b.max_x, b.max_y);
    let bottom_left = Point::new(b.min_x, b.max_y);

    [
        (top_left, top_right),
        (top_right, bottom_right),
        (bottom_right, bottom_left),
        (bottom_left, top_left),
    ]
    .iter()
    .any(|&(a, b)| distance_to_segment(point, a, b) < radius)
}

/// Approximate "near the outline" test for the ellipse inscribed in the box
/// spanned by two corners.
///
/// This compares the normalized squared radial distance against 1 with a
/// tolerance of `radius / min(rx, ry)`. It is not a true distance to the
/// ellipse boundary: hits are looser along the major axis than along the
/// minor one. Callers rely on exactly this notion of a hit, so it must not
/// be replaced with an exact boundary distance.
pub fn near_ellipse(point: Point, corner1: Point, corner2: Point, radius: f64) -> bool {
    let cx = (corner1.x + corner2.x) / 2.0;
    let cy = (corner1.y + corner2.y) / 2.0;
    let rx = (corner2.x - corner1.x).abs() / 2.0;
    let ry = (corner2.y - corner1.y).abs() / 2.0;
    if rx == 0.0 || ry == 0.0 {
        return false;
    }

    let nx = (point.x - cx) / rx;
    let ny = (point.y - cy) / ry;
    (nx * nx + ny * ny - 1.0).abs() < radius / rx.min(ry)
}
