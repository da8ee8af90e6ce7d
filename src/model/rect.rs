//! Axis-aligned rectangles in origin + size form.

use serde::Serialize;

use super::coord::Coord;
use super::{Absolute, Relative};

/// An axis-aligned rectangle stored as top-left corner plus width and height.
///
/// The `TSpace` parameter should be either [`Absolute`] or [`Relative`].
///
/// Note: this type does NOT enforce positive extents. Degenerate rectangles
/// must be representable so that the size filter can find and drop them
/// instead of the parser rejecting them.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect<TSpace> {
    pub origin: Coord<TSpace>,
    pub width: f64,
    pub height: f64,
}

impl<TSpace> Rect<TSpace> {
    /// Creates a rectangle from its top-left corner and extents.
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Coord::new(x, y),
            width,
            height,
        }
    }

    /// Creates the smallest rectangle spanning two arbitrary corners.
    pub fn from_corners(a: Coord<TSpace>, b: Coord<TSpace>) -> Self {
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        let x1 = a.x.max(b.x);
        let y1 = a.y.max(b.y);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.origin.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.origin.y
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.origin.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.origin.y + self.height
    }

    /// Bottom-right corner.
    #[inline]
    pub fn end(&self) -> Coord<TSpace> {
        Coord::new(self.max_x(), self.max_y())
    }

    /// Returns the area of the rectangle.
    ///
    /// May be negative if exactly one extent is negative.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The smaller of `w/h` and `h/w`, i.e. the aspect ratio regardless of
    /// orientation. Always in `[0, 1]` for positive extents.
    pub fn aspect_ratio(&self) -> f64 {
        let w_over_h = self.width / self.height;
        let h_over_w = self.height / self.width;
        w_over_h.min(h_over_w)
    }

    /// True when either extent is zero or negative.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Returns true if all values are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Half-open rectangle containment: the left and top edges are inside,
    /// the right and bottom edges are not.
    pub fn contains_point(&self, p: &Coord<TSpace>) -> bool {
        !self.is_empty()
            && p.x >= self.x()
            && p.y >= self.y()
            && p.x < self.max_x()
            && p.y < self.max_y()
    }

    /// Containment test for the ellipse inscribed in this rectangle.
    pub fn ellipse_contains_point(&self, p: &Coord<TSpace>) -> bool {
        if self.is_empty() {
            return false;
        }
        let nx = (p.x - self.x()) / self.width - 0.5;
        let ny = (p.y - self.y()) / self.height - 0.5;
        nx * nx + ny * ny < 0.25
    }

    /// True if `other` lies entirely within this rectangle (edges may touch).
    pub fn contains_rect(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && other.x() >= self.x()
            && other.y() >= self.y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Area shared by the two rectangles, zero when they are disjoint.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let w = self.max_x().min(other.max_x()) - self.x().max(other.x());
        let h = self.max_y().min(other.max_y()) - self.y().max(other.y());
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Intersection over union. Zero when the union is empty.
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Grows (positive `by`) or shrinks (negative `by`) every side.
    pub fn inflate(&self, by: f64) -> Self {
        Self::new(
            self.x() - by,
            self.y() - by,
            self.width + 2.0 * by,
            self.height + 2.0 * by,
        )
    }

    /// The four corners in the order: upper left, upper right, lower right,
    /// lower left.
    pub fn corners(&self) -> [Coord<TSpace>; 4] {
        [
            Coord::new(self.x(), self.y()),
            Coord::new(self.max_x(), self.y()),
            Coord::new(self.max_x(), self.max_y()),
            Coord::new(self.x(), self.max_y()),
        ]
    }
}

impl<TSpace> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("x", &self.origin.x)
            .field("y", &self.origin.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// Custom serde implementation to avoid a TSpace: Serialize bound
impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("x", &self.origin.x)?;
        state.serialize_field("y", &self.origin.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

/// Conversion between parent-relative and image-absolute rectangles.
impl Rect<Relative> {
    /// Places a parent-relative rectangle at `parent_origin`.
    pub fn to_absolute(&self, parent_origin: Coord<Absolute>) -> Rect<Absolute> {
        Rect::new(
            parent_origin.x + self.x(),
            parent_origin.y + self.y(),
            self.width,
            self.height,
        )
    }
}

impl Rect<Absolute> {
    /// Expresses this rectangle relative to `parent_origin`.
    pub fn relative_to(&self, parent_origin: Coord<Absolute>) -> Rect<Relative> {
        Rect::new(
            self.x() - parent_origin.x,
            self.y() - parent_origin.y,
            self.width,
            self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect<Absolute> {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn test_rect_dimensions() {
        let r = rect(10.0, 20.0, 90.0, 60.0);
        assert_eq!(r.max_x(), 100.0);
        assert_eq!(r.max_y(), 80.0);
        assert_eq!(r.area(), 5400.0);
        assert!((r.aspect_ratio() - 60.0 / 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_corners_normalizes() {
        let r: Rect<Absolute> =
            Rect::from_corners(Coord::new(50.0, 10.0), Coord::new(20.0, 40.0));
        assert_eq!(r, rect(20.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn test_point_containment_is_half_open() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(&Coord::new(0.0, 0.0)));
        assert!(r.contains_point(&Coord::new(9.9, 9.9)));
        assert!(!r.contains_point(&Coord::new(10.0, 5.0)));
    }

    #[test]
    fn test_ellipse_excludes_corners() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert!(r.ellipse_contains_point(&Coord::new(5.0, 5.0)));
        assert!(!r.ellipse_contains_point(&Coord::new(0.5, 0.5)));
        assert!(r.contains_point(&Coord::new(0.5, 0.5)));
    }

    #[test]
    fn test_intersection_of_disjoint_is_zero() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_of_offset_squares() {
        let a = rect(0.0, 0.0, 100.0, 100.0);
        let b = rect(10.0, 10.0, 100.0, 100.0);
        assert_eq!(a.intersection_area(&b), 8100.0);
        assert!((a.iou(&b) - 8100.0 / 11900.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_roundtrip() {
        let parent: Coord<Absolute> = Coord::new(30.0, 40.0);
        let child = rect(35.0, 50.0, 5.0, 5.0);
        let rel = child.relative_to(parent);
        assert_eq!(rel.x(), 5.0);
        assert_eq!(rel.y(), 10.0);
        assert_eq!(rel.to_absolute(parent), child);
    }

    #[test]
    fn test_contains_rect_allows_touching_edges() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_rect(&rect(0.0, 0.0, 10.0, 10.0)));
        assert!(!outer.contains_rect(&rect(5.0, 5.0, 6.0, 2.0)));
    }
}
