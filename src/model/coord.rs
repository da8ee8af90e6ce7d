//! Typed points and displacement vectors.

use std::marker::PhantomData;

/// A 2D point with a type-level marker for the coordinate space.
///
/// The `TSpace` parameter should be either [`Absolute`](super::Absolute) or
/// [`Relative`](super::Relative), so that parent-relative offsets read from
/// a list file cannot be mixed up with stored image positions.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Squared Euclidean distance to another point in the same space.
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A displacement in pixels, used by translation.
///
/// Deltas are space-agnostic: moving by (dx, dy) is the same in absolute and
/// parent-relative terms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Delta {
    pub dx: f64,
    pub dy: f64,
}

impl Delta {
    #[inline]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// True when the displacement is zero on both axes.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Absolute;

    #[test]
    fn test_coord_creation() {
        let coord: Coord<Absolute> = Coord::new(10.0, 20.0);
        assert_eq!(coord.x, 10.0);
        assert_eq!(coord.y, 20.0);
    }

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Absolute> = Coord::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Coord<Absolute> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());
    }

    #[test]
    fn test_distance_squared() {
        let a: Coord<Absolute> = Coord::new(1.0, 1.0);
        let b: Coord<Absolute> = Coord::new(4.0, 5.0);
        assert_eq!(a.distance_squared(&b), 25.0);
    }
}
