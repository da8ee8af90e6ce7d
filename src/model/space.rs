//! Coordinate space marker types.
//!
//! Annotations keep their geometry in image-absolute coordinates, while the
//! list-file grammar writes sub-annotations relative to their parent. These
//! zero-sized types keep the two apart at compile time.

use std::fmt;

/// Marker type for image-absolute coordinates.
///
/// (0, 0) is the top-left corner of the image; every stored annotation
/// rectangle lives in this space regardless of nesting depth.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Absolute {}

/// Marker type for parent-relative coordinates.
///
/// (0, 0) is the top-left corner of the enclosing annotation, or of the
/// image for a root annotation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relative {}

impl fmt::Debug for Absolute {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Relative {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
