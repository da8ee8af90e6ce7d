//! Newtype handles for arena slots and listener subscriptions.
//!
//! Using newtypes prevents passing a subscription handle where an annotation
//! handle is expected, and keeps arena indices opaque to callers.

use serde::Serialize;
use std::fmt;

/// Handle of an annotation inside an [`AnnotationTree`](super::AnnotationTree).
///
/// Handles are never reused within one tree: once an annotation is removed
/// its handle stays dead.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AnnotationId(pub(crate) usize);

impl AnnotationId {
    /// Returns the underlying arena index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by [`AnnotationTree::subscribe`](super::AnnotationTree::subscribe).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}
