//! Per-node data stored in an [`AnnotationTree`](super::AnnotationTree).

use serde::Serialize;
use std::sync::Arc;

use super::attribute::{Attribute, AttributeKind, Schemas};
use super::category::Category;
use super::coord::Coord;
use super::feature::Feature;
use super::ids::AnnotationId;
use super::rect::Rect;
use super::Absolute;

/// Smallest area, in square pixels, a committed annotation may cover.
pub const MIN_AREA: f64 = 64.0;
/// Smallest width, in pixels, of a committed annotation.
pub const MIN_WIDTH: f64 = 20.0;
/// Smallest `min(w/h, h/w)` of a committed annotation.
pub const MIN_ASPECT_RATIO: f64 = 0.2;

/// Head pose angles. All zero means "not recorded".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn is_zero(&self) -> bool {
        self.roll == 0.0 && self.pitch == 0.0 && self.yaw == 0.0
    }
}

/// One labelled region.
///
/// Position and size are always image-absolute, even for nested
/// annotations; the parent-relative form only exists on the wire.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub(crate) feature: Feature,
    pub(crate) rect: Rect<Absolute>,
    pub(crate) attributes: [Attribute; 6],
    pub(crate) category: Category,
    pub(crate) breed: Category,
    pub(crate) orientation: Orientation,
    pub(crate) selected: bool,
    pub(crate) active: bool,
    pub(crate) children: Vec<AnnotationId>,
    pub(crate) parent: Option<AnnotationId>,
}

impl Annotation {
    /// A fresh, unattached annotation with every attribute unmarked.
    pub(crate) fn new(feature: Feature, rect: Rect<Absolute>, schemas: &Arc<Schemas>) -> Self {
        Self {
            feature,
            rect,
            attributes: AttributeKind::ALL.map(|k| Attribute::new(Arc::clone(schemas.get(k)))),
            category: Category::untagged(),
            breed: Category::breed_unknown(),
            orientation: Orientation::default(),
            selected: false,
            active: false,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    /// Image-absolute bounds.
    pub fn rect(&self) -> &Rect<Absolute> {
        &self.rect
    }

    pub fn x(&self) -> f64 {
        self.rect.x()
    }

    pub fn y(&self) -> f64 {
        self.rect.y()
    }

    pub fn width(&self) -> f64 {
        self.rect.width
    }

    pub fn height(&self) -> f64 {
        self.rect.height
    }

    pub fn start(&self) -> Coord<Absolute> {
        self.rect.origin
    }

    pub fn end(&self) -> Coord<Absolute> {
        self.rect.end()
    }

    pub fn attribute(&self, kind: AttributeKind) -> &Attribute {
        &self.attributes[kind.index()]
    }

    pub fn attributes(&self) -> impl Iterator<Item = (AttributeKind, &Attribute)> {
        AttributeKind::ALL.into_iter().zip(self.attributes.iter())
    }

    pub fn skin(&self) -> &Attribute {
        self.attribute(AttributeKind::Skin)
    }

    pub fn gender(&self) -> &Attribute {
        self.attribute(AttributeKind::Gender)
    }

    pub fn age(&self) -> &Attribute {
        self.attribute(AttributeKind::Age)
    }

    pub fn wound(&self) -> &Attribute {
        self.attribute(AttributeKind::Wound)
    }

    pub fn occlusions(&self) -> &Attribute {
        self.attribute(AttributeKind::Occlusion)
    }

    pub fn kind(&self) -> &Attribute {
        self.attribute(AttributeKind::Kind)
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn breed(&self) -> &Category {
        &self.breed
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the resize handles should be shown. Only changed through
    /// [`AnnotationTree::mark_active`](super::AnnotationTree::mark_active).
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn children(&self) -> &[AnnotationId] {
        &self.children
    }

    pub fn parent(&self) -> Option<AnnotationId> {
        self.parent
    }

    pub fn area(&self) -> f64 {
        self.rect.area()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.rect.aspect_ratio()
    }

    /// Corners in the order upper left, upper right, lower right, lower left.
    pub fn corners(&self) -> [Coord<Absolute>; 4] {
        self.rect.corners()
    }

    /// True if this annotation violates the minimum size rules.
    pub fn is_too_small(&self) -> bool {
        let r = &self.rect;
        !(r.height > 0.0
            && r.width >= MIN_WIDTH
            && r.area() >= MIN_AREA
            && r.aspect_ratio() >= MIN_ASPECT_RATIO)
    }

    /// Point containment using the feature's shape.
    pub fn contains_point(&self, p: &Coord<Absolute>) -> bool {
        shape_contains(self.feature, &self.rect, p)
    }

    /// True if `p` lies within `buffer` pixels of the outline, on either side.
    pub fn within_buffer_range(&self, p: &Coord<Absolute>, buffer: f64) -> bool {
        let inner = self.rect.inflate(-buffer);
        let outer = self.rect.inflate(buffer);
        !shape_contains(self.feature, &inner, p) && shape_contains(self.feature, &outer, p)
    }

    /// Squared distance from `p` to the closest bounding-box corner.
    pub fn nearest_corner_distance_squared(&self, p: &Coord<Absolute>) -> f64 {
        let left = self.rect.x() - p.x;
        let right = left + self.rect.width;
        let top = self.rect.y() - p.y;
        let bottom = top + self.rect.height;
        let (l2, r2, t2, b2) = (left * left, right * right, top * top, bottom * bottom);
        (l2 + t2).min(l2 + b2).min(r2 + t2).min(r2 + b2)
    }

    /// True when nothing beyond the geometry needs to be written, so the
    /// short `c[x,y;w,h]` form can be used.
    pub fn is_plain(&self) -> bool {
        self.children.is_empty()
            && self.attributes.iter().all(Attribute::is_unmarked)
            && self.category.is_untagged()
            && self.breed.is_breed_unknown()
            && self.orientation.is_zero()
    }

    /// Field-wise equality ignoring tree links and UI flags.
    pub(crate) fn same_content(&self, other: &Self) -> bool {
        self.feature == other.feature
            && self.rect == other.rect
            && self.attributes == other.attributes
            && self.category == other.category
            && self.breed == other.breed
            && self.orientation == other.orientation
    }
}

fn shape_contains(feature: Feature, rect: &Rect<Absolute>, p: &Coord<Absolute>) -> bool {
    if feature.is_rectangle() {
        rect.contains_point(p)
    } else {
        rect.ellipse_contains_point(p)
    }
}
