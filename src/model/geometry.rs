//! Hit testing and the shape-preserving edits: extend/clip, rotation,
//! translation and corner dragging.

use super::annotation::Annotation;
use super::coord::{Coord, Delta};
use super::events::ChangeKind;
use super::ids::AnnotationId;
use super::rect::Rect;
use super::tree::AnnotationTree;
use super::Absolute;
use crate::error::FacelabelError;

/// Pixels added beyond an overflowing child when a parent is extended.
pub const EXTEND_MARGIN: f64 = 6.0;

impl AnnotationTree {
    /// Point containment using the annotation's shape.
    pub fn contains(&self, id: AnnotationId, p: &Coord<Absolute>) -> Result<bool, FacelabelError> {
        Ok(self.annotation(id)?.contains_point(p))
    }

    /// Detaches the deepest annotation under `id` (possibly `id` itself)
    /// that contains `p`. Descendants are only searched while their
    /// ancestors contain the point.
    pub fn remove_at(
        &mut self,
        id: AnnotationId,
        p: &Coord<Absolute>,
    ) -> Result<Option<AnnotationId>, FacelabelError> {
        let Some(hit) = self.deepest_containing(id, p)? else {
            return Ok(None);
        };
        self.detach_node(hit)?;
        self.flush_events();
        Ok(Some(hit))
    }

    fn deepest_containing(
        &self,
        id: AnnotationId,
        p: &Coord<Absolute>,
    ) -> Result<Option<AnnotationId>, FacelabelError> {
        let node = self.annotation(id)?;
        if !node.contains_point(p) {
            return Ok(None);
        }
        for child in &node.children {
            if let Some(hit) = self.deepest_containing(*child, p)? {
                return Ok(Some(hit));
            }
        }
        Ok(Some(id))
    }

    /// The first annotation containing `p`, searching each root's
    /// descendants before the root itself.
    pub fn annotation_at_point(&self, p: &Coord<Absolute>) -> Option<AnnotationId> {
        self.first_at_point(&self.roots, p)
    }

    fn first_at_point(&self, ids: &[AnnotationId], p: &Coord<Absolute>) -> Option<AnnotationId> {
        for id in ids {
            let Some(node) = self.get(*id) else {
                continue;
            };
            if let Some(hit) = self.first_at_point(&node.children, p) {
                return Some(hit);
            }
            if node.contains_point(p) {
                return Some(*id);
            }
        }
        None
    }

    /// Every annotation containing `p`, descendants listed before their
    /// ancestors.
    pub fn annotations_at_point(&self, p: &Coord<Absolute>) -> Vec<AnnotationId> {
        let mut out = Vec::new();
        self.collect_at_point(&self.roots, p, &mut out);
        out
    }

    fn collect_at_point(&self, ids: &[AnnotationId], p: &Coord<Absolute>, out: &mut Vec<AnnotationId>) {
        for id in ids {
            let Some(node) = self.get(*id) else {
                continue;
            };
            self.collect_at_point(&node.children, p, out);
            if node.contains_point(p) {
                out.push(*id);
            }
        }
    }

    /// Detaches the smallest-area annotation at `p`. On ties the one listed
    /// first by [`annotations_at_point`](Self::annotations_at_point) wins.
    pub fn remove_smallest_at_point(
        &mut self,
        p: &Coord<Absolute>,
    ) -> Result<Option<AnnotationId>, FacelabelError> {
        let mut smallest: Option<(AnnotationId, f64)> = None;
        for id in self.annotations_at_point(p) {
            let area = self.annotation(id)?.area();
            if smallest.map_or(true, |(_, min)| area < min) {
                smallest = Some((id, area));
            }
        }
        let Some((id, _)) = smallest else {
            return Ok(None);
        };
        self.detach_node(id)?;
        self.flush_events();
        Ok(Some(id))
    }

    /// True if `p` lies within `buffer` pixels of the outline of `id`.
    pub fn within_buffer_range(
        &self,
        id: AnnotationId,
        p: &Coord<Absolute>,
        buffer: f64,
    ) -> Result<bool, FacelabelError> {
        Ok(self.annotation(id)?.within_buffer_range(p, buffer))
    }

    /// The first annotation whose outline band contains `p`. Roots and their
    /// direct children are scanned, each root's children before the root.
    pub fn near_annotation(&self, p: &Coord<Absolute>, buffer: f64) -> Option<AnnotationId> {
        self.edge_scan_order()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|a| a.within_buffer_range(p, buffer)))
    }

    /// Sets the resize-handle flag on `found` and clears it on every other
    /// annotation [`near_annotation`](Self::near_annotation) scans. Does not
    /// emit change events.
    pub fn mark_active(&mut self, found: Option<AnnotationId>) {
        for id in self.edge_scan_order() {
            if let Some(Some(node)) = self.nodes.get_mut(id.0) {
                node.active = false;
            }
        }
        if let Some(Some(node)) = found.and_then(|id| self.nodes.get_mut(id.0)) {
            node.active = true;
        }
    }

    fn edge_scan_order(&self) -> Vec<AnnotationId> {
        let mut order = Vec::new();
        for root in &self.roots {
            if let Some(node) = self.get(*root) {
                order.extend(node.children.iter().copied());
                order.push(*root);
            }
        }
        order
    }

    /// Squared distance from `p` to the nearest corner of `id`.
    pub fn nearest_corner_distance_squared(
        &self,
        id: AnnotationId,
        p: &Coord<Absolute>,
    ) -> Result<f64, FacelabelError> {
        Ok(self.annotation(id)?.nearest_corner_distance_squared(p))
    }

    /// Serialized form of the deepest annotation containing `p`, following
    /// the same containment chain as [`remove_at`](Self::remove_at).
    pub fn tooltip(&self, p: &Coord<Absolute>) -> Option<String> {
        self.roots.iter().find_map(|root| {
            self.deepest_containing(*root, p)
                .ok()
                .flatten()
                .and_then(|hit| self.to_grammar(hit).ok())
        })
    }

    /// Grows every parent in the subtree so it encloses its children, then
    /// clamps `id` into `frame` and each child into its parent. Children
    /// that no longer fit inside their parent after clamping are detached
    /// and returned.
    pub fn extend_and_clip(
        &mut self,
        id: AnnotationId,
        frame: &Rect<Absolute>,
    ) -> Result<Vec<AnnotationId>, FacelabelError> {
        for child in self.annotation(id)?.children.clone() {
            self.extend_parent(child)?;
        }
        let mut dropped = Vec::new();
        self.clip(id, frame, &mut dropped)?;
        if !dropped.is_empty() {
            log::warn!(
                "clipping {} dropped {} annotation(s) outside their parent",
                id,
                dropped.len()
            );
        }
        self.events.emit(id, ChangeKind::ExtendClip);
        self.flush_events();
        Ok(dropped)
    }

    fn extend_parent(&mut self, child: AnnotationId) -> Result<(), FacelabelError> {
        let node = self.annotation(child)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        for grandchild in node.children.clone() {
            self.extend_parent(grandchild)?;
        }
        let inner = *self.annotation(child)?.rect();
        let rect = &mut self.node_mut(parent)?.rect;
        if rect.x() > inner.x() {
            let grow = rect.x() - inner.x() + EXTEND_MARGIN;
            rect.origin.x -= grow;
            rect.width += grow;
        }
        if rect.y() > inner.y() {
            let grow = rect.y() - inner.y() + EXTEND_MARGIN;
            rect.origin.y -= grow;
            rect.height += grow;
        }
        if rect.max_x() < inner.max_x() {
            rect.width += inner.max_x() - rect.max_x() + EXTEND_MARGIN;
        }
        if rect.max_y() < inner.max_y() {
            rect.height += inner.max_y() - rect.max_y() + EXTEND_MARGIN;
        }
        Ok(())
    }

    fn clip(
        &mut self,
        id: AnnotationId,
        frame: &Rect<Absolute>,
        dropped: &mut Vec<AnnotationId>,
    ) -> Result<(), FacelabelError> {
        let node = self.node_mut(id)?;
        node.rect = clamp_into(&node.rect, frame);
        let bounds = node.rect;
        for child in node.children.clone() {
            let fits = bounds.contains_rect(self.annotation(child)?.rect());
            if fits {
                self.clip(child, &bounds, dropped)?;
            } else {
                self.detach_node(child)?;
                dropped.push(child);
            }
        }
        Ok(())
    }

    /// Rotates the subtree a quarter turn clockwise inside a parent region
    /// `parent_width` pixels wide.
    pub fn rotate_90(&mut self, id: AnnotationId, parent_width: f64) -> Result<(), FacelabelError> {
        for node in self.descendants(id) {
            let rect = &mut self.node_mut(node)?.rect;
            let (x, y) = (rect.x(), rect.y());
            std::mem::swap(&mut rect.width, &mut rect.height);
            rect.origin = Coord::new(parent_width - y - rect.width, x);
            self.events.emit(node, ChangeKind::Rotate);
        }
        self.flush_events();
        Ok(())
    }

    /// Moves the subtree by `delta`, keeping `id` inside `frame`. Each child
    /// moves by the displacement its parent actually achieved and is kept
    /// inside the parent's new bounds. Returns the displacement of `id`.
    pub fn translate(
        &mut self,
        id: AnnotationId,
        delta: Delta,
        frame: &Rect<Absolute>,
    ) -> Result<Delta, FacelabelError> {
        let moved = self.translate_node(id, delta, frame)?;
        self.flush_events();
        Ok(moved)
    }

    fn translate_node(
        &mut self,
        id: AnnotationId,
        delta: Delta,
        frame: &Rect<Absolute>,
    ) -> Result<Delta, FacelabelError> {
        let node = self.node_mut(id)?;
        let before = node.rect.origin;
        let rect = &mut node.rect;
        rect.origin.x += delta.dx;
        rect.origin.y += delta.dy;
        if rect.x() < frame.x() {
            rect.origin.x = frame.x();
        }
        if rect.y() < frame.y() {
            rect.origin.y = frame.y();
        }
        if rect.max_x() > frame.max_x() {
            rect.origin.x = frame.max_x() - rect.width;
        }
        if rect.max_y() > frame.max_y() {
            rect.origin.y = frame.max_y() - rect.height;
        }
        let bounds = *rect;
        let moved = Delta::new(bounds.x() - before.x, bounds.y() - before.y);
        for child in node.children.clone() {
            self.translate_node(child, moved, &bounds)?;
        }
        self.events.emit(id, ChangeKind::Translate);
        Ok(moved)
    }

    /// Replaces the bounds of `id` with the rectangle spanned by `p1` and
    /// `p2`, clamped into `frame`. Children are left where they are.
    pub fn set_rect(
        &mut self,
        id: AnnotationId,
        p1: Coord<Absolute>,
        p2: Coord<Absolute>,
        frame: &Rect<Absolute>,
    ) -> Result<(), FacelabelError> {
        let spanned = Rect::from_corners(p1, p2);
        let start = Coord::new(spanned.x().max(frame.x()), spanned.y().max(frame.y()));
        let end = Coord::new(
            spanned.max_x().min(frame.max_x()),
            spanned.max_y().min(frame.max_y()),
        );
        self.set_start_node(id, start)?;
        self.set_end_node(id, end)?;
        self.flush_events();
        Ok(())
    }
}

/// Clamps both corners of `rect` into `frame`, keeping the start corner no
/// further right or down than the end corner.
fn clamp_into(rect: &Rect<Absolute>, frame: &Rect<Absolute>) -> Rect<Absolute> {
    let x0 = rect.x().clamp(frame.x(), frame.max_x().max(frame.x()));
    let y0 = rect.y().clamp(frame.y(), frame.max_y().max(frame.y()));
    let x1 = rect.max_x().clamp(x0, frame.max_x().max(x0));
    let y1 = rect.max_y().clamp(y0, frame.max_y().max(y0));
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

impl Annotation {
    /// True if this annotation's bounds lie inside `frame`.
    pub fn fits_in(&self, frame: &Rect<Absolute>) -> bool {
        frame.contains_rect(&self.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feature, Relative};

    fn rel(x: f64, y: f64, w: f64, h: f64) -> Rect<Relative> {
        Rect::new(x, y, w, h)
    }

    fn abs(x: f64, y: f64, w: f64, h: f64) -> Rect<Absolute> {
        Rect::new(x, y, w, h)
    }

    fn pt(x: f64, y: f64) -> Coord<Absolute> {
        Coord::new(x, y)
    }

    fn face_with_nose() -> (AnnotationTree, AnnotationId, AnnotationId) {
        let mut tree = AnnotationTree::new();
        let face = tree.insert(Feature::Face, rel(0.0, 0.0, 100.0, 100.0), None).unwrap();
        let nose = tree.insert(Feature::Nose, rel(40.0, 40.0, 20.0, 20.0), Some(face)).unwrap();
        (tree, face, nose)
    }

    #[test]
    fn hit_testing_prefers_the_deepest() {
        let (tree, face, nose) = face_with_nose();
        assert_eq!(tree.annotation_at_point(&pt(50.0, 50.0)), Some(nose));
        assert_eq!(tree.annotation_at_point(&pt(20.0, 50.0)), Some(face));
        assert_eq!(tree.annotation_at_point(&pt(2.0, 2.0)), None);
        assert_eq!(tree.annotations_at_point(&pt(50.0, 50.0)), vec![nose, face]);
        assert_eq!(
            tree.tooltip(&pt(50.0, 50.0)).as_deref(),
            Some("n[40,40;20,20]")
        );
    }

    #[test]
    fn remove_at_detaches_the_deepest_hit() {
        let (mut tree, face, nose) = face_with_nose();
        assert_eq!(tree.remove_at(face, &pt(200.0, 200.0)).unwrap(), None);
        assert_eq!(tree.remove_at(face, &pt(50.0, 50.0)).unwrap(), Some(nose));
        assert!(tree.get(face).unwrap().children().is_empty());
        assert_eq!(tree.remove_at(face, &pt(50.0, 50.0)).unwrap(), Some(face));
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_smallest_picks_least_area() {
        let (mut tree, face, nose) = face_with_nose();
        assert_eq!(tree.remove_smallest_at_point(&pt(50.0, 50.0)).unwrap(), Some(nose));
        assert_eq!(tree.remove_smallest_at_point(&pt(50.0, 50.0)).unwrap(), Some(face));
        assert_eq!(tree.remove_smallest_at_point(&pt(50.0, 50.0)).unwrap(), None);
    }

    #[test]
    fn near_annotation_is_pure_and_mark_active_is_separate() {
        let (mut tree, face, nose) = face_with_nose();
        let found = tree.near_annotation(&pt(41.0, 50.0), 3.0);
        assert_eq!(found, Some(nose));
        assert!(!tree.get(nose).unwrap().is_active());
        tree.mark_active(found);
        assert!(tree.get(nose).unwrap().is_active());
        tree.mark_active(tree.near_annotation(&pt(50.0, 1.0), 3.0));
        assert!(!tree.get(nose).unwrap().is_active());
        assert!(tree.get(face).unwrap().is_active());
    }

    #[test]
    fn extend_grows_parent_around_child() {
        let mut tree = AnnotationTree::new();
        let animal = tree.insert(Feature::Animal, rel(50.0, 50.0, 100.0, 100.0), None).unwrap();
        let leg = tree.insert(Feature::Leg, rel(-10.0, 80.0, 30.0, 40.0), Some(animal)).unwrap();
        let dropped = tree.extend_and_clip(animal, &abs(0.0, 0.0, 500.0, 500.0)).unwrap();
        assert!(dropped.is_empty());
        let parent = *tree.get(animal).unwrap().rect();
        assert_eq!(parent, abs(34.0, 50.0, 116.0, 126.0));
        assert!(parent.contains_rect(tree.get(leg).unwrap().rect()));
    }

    #[test]
    fn clip_clamps_into_frame_and_drops_outsiders() {
        let mut tree = AnnotationTree::new();
        let animal = tree.insert(Feature::Animal, rel(-20.0, 10.0, 100.0, 60.0), None).unwrap();
        let head = tree.insert(Feature::Head, rel(0.0, 0.0, 30.0, 30.0), Some(animal)).unwrap();
        let tail = tree.insert(Feature::Tail, rel(60.0, 10.0, 30.0, 30.0), Some(animal)).unwrap();
        let dropped = tree.extend_and_clip(animal, &abs(0.0, 0.0, 70.0, 200.0)).unwrap();
        let bounds = *tree.get(animal).unwrap().rect();
        assert_eq!(bounds, abs(0.0, 10.0, 70.0, 60.0));
        assert_eq!(dropped, vec![head]);
        assert!(!tree.is_attached(head));
        assert!(bounds.contains_rect(tree.get(tail).unwrap().rect()));
    }

    #[test]
    fn rotation_swaps_extents() {
        let (mut tree, face, nose) = face_with_nose();
        tree.rotate_90(face, 300.0).unwrap();
        assert_eq!(*tree.get(face).unwrap().rect(), abs(200.0, 0.0, 100.0, 100.0));
        assert_eq!(*tree.get(nose).unwrap().rect(), abs(240.0, 40.0, 20.0, 20.0));
    }

    #[test]
    fn translate_feeds_actual_displacement_to_children() {
        let (mut tree, face, nose) = face_with_nose();
        let frame = abs(0.0, 0.0, 120.0, 500.0);
        let moved = tree.translate(face, Delta::new(50.0, 30.0), &frame).unwrap();
        assert_eq!(moved, Delta::new(20.0, 30.0));
        assert_eq!(*tree.get(face).unwrap().rect(), abs(20.0, 30.0, 100.0, 100.0));
        assert_eq!(*tree.get(nose).unwrap().rect(), abs(60.0, 70.0, 20.0, 20.0));
    }

    #[test]
    fn set_rect_normalizes_and_clamps() {
        let (mut tree, face, _) = face_with_nose();
        tree.set_rect(face, pt(150.0, 80.0), pt(-10.0, 10.0), &abs(0.0, 0.0, 120.0, 120.0))
            .unwrap();
        assert_eq!(*tree.get(face).unwrap().rect(), abs(0.0, 10.0, 120.0, 70.0));
    }
}
