//! Arena that owns every annotation of one image.
//!
//! Annotations reference their parent and children by [`AnnotationId`].
//! A node can be attached (reachable from the root list) or detached: a
//! detached node is still stored and addressable, which is how removal,
//! cloning and re-parenting hand subtrees back to the caller. Slots are
//! only freed by [`AnnotationTree::delete`], and ids are never reused.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::annotation::{Annotation, Orientation};
use super::attribute::{AttributeKind, Schemas};
use super::category::Category;
use super::coord::Coord;
use super::events::{ChangeKind, Dispatcher};
use super::feature::Feature;
use super::ids::AnnotationId;
use super::rect::Rect;
use super::{Absolute, Relative};
use crate::error::FacelabelError;

pub struct AnnotationTree {
    pub(super) nodes: Vec<Option<Annotation>>,
    pub(super) roots: Vec<AnnotationId>,
    pub(super) schemas: Arc<Schemas>,
    pub(super) events: Dispatcher,
}

impl Default for AnnotationTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies every annotation. Listeners are not copied.
impl Clone for AnnotationTree {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            roots: self.roots.clone(),
            schemas: Arc::clone(&self.schemas),
            events: Dispatcher::default(),
        }
    }
}

impl fmt::Debug for AnnotationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationTree")
            .field("roots", &self.roots)
            .field("nodes", &self.nodes.iter().flatten().count())
            .field("listeners", &self.events.listener_count())
            .finish()
    }
}

/// Structural equality of the attached annotations: same shape of tree and
/// same content at each position. Ids, listeners and UI flags are ignored.
impl PartialEq for AnnotationTree {
    fn eq(&self, other: &Self) -> bool {
        self.roots.len() == other.roots.len()
            && self
                .roots
                .iter()
                .zip(&other.roots)
                .all(|(a, b)| self.subtree_eq(*a, other, *b))
    }
}

pub(crate) fn check_nesting(parent: Feature, child: Feature) -> Result<(), FacelabelError> {
    if parent.may_contain(child) {
        Ok(())
    } else {
        Err(FacelabelError::InvalidNesting { parent, child })
    }
}

impl AnnotationTree {
    /// An empty tree using the built-in attribute schemas.
    pub fn new() -> Self {
        Self::with_schemas(Schemas::builtin())
    }

    pub fn with_schemas(schemas: Arc<Schemas>) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            schemas,
            events: Dispatcher::default(),
        }
    }

    pub fn schemas(&self) -> &Arc<Schemas> {
        &self.schemas
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Like [`get`](Self::get) but with an error for unknown ids.
    pub fn annotation(&self, id: AnnotationId) -> Result<&Annotation, FacelabelError> {
        self.get(id).ok_or(FacelabelError::UnknownAnnotation(id))
    }

    pub(super) fn node_mut(&mut self, id: AnnotationId) -> Result<&mut Annotation, FacelabelError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FacelabelError::UnknownAnnotation(id))
    }

    /// Top-level annotations, in order.
    pub fn roots(&self) -> &[AnnotationId] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of attached annotations, nested ones included.
    pub fn total_annotations(&self) -> usize {
        self.roots.iter().map(|r| self.descendants(*r).len()).sum()
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn descendants(&self, id: AnnotationId) -> Vec<AnnotationId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Every attached annotation, depth first from the roots.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> + '_ {
        self.roots
            .iter()
            .flat_map(|r| self.descendants(*r))
            .filter_map(|id| self.get(id).map(|a| (id, a)))
    }

    /// True if `id` is reachable from the root list.
    pub fn is_attached(&self, id: AnnotationId) -> bool {
        let mut current = id;
        loop {
            match self.get(current) {
                None => return false,
                Some(node) => match node.parent {
                    Some(parent) => current = parent,
                    None => return self.roots.contains(&current),
                },
            }
        }
    }

    /// Adds an annotation. With a parent, `rect`'s origin is relative to
    /// the parent's origin and the new node is appended to its children;
    /// otherwise it is appended to the root list.
    pub fn insert(
        &mut self,
        feature: Feature,
        rect: Rect<Relative>,
        parent: Option<AnnotationId>,
    ) -> Result<AnnotationId, FacelabelError> {
        let id = self.insert_node(feature, rect, parent)?;
        self.flush_events();
        Ok(id)
    }

    /// Like [`insert`](Self::insert) but takes a feature code or name, as
    /// read from outside input. An unrecognized feature is an error.
    pub fn insert_named(
        &mut self,
        feature: Option<&str>,
        rect: Rect<Relative>,
        parent: Option<AnnotationId>,
    ) -> Result<AnnotationId, FacelabelError> {
        let feature = Feature::parse(feature).ok_or_else(|| {
            FacelabelError::InvalidArgument(format!(
                "annotations must mark a feature, got '{}'",
                feature.unwrap_or_default()
            ))
        })?;
        self.insert(feature, rect, parent)
    }

    pub(super) fn insert_node(
        &mut self,
        feature: Feature,
        rect: Rect<Relative>,
        parent: Option<AnnotationId>,
    ) -> Result<AnnotationId, FacelabelError> {
        let origin = match parent {
            Some(p) => {
                let parent_node = self.annotation(p)?;
                check_nesting(parent_node.feature, feature)?;
                parent_node.start()
            }
            None => Coord::new(0.0, 0.0),
        };
        let id = AnnotationId(self.nodes.len());
        let mut node = Annotation::new(feature, rect.to_absolute(origin), &self.schemas);
        node.parent = parent;
        self.nodes.push(Some(node));
        match parent {
            Some(p) => {
                self.node_mut(p)?.children.push(id);
                self.events.emit(p, ChangeKind::Children);
            }
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Makes a detached annotation a root.
    pub fn attach_root(&mut self, id: AnnotationId) -> Result<(), FacelabelError> {
        self.ensure_detached(id)?;
        self.roots.push(id);
        self.events.emit(id, ChangeKind::Parent);
        self.flush_events();
        Ok(())
    }

    /// Makes a detached annotation the last child of `parent`. Its stored
    /// absolute position is kept.
    pub fn attach_child(
        &mut self,
        parent: AnnotationId,
        id: AnnotationId,
    ) -> Result<(), FacelabelError> {
        self.ensure_detached(id)?;
        let child_feature = self.annotation(id)?.feature;
        check_nesting(self.annotation(parent)?.feature, child_feature)?;
        if self.descendants(id).contains(&parent) {
            return Err(FacelabelError::InvalidArgument(format!(
                "{id} cannot become a child of its own descendant {parent}"
            )));
        }
        self.node_mut(parent)?.children.push(id);
        self.node_mut(id)?.parent = Some(parent);
        self.events.emit(id, ChangeKind::Parent);
        self.events.emit(parent, ChangeKind::Children);
        self.flush_events();
        Ok(())
    }

    fn ensure_detached(&self, id: AnnotationId) -> Result<(), FacelabelError> {
        let node = self.annotation(id)?;
        if node.parent.is_some() || self.roots.contains(&id) {
            return Err(FacelabelError::InvalidArgument(format!(
                "{id} is already attached"
            )));
        }
        Ok(())
    }

    /// Unlinks `id` from its parent or from the root list. The subtree
    /// stays addressable and can be attached again.
    pub fn detach(&mut self, id: AnnotationId) -> Result<(), FacelabelError> {
        self.detach_node(id)?;
        self.flush_events();
        Ok(())
    }

    pub(super) fn detach_node(&mut self, id: AnnotationId) -> Result<(), FacelabelError> {
        match self.annotation(id)?.parent {
            Some(parent) => {
                self.node_mut(parent)?.children.retain(|c| *c != id);
                self.node_mut(id)?.parent = None;
                self.events.emit(parent, ChangeKind::Children);
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.events.emit(id, ChangeKind::Parent);
        Ok(())
    }

    /// Detaches `id` and frees it and all of its descendants.
    pub fn delete(&mut self, id: AnnotationId) -> Result<(), FacelabelError> {
        self.detach_node(id)?;
        for node in self.descendants(id) {
            self.nodes[node.0] = None;
        }
        self.flush_events();
        Ok(())
    }

    /// Deep copy of the subtree at `id`. The copy is detached until passed
    /// to [`attach_root`](Self::attach_root) or
    /// [`attach_child`](Self::attach_child).
    pub fn clone_subtree(&mut self, id: AnnotationId) -> Result<AnnotationId, FacelabelError> {
        let nodes = self.collect_subtree(id)?;
        Ok(self.graft(nodes))
    }

    /// Copies a subtree of another tree into this one, detached.
    pub fn import_subtree(
        &mut self,
        source: &AnnotationTree,
        id: AnnotationId,
    ) -> Result<AnnotationId, FacelabelError> {
        let nodes = source.collect_subtree(id)?;
        Ok(self.graft(nodes))
    }

    fn collect_subtree(
        &self,
        id: AnnotationId,
    ) -> Result<Vec<(AnnotationId, Annotation)>, FacelabelError> {
        self.annotation(id)?;
        Ok(self
            .descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).map(|a| (d, a.clone())))
            .collect())
    }

    /// Stores copied nodes under fresh ids. The first node becomes the
    /// detached subtree root.
    fn graft(&mut self, nodes: Vec<(AnnotationId, Annotation)>) -> AnnotationId {
        let base = self.nodes.len();
        let remap: HashMap<AnnotationId, AnnotationId> = nodes
            .iter()
            .enumerate()
            .map(|(i, (old, _))| (*old, AnnotationId(base + i)))
            .collect();
        for (i, (_, mut node)) in nodes.into_iter().enumerate() {
            node.parent = match i {
                0 => None,
                _ => node.parent.and_then(|p| remap.get(&p).copied()),
            };
            node.children = node
                .children
                .iter()
                .filter_map(|c| remap.get(c).copied())
                .collect();
            node.selected = false;
            node.active = false;
            self.nodes.push(Some(node));
        }
        AnnotationId(base)
    }

    fn subtree_eq(&self, a: AnnotationId, other: &AnnotationTree, b: AnnotationId) -> bool {
        match (self.get(a), other.get(b)) {
            (Some(x), Some(y)) => {
                x.same_content(y)
                    && x.children.len() == y.children.len()
                    && x
                        .children
                        .iter()
                        .zip(&y.children)
                        .all(|(ca, cb)| self.subtree_eq(*ca, other, *cb))
            }
            _ => false,
        }
    }

    /// Changes the feature, keeping the nesting rules with the parent and
    /// the children.
    pub fn set_feature(&mut self, id: AnnotationId, feature: Feature) -> Result<(), FacelabelError> {
        let node = self.annotation(id)?;
        if let Some(parent) = node.parent {
            check_nesting(self.annotation(parent)?.feature, feature)?;
        }
        for child in &node.children {
            check_nesting(feature, self.annotation(*child)?.feature)?;
        }
        self.node_mut(id)?.feature = feature;
        self.events.emit(id, ChangeKind::Feature);
        self.flush_events();
        Ok(())
    }

    pub fn set_category(
        &mut self,
        id: AnnotationId,
        label: Option<&str>,
    ) -> Result<(), FacelabelError> {
        self.node_mut(id)?.category.set_label(label)?;
        self.events.emit(id, ChangeKind::Category);
        self.flush_events();
        Ok(())
    }

    pub fn set_breed(&mut self, id: AnnotationId, label: Option<&str>) -> Result<(), FacelabelError> {
        self.node_mut(id)?.breed.set_label(label)?;
        self.events.emit(id, ChangeKind::Breed);
        self.flush_events();
        Ok(())
    }

    /// Sets one attribute. `Ok(false)` means the schema rejected the
    /// selection and nothing changed.
    pub fn set_attribute<S: AsRef<str>>(
        &mut self,
        id: AnnotationId,
        kind: AttributeKind,
        values: &[S],
    ) -> Result<bool, FacelabelError> {
        let accepted = self.node_mut(id)?.attributes[kind.index()].set_state(values);
        if accepted {
            self.events.emit(id, ChangeKind::Attribute(kind));
            self.flush_events();
        }
        Ok(accepted)
    }

    /// Sets one attribute from its serialized block.
    pub fn parse_attribute(
        &mut self,
        id: AnnotationId,
        kind: AttributeKind,
        text: &str,
    ) -> Result<bool, FacelabelError> {
        let accepted = self.node_mut(id)?.attributes[kind.index()].parse_set(text);
        if accepted {
            self.events.emit(id, ChangeKind::Attribute(kind));
            self.flush_events();
        }
        Ok(accepted)
    }

    pub fn set_roll(&mut self, id: AnnotationId, roll: f32) -> Result<(), FacelabelError> {
        let node = self.node_mut(id)?;
        if node.orientation.roll != roll {
            node.orientation.roll = roll;
            self.events.emit(id, ChangeKind::Roll);
            self.flush_events();
        }
        Ok(())
    }

    pub fn set_pitch(&mut self, id: AnnotationId, pitch: f32) -> Result<(), FacelabelError> {
        let node = self.node_mut(id)?;
        if node.orientation.pitch != pitch {
            node.orientation.pitch = pitch;
            self.events.emit(id, ChangeKind::Pitch);
            self.flush_events();
        }
        Ok(())
    }

    pub fn set_yaw(&mut self, id: AnnotationId, yaw: f32) -> Result<(), FacelabelError> {
        let node = self.node_mut(id)?;
        if node.orientation.yaw != yaw {
            node.orientation.yaw = yaw;
            self.events.emit(id, ChangeKind::Yaw);
            self.flush_events();
        }
        Ok(())
    }

    /// Sets all three angles; listeners hear one event per changed angle.
    pub fn set_orientation(
        &mut self,
        id: AnnotationId,
        orientation: Orientation,
    ) -> Result<(), FacelabelError> {
        let node = self.node_mut(id)?;
        let before = node.orientation;
        node.orientation = orientation;
        if before.roll != orientation.roll {
            self.events.emit(id, ChangeKind::Roll);
        }
        if before.pitch != orientation.pitch {
            self.events.emit(id, ChangeKind::Pitch);
        }
        if before.yaw != orientation.yaw {
            self.events.emit(id, ChangeKind::Yaw);
        }
        self.flush_events();
        Ok(())
    }

    pub fn set_selected(&mut self, id: AnnotationId, selected: bool) -> Result<(), FacelabelError> {
        self.node_mut(id)?.selected = selected;
        self.events.emit(id, ChangeKind::Selection);
        self.flush_events();
        Ok(())
    }

    /// Moves the top-left corner, keeping width and height.
    pub fn set_start(&mut self, id: AnnotationId, p: Coord<Absolute>) -> Result<(), FacelabelError> {
        self.set_start_node(id, p)?;
        self.flush_events();
        Ok(())
    }

    /// Moves the bottom-right corner, keeping the top-left corner.
    pub fn set_end(&mut self, id: AnnotationId, p: Coord<Absolute>) -> Result<(), FacelabelError> {
        self.set_end_node(id, p)?;
        self.flush_events();
        Ok(())
    }

    pub(super) fn set_start_node(
        &mut self,
        id: AnnotationId,
        p: Coord<Absolute>,
    ) -> Result<(), FacelabelError> {
        self.node_mut(id)?.rect.origin = p;
        self.events.emit(id, ChangeKind::Start);
        Ok(())
    }

    pub(super) fn set_end_node(
        &mut self,
        id: AnnotationId,
        p: Coord<Absolute>,
    ) -> Result<(), FacelabelError> {
        let rect = &mut self.node_mut(id)?.rect;
        rect.width = p.x - rect.x();
        rect.height = p.y - rect.y();
        self.events.emit(id, ChangeKind::End);
        Ok(())
    }

    /// Origin of the root `id` hangs from.
    pub fn root_origin(&self, id: AnnotationId) -> Result<Coord<Absolute>, FacelabelError> {
        let mut current = self.annotation(id)?;
        while let Some(parent) = current.parent {
            current = self.annotation(parent)?;
        }
        Ok(current.start())
    }

    /// Bounds of `id` relative to its parent's origin, as written to list
    /// files. Roots are relative to the image origin.
    pub fn relative_rect(&self, id: AnnotationId) -> Result<Rect<Relative>, FacelabelError> {
        let node = self.annotation(id)?;
        let origin = match node.parent {
            Some(parent) => self.annotation(parent)?.start(),
            None => Coord::new(0.0, 0.0),
        };
        Ok(node.rect.relative_to(origin))
    }

    /// Removes roots, and children of roots, that break the minimum size
    /// rules. Returns the removed annotations, detached. Running it again
    /// right away removes nothing.
    pub fn remove_too_small(&mut self) -> Vec<AnnotationId> {
        let mut removed = Vec::new();
        for root in self.roots.clone().into_iter().rev() {
            let Some(node) = self.get(root) else {
                continue;
            };
            let small_children: Vec<AnnotationId> = node
                .children
                .iter()
                .rev()
                .copied()
                .filter(|c| self.get(*c).is_some_and(Annotation::is_too_small))
                .collect();
            for child in small_children {
                if self.detach_node(child).is_ok() {
                    removed.push(child);
                }
            }
            if self.get(root).is_some_and(Annotation::is_too_small) && self.detach_node(root).is_ok()
            {
                removed.push(root);
            }
        }
        if !removed.is_empty() {
            log::debug!("removed {} annotation(s) below the size limits", removed.len());
        }
        self.flush_events();
        removed
    }

    /// Merges the roots of `source` into this tree. A source root with the
    /// same feature and bounds as an existing root is a duplicate: it
    /// replaces the existing one in place only if it has more children.
    /// Everything else is appended.
    pub fn add_all_non_duplicates(&mut self, source: &AnnotationTree) -> Result<(), FacelabelError> {
        for &incoming in &source.roots {
            let candidate = source.annotation(incoming)?;
            let duplicate = self.roots.iter().position(|r| {
                self.get(*r).is_some_and(|existing| {
                    existing.feature == candidate.feature && existing.rect == candidate.rect
                })
            });
            match duplicate {
                Some(index) => {
                    let existing = self.roots[index];
                    if candidate.children.len() > self.annotation(existing)?.children.len() {
                        let copy = self.import_subtree(source, incoming)?;
                        self.roots[index] = copy;
                        for node in self.descendants(existing) {
                            self.nodes[node.0] = None;
                        }
                        self.events.emit(copy, ChangeKind::Parent);
                    }
                }
                None => {
                    let copy = self.import_subtree(source, incoming)?;
                    self.roots.push(copy);
                    self.events.emit(copy, ChangeKind::Parent);
                }
            }
        }
        self.flush_events();
        Ok(())
    }

    /// Distinct category labels in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (_, node) in self.iter() {
            let label = node.category.to_string();
            if !out.contains(&label) {
                out.push(label);
            }
        }
        out
    }

    /// Relabels every annotation tagged `old` as `new`. Returns how many
    /// changed.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<usize, FacelabelError> {
        Category::new(Some(new), super::category::CATEGORY_KIND)?;
        let hits: Vec<AnnotationId> = self
            .iter()
            .filter(|(_, a)| a.category.is(old))
            .map(|(id, _)| id)
            .collect();
        for id in &hits {
            self.node_mut(*id)?.category.set_label(Some(new))?;
            self.events.emit(*id, ChangeKind::Category);
        }
        self.flush_events();
        Ok(hits.len())
    }

    /// Resets every annotation tagged `label` to untagged. Returns how many
    /// changed.
    pub fn clear_category(&mut self, label: &str) -> usize {
        let hits: Vec<AnnotationId> = self
            .iter()
            .filter(|(_, a)| a.category.is(label))
            .map(|(id, _)| id)
            .collect();
        for id in &hits {
            if let Some(Some(node)) = self.nodes.get_mut(id.0) {
                node.category = Category::untagged();
                self.events.emit(*id, ChangeKind::Category);
            }
        }
        self.flush_events();
        hits.len()
    }
}
