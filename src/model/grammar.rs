//! The one-line text form of annotations.
//!
//! A plain annotation is written `c[x,y;w,h]`, where `c` is the feature
//! code and the integers are relative to the parent's origin (the image
//! origin for roots). Anything richer uses the braced form
//!
//! ```text
//! c{[x,y;w,h]<TAB>item<TAB>item...}
//! ```
//!
//! whose items are attribute blocks, an `r[roll,pitch,yaw]` orientation
//! block, nested annotations, and the `d[..]` category and `b[..]` breed
//! blocks. Several annotations on one line are separated by tabs.

use std::fmt;
use std::sync::Arc;

use super::annotation::Orientation;
use super::attribute::Schemas;
use super::category::{Category, BREED_KIND, CATEGORY_KIND};
use super::coord::Coord;
use super::feature::Feature;
use super::ids::AnnotationId;
use super::rect::Rect;
use super::tree::{check_nesting, AnnotationTree};
use super::Relative;
use crate::error::FacelabelError;

impl AnnotationTree {
    /// Parses a tab-separated line of annotations into a fresh tree using
    /// the built-in schemas.
    ///
    /// Segments outside any annotation that contain neither `[` nor `]` are
    /// skipped. The size rules are not applied here.
    pub fn parse_line(line: &str) -> Result<AnnotationTree, FacelabelError> {
        Self::parse_line_with(line, Schemas::builtin())
    }

    /// Like [`parse_line`](Self::parse_line) with explicit schemas.
    pub fn parse_line_with(
        line: &str,
        schemas: Arc<Schemas>,
    ) -> Result<AnnotationTree, FacelabelError> {
        let mut tree = AnnotationTree::with_schemas(schemas);
        for text in split_top_level(line)? {
            parse_annotation_into(&mut tree, &text, None)?;
        }
        Ok(tree)
    }

    /// Parses one annotation and attaches it under `parent`, or as a root.
    /// Nothing is added if parsing fails.
    pub fn parse_annotation(
        &mut self,
        text: &str,
        parent: Option<AnnotationId>,
    ) -> Result<AnnotationId, FacelabelError> {
        let mut scratch = AnnotationTree::with_schemas(Arc::clone(&self.schemas));
        let root = parse_annotation_into(&mut scratch, text.trim(), None)?;
        let origin = match parent {
            Some(p) => {
                let parent_node = self.annotation(p)?;
                check_nesting(parent_node.feature(), scratch.annotation(root)?.feature())?;
                parent_node.start()
            }
            None => Coord::new(0.0, 0.0),
        };
        let id = self.import_subtree(&scratch, root)?;
        for node in self.descendants(id) {
            let rect = &mut self.node_mut(node)?.rect;
            rect.origin.x += origin.x;
            rect.origin.y += origin.y;
        }
        match parent {
            Some(p) => self.attach_child(p, id)?,
            None => self.attach_root(id)?,
        }
        Ok(id)
    }

    /// The text form of `id` and its descendants.
    pub fn to_grammar(&self, id: AnnotationId) -> Result<String, FacelabelError> {
        let node = self.annotation(id)?;
        let r = self.relative_rect(id)?;
        // Truncation toward zero, the same as the integer geometry on input.
        let geometry = format!(
            "[{},{};{},{}]",
            r.x() as i64,
            r.y() as i64,
            r.width as i64,
            r.height as i64
        );
        let code = node.feature().code();
        if node.is_plain() {
            return Ok(format!("{code}{geometry}"));
        }

        let mut parts = vec![format!("{code}{{{geometry}")];
        parts.extend(
            node.attributes()
                .filter(|(_, a)| !a.is_unmarked())
                .map(|(_, a)| a.to_string()),
        );
        if !node.category().is_untagged() {
            parts.push(node.category().block());
        }
        if !node.breed().is_breed_unknown() {
            parts.push(node.breed().block());
        }
        let o = node.orientation();
        if !o.is_zero() {
            parts.push(format!("r[{:?},{:?},{:?}]", o.roll, o.pitch, o.yaw));
        }
        for child in node.children() {
            parts.push(self.to_grammar(*child)?);
        }
        Ok(format!("{}}}", parts.join("\t")))
    }
}

/// Every root annotation in order, tab separated.
impl fmt::Display for AnnotationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, root) in self.roots().iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            let text = self.to_grammar(*root).map_err(|_| fmt::Error)?;
            f.write_str(&text)?;
        }
        Ok(())
    }
}

fn brace_balance(text: &str) -> i64 {
    text.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

/// Groups tab-separated segments into whole annotations by brace depth.
fn split_top_level(line: &str) -> Result<Vec<String>, FacelabelError> {
    let mut out = Vec::new();
    let mut pending: Option<String> = None;
    let mut depth = 0;
    for segment in line.split('\t').map(str::trim) {
        match pending.as_mut() {
            Some(current) => {
                current.push('\t');
                current.push_str(segment);
            }
            None if !segment.contains('[') && !segment.contains(']') => continue,
            None => pending = Some(segment.to_string()),
        }
        depth += brace_balance(segment);
        if depth <= 0 {
            out.extend(pending.take());
            depth = 0;
        }
    }
    match pending {
        Some(rest) => Err(FacelabelError::grammar(&rest, "unclosed '{'")),
        None => Ok(out),
    }
}

fn parse_int(input: &str, text: &str) -> Result<i64, FacelabelError> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(FacelabelError::grammar(
            input,
            format!("'{text}' is not an integer"),
        ));
    }
    text.parse::<i64>()
        .map_err(|e| FacelabelError::grammar(input, e.to_string()))
}

/// Parses `[x,y;w,h]`.
fn parse_geometry(input: &str, text: &str) -> Result<Rect<Relative>, FacelabelError> {
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| FacelabelError::grammar(input, "expected '[x,y;w,h]'"))?;
    let (position, size) = inner
        .split_once(';')
        .ok_or_else(|| FacelabelError::grammar(input, "expected ';' between position and size"))?;
    let pair = |part: &str| -> Result<(f64, f64), FacelabelError> {
        let (a, b) = part
            .split_once(',')
            .ok_or_else(|| FacelabelError::grammar(input, "expected two comma-separated integers"))?;
        Ok((parse_int(input, a)? as f64, parse_int(input, b)? as f64))
    };
    let (x, y) = pair(position)?;
    let (w, h) = pair(size)?;
    Ok(Rect::new(x, y, w, h))
}

fn leading_feature(text: &str) -> Result<(Feature, &str), FacelabelError> {
    let mut chars = text.chars();
    let code = chars
        .next()
        .ok_or_else(|| FacelabelError::grammar(text, "empty annotation"))?;
    let feature =
        Feature::from_code(code).ok_or_else(|| FacelabelError::UnknownFeature(code.to_string()))?;
    Ok((feature, chars.as_str()))
}

fn parse_annotation_into(
    tree: &mut AnnotationTree,
    text: &str,
    parent: Option<AnnotationId>,
) -> Result<AnnotationId, FacelabelError> {
    let (feature, rest) = leading_feature(text)?;
    if let Some(body) = rest.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or_else(|| FacelabelError::grammar(text, "expected closing '}'"))?;
        let geometry_end = body
            .find(']')
            .ok_or_else(|| FacelabelError::grammar(text, "missing geometry"))?;
        let rect = parse_geometry(text, &body[..=geometry_end])?;
        let id = tree.insert_node(feature, rect, parent)?;
        parse_items(tree, id, text, &body[geometry_end + 1..])?;
        Ok(id)
    } else {
        let rect = parse_geometry(text, rest)?;
        tree.insert_node(feature, rect, parent)
    }
}

#[derive(Default)]
struct Seen {
    attributes: [bool; 6],
    orientation: bool,
    category: bool,
    breed: bool,
}

fn duplicate(block: &str) -> FacelabelError {
    FacelabelError::DuplicateBlock {
        block: block.to_string(),
    }
}

fn parse_items(
    tree: &mut AnnotationTree,
    id: AnnotationId,
    input: &str,
    body: &str,
) -> Result<(), FacelabelError> {
    let mut seen = Seen::default();
    let mut pending = String::new();
    let mut depth = 0;
    for segment in body.split('\t') {
        if !pending.is_empty() {
            pending.push('\t');
        }
        pending.push_str(segment);
        depth += brace_balance(segment);
        if depth > 0 {
            continue;
        }
        let item = std::mem::take(&mut pending);
        depth = 0;
        parse_item(tree, id, input, item.trim(), &mut seen)?;
    }
    if !pending.trim().is_empty() {
        return Err(FacelabelError::grammar(input, "unclosed '{' in sub-annotation"));
    }
    Ok(())
}

fn parse_item(
    tree: &mut AnnotationTree,
    id: AnnotationId,
    input: &str,
    item: &str,
    seen: &mut Seen,
) -> Result<(), FacelabelError> {
    let mut chars = item.chars();
    let Some(code) = chars.next() else {
        return Ok(());
    };
    let rest = chars.as_str();

    if let Some(kind) = tree.schemas.kind_for_code(code) {
        if rest.starts_with('[') && rest.ends_with(']') {
            let slot = &mut seen.attributes[kind.index()];
            if *slot {
                return Err(duplicate(item));
            }
            *slot = true;
            let accepted = tree.node_mut(id)?.attributes[kind.index()].parse_set(item);
            if !accepted {
                return Err(FacelabelError::AttributeRejected {
                    block: item.to_string(),
                });
            }
            log::debug!("{id}: {kind} set from '{item}'");
            return Ok(());
        }
    }

    if code == 'r' {
        if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if seen.orientation {
                return Err(duplicate(item));
            }
            seen.orientation = true;
            tree.node_mut(id)?.orientation = parse_orientation(input, inner)?;
            return Ok(());
        }
    }

    if Feature::from_code(code).is_some() {
        if rest.starts_with('{') {
            parse_annotation_into(tree, item, Some(id))?;
            return Ok(());
        }
        if let Ok(rect) = parse_geometry(item, rest) {
            let (feature, _) = leading_feature(item)?;
            tree.insert_node(feature, rect, Some(id))?;
            return Ok(());
        }
    }

    if let Some(category) = Category::parse_block(item) {
        let category = category?;
        let (flag, slot) = match category.kind() {
            CATEGORY_KIND => (&mut seen.category, &mut tree.node_mut(id)?.category),
            BREED_KIND => (&mut seen.breed, &mut tree.node_mut(id)?.breed),
            other => {
                return Err(FacelabelError::grammar(
                    input,
                    format!("unknown block kind '{other}' in '{item}'"),
                ))
            }
        };
        if *flag {
            return Err(duplicate(item));
        }
        *flag = true;
        *slot = category;
        return Ok(());
    }

    Err(FacelabelError::grammar(
        input,
        format!("unrecognized item '{item}'"),
    ))
}

fn parse_orientation(input: &str, inner: &str) -> Result<Orientation, FacelabelError> {
    let angles: Vec<&str> = inner.split(',').map(str::trim).collect();
    let [roll, pitch, yaw] = angles.as_slice() else {
        return Err(FacelabelError::grammar(
            input,
            "orientation needs roll, pitch and yaw",
        ));
    };
    let angle = |text: &str| -> Result<f32, FacelabelError> {
        let value = text
            .parse::<f32>()
            .map_err(|e| FacelabelError::grammar(input, format!("bad angle '{text}': {e}")))?;
        if !value.is_finite() {
            return Err(FacelabelError::grammar(
                input,
                format!("angle '{text}' is not a finite number"),
            ));
        }
        Ok(value)
    };
    Ok(Orientation::new(angle(*roll)?, angle(*pitch)?, angle(*yaw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;

    #[test]
    fn plain_form_round_trips() {
        let tree = AnnotationTree::parse_line("f[10,10;25,25]").unwrap();
        assert_eq!(tree.roots().len(), 1);
        let face = tree.get(tree.roots()[0]).unwrap();
        assert_eq!(face.feature(), Feature::Face);
        assert_eq!(*face.rect(), Rect::new(10.0, 10.0, 25.0, 25.0));
        assert_eq!(tree.to_string(), "f[10,10;25,25]");
    }

    #[test]
    fn complex_form_builds_children_in_absolute_space() {
        let line = "f{[10,10;25,25]\tg[male]\ti[0,0;5,5]}";
        let tree = AnnotationTree::parse_line(line).unwrap();
        let face_id = tree.roots()[0];
        let face = tree.get(face_id).unwrap();
        assert_eq!(face.gender().values(), ["male"]);
        let eyes = tree.get(face.children()[0]).unwrap();
        assert_eq!(eyes.feature(), Feature::Eyes);
        assert_eq!(*eyes.rect(), Rect::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(tree.to_string(), line);
    }

    #[test]
    fn every_field_is_written_in_order() {
        let line = "a{[0,0;200,100]\tk[dog]\td[Rex]\tb[beagle]\tr[1.5,0.0,-3.0]\th[10,0;40,40]}";
        let tree = AnnotationTree::parse_line(line).unwrap();
        let animal = tree.get(tree.roots()[0]).unwrap();
        assert_eq!(animal.kind().values(), ["dog"]);
        assert!(animal.category().is("Rex"));
        assert!(animal.breed().is("beagle"));
        assert_eq!(animal.orientation(), Orientation::new(1.5, 0.0, -3.0));
        assert_eq!(tree.to_string(), line);
    }

    #[test]
    fn body_geometry_wins_over_breed() {
        let tree = AnnotationTree::parse_line("a{[0,0;200,100]\tb[1,2;30,40]}").unwrap();
        let animal = tree.get(tree.roots()[0]).unwrap();
        assert_eq!(animal.children().len(), 1);
        assert!(animal.breed().is_breed_unknown());
    }

    #[test]
    fn nested_complex_children_parse() {
        let line = "a{[100,100;200,200]\th{[10,10;80,80]\ti[5,5;30,10]}}\tf[0,0;30,30]";
        let tree = AnnotationTree::parse_line(line).unwrap();
        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.total_annotations(), 4);
        let (eyes, _) = tree
            .iter()
            .find(|(_, a)| a.feature() == Feature::Eyes)
            .unwrap();
        assert_eq!(tree.get(eyes).unwrap().start(), Coord::new(115.0, 115.0));
        assert_eq!(tree.to_string(), line);
    }

    #[test]
    fn negative_coordinates_are_accepted() {
        let tree = AnnotationTree::parse_line("f[-5,-10;30,30]").unwrap();
        assert_eq!(tree.get(tree.roots()[0]).unwrap().x(), -5.0);
    }

    #[test]
    fn segments_without_brackets_are_skipped() {
        let tree = AnnotationTree::parse_line("image.jpg\tf[0,0;30,30]\t\tp[40,0;30,30]").unwrap();
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn failures() {
        for line in [
            "x[0,0;30,30]",
            "f[0,0;30]",
            "f[0,0;30,3.5]",
            "f{[0,0;30,30]\tg[male]\tg[female]}",
            "f{[0,0;30,30]\tg[martian]}",
            "f{[0,0;30,30]\tw[blood,scar]}",
            "f{[0,0;30,30]\td[a]\td[b]}",
            "f{[0,0;30,30]\tq[what]}",
            "f{[0,0;30,30]\td[]}",
            "f{[0,0;30,30]\tl[0,0;5,5]}",
            "f{[0,0;30,30]\tgarbage}",
            "f{[0,0;30,30]",
            "f{[0,0;30,30]\tr[NaN,0,0]}",
            "f{[0,0;30,30]\tr[0,inf,0]}",
            "f{[0,0;30,30]\tr[0,0,-infinity]}",
        ] {
            assert!(AnnotationTree::parse_line(line).is_err(), "{line}");
        }
    }

    #[test]
    fn parse_annotation_is_relative_to_parent() {
        let mut tree = AnnotationTree::parse_line("f[100,50;60,60]").unwrap();
        let face = tree.roots()[0];
        let nose = tree.parse_annotation("n[20,20;10,10]", Some(face)).unwrap();
        assert_eq!(tree.get(nose).unwrap().start(), Coord::new(120.0, 70.0));
        assert_eq!(tree.to_grammar(face).unwrap(), "f{[100,50;60,60]\tn[20,20;10,10]}");
        let nodes_before = tree.nodes.len();
        assert!(tree.parse_annotation("t[0,0;5,5]", Some(face)).is_err());
        assert_eq!(tree.nodes.len(), nodes_before);
    }

    #[test]
    fn unmarked_attributes_are_not_written() {
        let mut tree = AnnotationTree::parse_line("f{[0,0;30,30]\tg[male]}").unwrap();
        let face = tree.roots()[0];
        tree.set_attribute(face, AttributeKind::Gender, &[] as &[&str]).unwrap();
        assert_eq!(tree.to_string(), "f[0,0;30,30]");
    }
}
