#![allow(dead_code)]

use facelabel::model::Feature;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Integer geometry `(x, y, w, h)` as written on the wire.
pub type Geometry = (i64, i64, i64, i64);

/// Attribute blocks as `(code, tags)`, in serialization order.
pub type Blocks = Vec<(char, Vec<&'static str>)>;

/// A generated annotation in canonical written form.
#[derive(Clone, Debug)]
pub struct GenAnnotation {
    pub feature: Feature,
    pub geometry: Geometry,
    pub attributes: Blocks,
    pub category: Option<String>,
    pub breed: Option<String>,
    /// Never all zero; a zero orientation is written as absent.
    pub orientation: Option<(f32, f32, f32)>,
    pub children: Vec<GenAnnotation>,
}

impl GenAnnotation {
    pub fn plain(feature: Feature, geometry: Geometry) -> Self {
        Self {
            feature,
            geometry,
            attributes: Vec::new(),
            category: None,
            breed: None,
            orientation: None,
            children: Vec::new(),
        }
    }

    /// The annotation written the way the serializer writes it.
    pub fn to_grammar(&self) -> String {
        let (x, y, w, h) = self.geometry;
        let code = self.feature.code();
        let geometry = format!("[{x},{y};{w},{h}]");
        if self.attributes.is_empty()
            && self.category.is_none()
            && self.breed.is_none()
            && self.orientation.is_none()
            && self.children.is_empty()
        {
            return format!("{code}{geometry}");
        }
        let mut parts = vec![format!("{code}{{{geometry}")];
        for (code, tags) in &self.attributes {
            parts.push(format!("{code}[{}]", tags.join(",")));
        }
        if let Some(category) = &self.category {
            parts.push(format!("d[{category}]"));
        }
        if let Some(breed) = &self.breed {
            parts.push(format!("b[{breed}]"));
        }
        if let Some((roll, pitch, yaw)) = self.orientation {
            parts.push(format!("r[{roll:?},{pitch:?},{yaw:?}]"));
        }
        parts.extend(self.children.iter().map(GenAnnotation::to_grammar));
        format!("{}}}", parts.join("\t"))
    }
}

pub fn line_of(roots: &[GenAnnotation]) -> String {
    roots
        .iter()
        .map(GenAnnotation::to_grammar)
        .collect::<Vec<_>>()
        .join("\t")
}

fn facial_feature() -> impl Strategy<Value = Feature> {
    prop_oneof![
        Just(Feature::Eyes),
        Just(Feature::Nose),
        Just(Feature::Mouth),
        Just(Feature::Ear),
    ]
}

fn root_feature() -> impl Strategy<Value = Feature> {
    prop_oneof![
        Just(Feature::Face),
        Just(Feature::Profile),
        Just(Feature::Skin),
        Just(Feature::Animal),
    ]
}

/// Any geometry, including sizes the size filter rejects.
pub fn any_geometry() -> impl Strategy<Value = Geometry> {
    (-50i64..400, -50i64..400, 0i64..120, 0i64..120)
}

/// Geometry inside a `w` by `h` parent, parent-relative.
fn child_geometry(w: i64, h: i64) -> BoxedStrategy<Geometry> {
    (1..=w, 1..=h)
        .prop_flat_map(move |(cw, ch)| (0..=w - cw, 0..=h - ch, Just(cw), Just(ch)))
        .boxed()
}

fn selection(options: &[&[&'static str]]) -> impl Strategy<Value = Option<Vec<&'static str>>> {
    let options: Vec<Vec<&'static str>> = options.iter().map(|o| o.to_vec()).collect();
    proptest::option::of(proptest::sample::select(options))
}

/// Valid selections for every built-in attribute, in serialization order.
fn attributes() -> impl Strategy<Value = Blocks> {
    (
        selection(&[&["dark"], &["light"], &["unknown"]]),
        selection(&[&["male"], &["female"], &["unknown"]]),
        selection(&[&["adult"], &["youth"], &["unknown"]]),
        selection(&[&["blood"], &["bruise", "scar"], &["blood", "bruise"], &["unwounded"]]),
        selection(&[&["glasses"], &["sunglasses", "beard"], &["unoccluded"], &["guess"]]),
        selection(&[&["dog"], &["cat"], &["horse"], &["other"]]),
    )
        .prop_map(|(skin, gender, age, wound, occlusion, kind)| {
            ['c', 'g', 'y', 'w', 'o', 'k']
                .into_iter()
                .zip([skin, gender, age, wound, occlusion, kind])
                .filter_map(|(code, tags)| tags.map(|tags| (code, tags)))
                .collect()
        })
}

fn category() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[A-Z][a-z]{0,7}".prop_filter("sentinel", |c| c != "Untagged"))
}

fn breed() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z]{1,8}( [a-z]{1,6})?".prop_filter("sentinel", |b| b != "unknown"))
}

fn orientation() -> impl Strategy<Value = Option<(f32, f32, f32)>> {
    let half_degrees = || (-360i32..=360).prop_map(|v| v as f32 / 2.0);
    proptest::option::of((half_degrees(), half_degrees(), half_degrees()))
        .prop_map(|o| o.filter(|&(r, p, y)| (r, p, y) != (0.0, 0.0, 0.0)))
}

/// An annotation of `feature` at `geometry` with any fields and children
/// of every feature it may contain, nested as deep as the rules allow.
fn annotation(feature: Feature, geometry: Geometry) -> BoxedStrategy<GenAnnotation> {
    let allowed: Vec<Feature> = Feature::ALL
        .into_iter()
        .filter(|child| feature.may_contain(*child))
        .collect();
    let (_, _, w, h) = geometry;
    let children = if allowed.is_empty() {
        Just(Vec::new()).boxed()
    } else {
        let child = (proptest::sample::select(allowed), child_geometry(w, h))
            .prop_flat_map(|(feature, geometry)| annotation(feature, geometry));
        proptest::collection::vec(child, 0..3).boxed()
    };
    (attributes(), category(), breed(), orientation(), children)
        .prop_map(move |(attributes, category, breed, orientation, children)| GenAnnotation {
            feature,
            geometry,
            attributes,
            category,
            breed,
            orientation,
            children,
        })
        .boxed()
}

/// A root of any top-level feature with every field and nesting level.
pub fn any_root() -> BoxedStrategy<GenAnnotation> {
    (root_feature(), 0i64..300, 0i64..300, 20i64..160, 20i64..160)
        .prop_flat_map(|(feature, x, y, w, h)| annotation(feature, (x, y, w, h)))
        .boxed()
}

/// A face whose children may stick out of it, with any sizes.
pub fn unruly_face() -> BoxedStrategy<GenAnnotation> {
    (
        any_geometry(),
        proptest::collection::vec((facial_feature(), any_geometry()), 0..4),
    )
        .prop_map(|(geometry, children)| GenAnnotation {
            children: children
                .into_iter()
                .map(|(feature, geometry)| GenAnnotation::plain(feature, geometry))
                .collect(),
            ..GenAnnotation::plain(Feature::Face, geometry)
        })
        .boxed()
}

/// A line of 1 to 4 well-formed roots.
pub fn annotation_line() -> BoxedStrategy<Vec<GenAnnotation>> {
    proptest::collection::vec(any_root(), 1..5).boxed()
}
