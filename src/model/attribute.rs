//! Categorical attributes and the schemas that validate them.
//!
//! An [`AttributeSet`] is the immutable rule book for one attribute kind
//! (allowed tags, forbidden combinations, selection limit). An [`Attribute`]
//! is the current selection on one annotation, and it never holds a
//! selection its schema rejects.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::FacelabelError;

/// Tag of an attribute that has not been set.
pub const UNMARKED: &str = "unmarked";

/// Immutable schema for one attribute kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSet {
    code: char,
    name: String,
    max_selection: i32,
    vocabulary: Vec<String>,
    forbidden: Vec<Vec<String>>,
}

impl AttributeSet {
    pub fn new(
        code: char,
        name: impl Into<String>,
        max_selection: i32,
        vocabulary: Vec<String>,
        forbidden: Vec<Vec<String>>,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            max_selection,
            vocabulary,
            forbidden,
        }
    }

    /// Parses a plain-text schema definition.
    ///
    /// Layout, after any number of leading `#` lines: the one-character code,
    /// the display name, the maximum selection size, the comma-separated
    /// vocabulary, then one colon-separated forbidden combination per line.
    pub fn parse_definition(text: &str) -> Result<Self, FacelabelError> {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .skip_while(|l| l.starts_with('#'));

        let mut next = |what: &str| {
            lines
                .next()
                .ok_or_else(|| FacelabelError::SchemaParse(format!("missing {what} line")))
        };

        let code_line = next("code")?.trim();
        let mut code_chars = code_line.chars();
        let code = match (code_chars.next(), code_chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(FacelabelError::SchemaParse(format!(
                    "'{code_line}' is not a single character code"
                )))
            }
        };

        let name = next("name")?.to_string();

        let max_line = next("max selection")?.trim();
        let max_selection: i32 = max_line.parse().map_err(|_| {
            FacelabelError::SchemaParse(format!("'{max_line}' is not a valid selection size"))
        })?;

        let tag_line = next("vocabulary")?;
        let vocabulary: Vec<String> = tag_line.split(',').map(str::to_string).collect();
        if vocabulary.iter().any(String::is_empty) {
            return Err(FacelabelError::SchemaParse(format!(
                "vocabulary '{tag_line}' contains an empty tag"
            )));
        }

        let forbidden = lines
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.split(':').map(str::to_string).collect())
            .collect();

        Ok(Self::new(code, name, max_selection, vocabulary, forbidden))
    }

    pub fn code(&self) -> char {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Largest permitted selection; zero or less means unbounded.
    pub fn max_selection(&self) -> i32 {
        self.max_selection
    }

    pub fn values(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn forbidden(&self) -> &[Vec<String>] {
        &self.forbidden
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.vocabulary.iter().any(|t| t == tag)
    }

    /// Position of `tag` in the vocabulary.
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.vocabulary.iter().position(|t| t == tag)
    }

    /// True when `tags` respects the size limit, uses only known tags and
    /// contains no forbidden combination.
    pub fn is_valid_selection<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if self.max_selection > 0 && tags.len() > self.max_selection as usize {
            return false;
        }
        if !tags.iter().all(|t| self.contains(t.as_ref())) {
            return false;
        }
        let selected: HashSet<&str> = tags.iter().map(AsRef::as_ref).collect();
        !self
            .forbidden
            .iter()
            .any(|combo| combo.iter().all(|t| selected.contains(t.as_str())))
    }

    /// Matches a serialized `<code>[tag,tag,...]` block and returns its tags.
    ///
    /// Only the shape and vocabulary are checked here; selection limits and
    /// forbidden combinations are left to [`AttributeSet::is_valid_selection`].
    pub fn match_block<'a>(&self, text: &'a str) -> Option<Vec<&'a str>> {
        let rest = text.strip_prefix(self.code)?;
        let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
        let tags: Vec<&str> = inner.split(',').collect();
        tags.iter().all(|t| self.contains(t)).then_some(tags)
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A validated multi-valued selection bound to one schema.
#[derive(Clone, Debug)]
pub struct Attribute {
    schema: Arc<AttributeSet>,
    state: Vec<String>,
}

impl Attribute {
    /// Creates an attribute in the unmarked state.
    pub fn new(schema: Arc<AttributeSet>) -> Self {
        Self {
            schema,
            state: vec![UNMARKED.to_string()],
        }
    }

    pub fn schema(&self) -> &Arc<AttributeSet> {
        &self.schema
    }

    pub fn values(&self) -> &[String] {
        &self.state
    }

    /// Replaces the selection. An empty selection means unmarked. Returns
    /// false and keeps the previous selection if the schema rejects it.
    pub fn set_state<S: AsRef<str>>(&mut self, values: &[S]) -> bool {
        let candidate: Vec<String> = if values.is_empty() {
            vec![UNMARKED.to_string()]
        } else {
            values.iter().map(|v| v.as_ref().to_string()).collect()
        };
        if !self.schema.is_valid_selection(&candidate) {
            return false;
        }
        self.state = candidate;
        true
    }

    /// Parses a serialized block for this attribute's schema and applies it.
    pub fn parse_set(&mut self, text: &str) -> bool {
        match self.schema.match_block(text) {
            Some(tags) => self.set_state(&tags),
            None => false,
        }
    }

    pub fn is_unmarked(&self) -> bool {
        self.state.len() == 1 && self.state[0] == UNMARKED
    }

    /// Sorting weight: tags earlier in the vocabulary weigh more, and more
    /// tags weigh more.
    pub fn score(&self) -> i64 {
        let len = self.schema.values().len() as i64;
        self.state
            .iter()
            .map(|tag| {
                let index = self.schema.index_of(tag).map_or(-1, |i| i as i64);
                len - index
            })
            .sum()
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.schema.code() == other.schema.code() && self.state == other.state
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.schema.code(), self.state.join(","))
    }
}

impl Serialize for Attribute {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.state.serialize(serializer)
    }
}

/// The six attribute slots every annotation carries, in serialization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Skin,
    Gender,
    Age,
    Wound,
    Occlusion,
    Kind,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 6] = [
        AttributeKind::Skin,
        AttributeKind::Gender,
        AttributeKind::Age,
        AttributeKind::Wound,
        AttributeKind::Occlusion,
        AttributeKind::Kind,
    ];

    /// Block code of the built-in schema for this slot.
    pub const fn code(self) -> char {
        match self {
            AttributeKind::Skin => 'c',
            AttributeKind::Gender => 'g',
            AttributeKind::Age => 'y',
            AttributeKind::Wound => 'w',
            AttributeKind::Occlusion => 'o',
            AttributeKind::Kind => 'k',
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AttributeKind::Skin => "skin",
            AttributeKind::Gender => "gender",
            AttributeKind::Age => "age",
            AttributeKind::Wound => "wound",
            AttributeKind::Occlusion => "occlusions",
            AttributeKind::Kind => "kind",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Built-in definitions in slot order.
const BUILTIN_DEFINITIONS: [&str; 6] = [
    include_str!("../../schemas/skin_tone.txt"),
    include_str!("../../schemas/gender.txt"),
    include_str!("../../schemas/age.txt"),
    include_str!("../../schemas/wounds.txt"),
    include_str!("../../schemas/occlusions.txt"),
    include_str!("../../schemas/kind.txt"),
];

static BUILTIN: Lazy<Arc<Schemas>> = Lazy::new(|| {
    let sets = BUILTIN_DEFINITIONS.map(|text| {
        Arc::new(AttributeSet::parse_definition(text).expect("Valid built-in schema"))
    });
    Arc::new(Schemas { sets })
});

/// One schema per attribute slot.
///
/// Annotations hold an `Arc<Schemas>` so that every attribute of a given
/// kind in a tree shares the same rule book.
#[derive(Clone, Debug, PartialEq)]
pub struct Schemas {
    sets: [Arc<AttributeSet>; 6],
}

impl Schemas {
    /// The definitions compiled into the crate.
    pub fn builtin() -> Arc<Schemas> {
        Arc::clone(&BUILTIN)
    }

    pub fn get(&self, kind: AttributeKind) -> &Arc<AttributeSet> {
        &self.sets[kind.index()]
    }

    /// Finds the slot whose schema uses `code`.
    pub fn kind_for_code(&self, code: char) -> Option<AttributeKind> {
        AttributeKind::ALL
            .into_iter()
            .find(|k| self.get(*k).code() == code)
    }

    /// Returns a copy with the slot whose built-in code matches `set`'s code
    /// replaced by `set`.
    pub fn with_override(&self, set: AttributeSet) -> Result<Self, FacelabelError> {
        let kind = AttributeKind::from_code(set.code()).ok_or_else(|| {
            FacelabelError::SchemaParse(format!(
                "code '{}' does not name an attribute slot",
                set.code()
            ))
        })?;
        let mut next = self.clone();
        next.sets[kind.index()] = Arc::new(set);
        Ok(next)
    }

    /// Loads the built-ins, then overrides them with every `*.txt`
    /// definition found under `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, FacelabelError> {
        let mut schemas = Schemas::builtin().as_ref().clone();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| FacelabelError::SchemaParse(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "txt") {
                continue;
            }
            let text = std::fs::read_to_string(path)?;
            let set = AttributeSet::parse_definition(&text).map_err(|e| {
                FacelabelError::SchemaParse(format!("{}: {}", path.display(), e))
            })?;
            log::debug!(
                "schema override '{}' ({}) from {}",
                set.name(),
                set.code(),
                path.display()
            );
            schemas = schemas.with_override(set)?;
        }
        Ok(schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wound_set() -> Arc<AttributeSet> {
        Arc::new(AttributeSet::new(
            'w',
            "Wounds",
            0,
            vec!["blood".into(), "scar".into(), "bruise".into(), UNMARKED.into()],
            vec![vec!["blood".into(), "scar".into()]],
        ))
    }

    #[test]
    fn forbidden_combination_is_rejected() {
        let mut attr = Attribute::new(wound_set());
        assert!(!attr.set_state(&["blood", "scar"]));
        assert!(attr.is_unmarked());
        assert!(attr.set_state(&["blood"]));
        assert_eq!(attr.values(), ["blood"]);
    }

    #[test]
    fn forbidden_subset_ignores_order_and_duplicates() {
        let set = wound_set();
        assert!(!set.is_valid_selection(&["scar", "bruise", "blood"]));
        assert!(set.is_valid_selection(&["bruise", "bruise"]));
    }

    #[test]
    fn empty_state_means_unmarked() {
        let mut attr = Attribute::new(wound_set());
        assert!(attr.set_state(&["bruise"]));
        let empty: [&str; 0] = [];
        assert!(attr.set_state(&empty));
        assert!(attr.is_unmarked());
    }

    #[test]
    fn max_selection_limits_length() {
        let set = AttributeSet::new(
            'g',
            "Gender",
            1,
            vec!["male".into(), "female".into(), UNMARKED.into()],
            vec![],
        );
        assert!(set.is_valid_selection(&["male"]));
        assert!(!set.is_valid_selection(&["male", "female"]));
        assert!(!set.is_valid_selection(&["robot"]));
    }

    #[test]
    fn parse_set_matches_code_and_vocabulary() {
        let mut attr = Attribute::new(wound_set());
        assert!(attr.parse_set("w[blood,bruise]"));
        assert_eq!(attr.to_string(), "w[blood,bruise]");
        assert!(!attr.parse_set("g[blood]"));
        assert!(!attr.parse_set("w[blood,]"));
        assert!(!attr.parse_set("w[]"));
        assert!(!attr.parse_set("w[blood,scar]"));
        assert_eq!(attr.values(), ["blood", "bruise"]);
    }

    #[test]
    fn score_weights_by_position() {
        let mut attr = Attribute::new(wound_set());
        assert_eq!(attr.score(), 1);
        attr.set_state(&["blood", "bruise"]);
        assert_eq!(attr.score(), 4 + 2);
    }

    #[test]
    fn parse_definition_reads_all_sections() {
        let text = "# comment\n# another\nw\nWounds\n0\nblood,scar,unmarked\nblood:scar\n";
        let set = AttributeSet::parse_definition(text).unwrap();
        assert_eq!(set.code(), 'w');
        assert_eq!(set.name(), "Wounds");
        assert_eq!(set.max_selection(), 0);
        assert_eq!(set.values().len(), 3);
        assert_eq!(set.forbidden(), [vec!["blood".to_string(), "scar".to_string()]]);
    }

    #[test]
    fn parse_definition_rejects_bad_headers() {
        assert!(AttributeSet::parse_definition("ww\nX\n0\na\n").is_err());
        assert!(AttributeSet::parse_definition("w\nX\nmany\na\n").is_err());
        assert!(AttributeSet::parse_definition("w\nX\n").is_err());
    }

    #[test]
    fn builtins_cover_every_slot() {
        let schemas = Schemas::builtin();
        for kind in AttributeKind::ALL {
            let set = schemas.get(kind);
            assert_eq!(set.code(), kind.code());
            assert!(set.contains(UNMARKED), "{kind} lacks '{UNMARKED}'");
        }
        let mut wound = Attribute::new(Arc::clone(schemas.get(AttributeKind::Wound)));
        assert!(!wound.set_state(&["blood", "scar"]));
        assert!(wound.set_state(&["blood"]));
    }

    #[test]
    fn override_replaces_matching_slot() {
        let custom =
            AttributeSet::parse_definition("g\nGender\n2\nmale,female,unmarked\n").unwrap();
        let schemas = Schemas::builtin().with_override(custom).unwrap();
        assert_eq!(schemas.get(AttributeKind::Gender).max_selection(), 2);
        assert_eq!(schemas.kind_for_code('g'), Some(AttributeKind::Gender));

        let stray = AttributeSet::parse_definition("z\nZ\n0\na\n").unwrap();
        assert!(Schemas::builtin().with_override(stray).is_err());
    }
}
