//! The closed set of region kinds an annotation can mark.

use serde::Serialize;
use std::fmt;

mod flags {
    pub const HUMAN: u8 = 1;
    pub const ANIMAL: u8 = HUMAN << 1;
    /// Face, profile, skin and (animal) head may hold facial features.
    pub const FACE_CONTAINING: u8 = ANIMAL << 1;
    /// Eyes, nose, ear and mouth.
    pub const FACE_FEATURES: u8 = FACE_CONTAINING << 1;
    /// Head, leg, tail and body.
    pub const ANIMAL_FEATURES: u8 = FACE_FEATURES << 1;
    pub const RECTANGLE: u8 = ANIMAL_FEATURES << 1;
    pub const ELLIPSE: u8 = RECTANGLE << 1;
    pub const SUB_FEATURE: u8 = ELLIPSE << 1;
}

use flags::*;

/// An sRGB display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Highlight color for a selected annotation.
pub const COLOR_SELECTED: Rgb = Rgb(0x80, 0x00, 0x80);

/// What an annotation's region marks.
///
/// Each variant carries a one-letter code used by the list-file grammar, a
/// display color, and classification flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Feature {
    Face,
    Profile,
    Skin,
    Eyes,
    Nose,
    Mouth,
    Ear,
    Animal,
    Body,
    Head,
    Tail,
    Leg,
}

impl Feature {
    /// Every variant, in declaration order.
    pub const ALL: [Feature; 12] = [
        Feature::Face,
        Feature::Profile,
        Feature::Skin,
        Feature::Eyes,
        Feature::Nose,
        Feature::Mouth,
        Feature::Ear,
        Feature::Animal,
        Feature::Body,
        Feature::Head,
        Feature::Tail,
        Feature::Leg,
    ];

    const fn flags(self) -> u8 {
        match self {
            Feature::Face => HUMAN | ELLIPSE | FACE_CONTAINING,
            Feature::Profile => HUMAN | RECTANGLE | FACE_CONTAINING,
            Feature::Skin => HUMAN | RECTANGLE | FACE_CONTAINING,
            Feature::Eyes => FACE_FEATURES | ELLIPSE | SUB_FEATURE,
            Feature::Nose => FACE_FEATURES | RECTANGLE | SUB_FEATURE,
            Feature::Mouth => FACE_FEATURES | RECTANGLE | SUB_FEATURE,
            Feature::Ear => FACE_FEATURES | ELLIPSE | SUB_FEATURE,
            Feature::Animal => ANIMAL | RECTANGLE,
            Feature::Body => ANIMAL_FEATURES | SUB_FEATURE | RECTANGLE,
            Feature::Head => ANIMAL_FEATURES | SUB_FEATURE | RECTANGLE | FACE_CONTAINING,
            Feature::Tail => ANIMAL_FEATURES | SUB_FEATURE | RECTANGLE,
            Feature::Leg => ANIMAL_FEATURES | SUB_FEATURE | RECTANGLE,
        }
    }

    #[inline]
    fn has(self, flag: u8) -> bool {
        self.flags() & flag == flag
    }

    /// The one-letter code written to list files.
    pub const fn code(self) -> char {
        match self {
            Feature::Face => 'f',
            Feature::Profile => 'p',
            Feature::Skin => 's',
            Feature::Eyes => 'i',
            Feature::Nose => 'n',
            Feature::Mouth => 'm',
            Feature::Ear => 'e',
            Feature::Animal => 'a',
            Feature::Body => 'b',
            Feature::Head => 'h',
            Feature::Tail => 't',
            Feature::Leg => 'l',
        }
    }

    /// Display name, also accepted by [`Feature::parse`].
    pub const fn name(self) -> &'static str {
        match self {
            Feature::Face => "Face",
            Feature::Profile => "Profile",
            Feature::Skin => "Skin",
            Feature::Eyes => "Eyes",
            Feature::Nose => "Nose",
            Feature::Mouth => "Mouth",
            Feature::Ear => "Ear",
            Feature::Animal => "Animal",
            Feature::Body => "Body",
            Feature::Head => "Head",
            Feature::Tail => "Tail",
            Feature::Leg => "Leg",
        }
    }

    /// The color to draw this feature with.
    pub const fn color(self) -> Rgb {
        match self {
            Feature::Face => Rgb(0, 0, 255),
            Feature::Profile => Rgb(255, 0, 0),
            Feature::Skin => Rgb(255, 0, 255),
            Feature::Eyes => Rgb(255, 255, 0),
            Feature::Nose => Rgb(0, 255, 255),
            Feature::Mouth => Rgb(0, 255, 0),
            Feature::Ear => Rgb(255, 175, 175),
            Feature::Animal => Rgb(255, 200, 0),
            Feature::Body => Rgb(64, 64, 64),
            Feature::Head => Rgb(128, 128, 128),
            Feature::Tail => Rgb(192, 192, 192),
            Feature::Leg => Rgb(255, 255, 255),
        }
    }

    /// Parses a feature from its code letter (either case) or its name.
    ///
    /// `None` input yields the default [`Feature::Face`]. Unrecognized text
    /// yields `None`; it is up to the caller to turn that into an error.
    /// Names are case-sensitive: `"Face"` parses, `"face"` does not.
    pub fn parse(input: Option<&str>) -> Option<Feature> {
        let Some(s) = input else {
            return Some(Feature::Face);
        };
        Feature::ALL.into_iter().find(|f| {
            let mut chars = s.chars();
            let single = match (chars.next(), chars.next()) {
                (Some(c), None) => c == f.code() || c == f.code().to_ascii_uppercase(),
                _ => false,
            };
            single || s == f.name()
        })
    }

    /// Looks a feature up by its code letter (either case).
    pub fn from_code(code: char) -> Option<Feature> {
        let lower = code.to_ascii_lowercase();
        Feature::ALL.into_iter().find(|f| f.code() == lower)
    }

    /// Every character that may identify a feature, lower then upper case.
    pub fn code_chars() -> Vec<char> {
        Feature::ALL
            .iter()
            .flat_map(|f| [f.code(), f.code().to_ascii_uppercase()])
            .collect()
    }

    /// Features belonging to the human family.
    pub fn human_values() -> Vec<Feature> {
        Feature::ALL.into_iter().filter(|f| f.is_human()).collect()
    }

    /// Features belonging to the animal family (the whole animal only).
    pub fn animal_values() -> Vec<Feature> {
        Feature::ALL.into_iter().filter(|f| f.is_animal()).collect()
    }

    /// True if this feature is drawn and hit-tested as a rectangle; false
    /// means an ellipse inscribed in the bounding rectangle.
    pub fn is_rectangle(self) -> bool {
        self.has(RECTANGLE)
    }

    /// True if this feature is only found nested inside another.
    pub fn is_subfeature(self) -> bool {
        self.has(SUB_FEATURE)
    }

    pub fn is_human(self) -> bool {
        self.has(HUMAN)
    }

    pub fn is_animal(self) -> bool {
        self.has(ANIMAL)
    }

    /// True if facial features may be nested inside this feature.
    pub fn is_face_containing(self) -> bool {
        self.has(FACE_CONTAINING)
    }

    /// True for eyes, nose, mouth and ears.
    pub fn is_facial_feature(self) -> bool {
        self.has(FACE_FEATURES)
    }

    /// True for animal body parts.
    pub fn is_animal_feature(self) -> bool {
        self.has(ANIMAL_FEATURES)
    }

    /// Whether an annotation of `child` may be nested directly inside one of
    /// `self`.
    pub fn may_contain(self, child: Feature) -> bool {
        if !child.is_subfeature() {
            return false;
        }
        (child.is_facial_feature() && self.is_face_containing())
            || (child.is_animal_feature() && self.is_animal())
    }
}

impl Default for Feature {
    fn default() -> Self {
        Feature::Face
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
