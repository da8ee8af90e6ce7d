//! The annotation model: features, attribute schemas, categories, and the
//! per-image annotation tree with its geometry, grammar and change events.

mod annotation;
mod attribute;
mod category;
mod coord;
mod events;
mod feature;
mod geometry;
mod grammar;
mod ids;
pub mod io_lst;
mod rect;
mod space;
mod tree;

pub use annotation::{Annotation, Orientation, MIN_AREA, MIN_ASPECT_RATIO, MIN_WIDTH};
pub use attribute::{Attribute, AttributeKind, AttributeSet, Schemas, UNMARKED};
pub use category::{Category, BREED_KIND, BREED_UNKNOWN, CATEGORY_KIND, UNTAGGED};
pub use coord::{Coord, Delta};
pub use events::{ChangeEvent, ChangeKind, Listener, Scope};
pub use feature::{Feature, Rgb, COLOR_SELECTED};
pub use geometry::EXTEND_MARGIN;
pub use ids::{AnnotationId, ListenerId};
pub use rect::Rect;
pub use space::{Absolute, Relative};
pub use tree::AnnotationTree;
