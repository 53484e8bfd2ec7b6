pub mod condition;
pub mod config;
pub mod dnd;
pub mod error;
pub mod field_type;
pub mod field_value;
pub mod ids;
pub mod node;
pub mod palette;
pub mod tree;
pub mod visibility;

pub use condition::{evaluate, ConditionRule, FieldValues, Operator};
pub use config::{FieldConfig, FieldSettings};
pub use dnd::{apply_drop, resolve_position, Bounds, DragPayload, DropAction, DropEvent, DropOutcome};
pub use error::CoreError;
pub use field_type::FieldType;
pub use field_value::FieldValue;
pub use ids::*;
pub use node::{Field, FieldNode, NodePatch};
pub use palette::{Palette, PaletteEntry, PaletteSection};
pub use tree::{DropPosition, FieldIndex, FieldTree, FlatField, Placement};
