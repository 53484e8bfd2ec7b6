//! Turns a drop gesture into a tree mutation.
//!
//! A drop carries a payload (a new field from the palette, or an existing
//! field being moved) and optionally the node under the pointer. The vertical
//! pointer position against that node's bounds decides the placement.

use serde::{Deserialize, Serialize};

use crate::field_type::FieldType;
use crate::ids::FieldId;
use crate::palette::Palette;
use crate::tree::{DropPosition, FieldTree, Placement};

/// Vertical extent of a rendered node, in the same units as the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DragPayload {
    New {
        #[serde(rename = "fieldType")]
        field_type: FieldType,
    },
    Move {
        #[serde(rename = "fieldId")]
        field_id: FieldId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    pub id: FieldId,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropEvent {
    pub payload: DragPayload,
    /// `None` when dropped on empty canvas.
    pub target: Option<DropTarget>,
    pub pointer_y: f64,
}

impl DropEvent {
    pub fn on_canvas(payload: DragPayload) -> Self {
        Self {
            payload,
            target: None,
            pointer_y: 0.0,
        }
    }

    pub fn on_target(payload: DragPayload, target: impl Into<FieldId>, bounds: Bounds, pointer_y: f64) -> Self {
        Self {
            payload,
            target: Some(DropTarget {
                id: target.into(),
                bounds,
            }),
            pointer_y,
        }
    }
}

/// Containers always take the drop inside; anything else splits at its
/// vertical midpoint.
pub fn resolve_position(pointer_y: f64, bounds: &Bounds, is_container: bool) -> DropPosition {
    if is_container {
        DropPosition::Inside
    } else if pointer_y < bounds.midpoint() {
        DropPosition::Before
    } else {
        DropPosition::After
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A field was dropped onto itself.
    SelfDrop,
    /// The field being moved is not in the tree.
    UnknownField,
    /// The palette does not offer the requested type.
    NotInPalette,
    /// The synthesized node collided with an existing id.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    Created(FieldId),
    Moved(FieldId),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone)]
pub struct DropOutcome {
    pub tree: FieldTree,
    pub action: DropAction,
    pub placement: Option<Placement>,
}

impl DropOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self.action, DropAction::Ignored(_))
    }

    fn ignored(tree: &FieldTree, reason: IgnoreReason, placement: Option<Placement>) -> Self {
        Self {
            tree: tree.clone(),
            action: DropAction::Ignored(reason),
            placement,
        }
    }
}

/// The placement a drop event resolves to against `tree`. A target missing
/// from the tree is resolved as a leaf; insertion then falls back to the root.
pub fn resolve_placement(tree: &FieldTree, event: &DropEvent) -> Option<Placement> {
    event.target.as_ref().map(|target| {
        let is_container = tree.get(&target.id).is_some_and(|f| f.is_container());
        Placement {
            target: target.id.clone(),
            position: resolve_position(event.pointer_y, &target.bounds, is_container),
        }
    })
}

/// Applies a drop to `tree`, returning the resulting tree and what happened.
pub fn apply_drop(tree: &FieldTree, palette: &Palette, event: &DropEvent) -> DropOutcome {
    let placement = resolve_placement(tree, event);

    match &event.payload {
        DragPayload::Move { field_id } => {
            if placement.as_ref().is_some_and(|p| p.target == *field_id) {
                return DropOutcome::ignored(tree, IgnoreReason::SelfDrop, placement);
            }
            if !tree.contains(field_id) {
                return DropOutcome::ignored(tree, IgnoreReason::UnknownField, placement);
            }
            let next = tree.move_node(field_id, placement.as_ref());
            tracing::debug!(field_id = %field_id, placement = ?placement, "moved field");
            DropOutcome {
                tree: next,
                action: DropAction::Moved(field_id.clone()),
                placement,
            }
        }
        DragPayload::New { field_type } => {
            let Some(node) = palette.create_field(*field_type, tree) else {
                return DropOutcome::ignored(tree, IgnoreReason::NotInPalette, placement);
            };
            let id = node.id().clone();
            match tree.insert_node(node, placement.as_ref()) {
                Ok(next) => {
                    tracing::debug!(field_id = %id, field_type = %field_type, placement = ?placement, "created field");
                    DropOutcome {
                        tree: next,
                        action: DropAction::Created(id),
                        placement,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "palette drop rejected");
                    DropOutcome::ignored(tree, IgnoreReason::Rejected, placement)
                }
            }
        }
    }
}
