//! The schema tree and its structural operations.
//!
//! `FieldTree` is an id-indexed arena built on persistent collections: every
//! operation returns a new tree and leaves the receiver untouched, while the
//! two values share all unmodified structure. Cloning is O(1), so readers can
//! hold a snapshot while the editor keeps mutating.

use std::collections::{HashMap, HashSet};
use std::fmt;

use im::{HashMap as ImHashMap, Vector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::field_type::FieldType;
use crate::ids::FieldId;
use crate::node::{Field, FieldNode, NodePatch};

/// Where a node lands relative to a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Inside => "inside",
        })
    }
}

/// An insertion point: next to, or inside, an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub target: FieldId,
    pub position: DropPosition,
}

impl Placement {
    pub fn new(target: impl Into<FieldId>, position: DropPosition) -> Self {
        Self {
            target: target.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    field: Field,
    parent: Option<FieldId>,
    children: Option<Vector<FieldId>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    slots: ImHashMap<FieldId, Slot>,
    roots: Vector<FieldId>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from its nested form. Fails if any id occurs twice.
    pub fn from_nodes(nodes: Vec<FieldNode>) -> Result<Self, CoreError> {
        let mut tree = Self::new();
        for node in nodes {
            tree.ensure_absent(&node)?;
            let id = tree.register(node, None);
            tree.roots.push_back(id);
        }
        Ok(tree)
    }

    /// The nested form of the whole tree, in root order.
    pub fn to_nodes(&self) -> Vec<FieldNode> {
        self.roots.iter().filter_map(|id| self.subtree(id)).collect()
    }

    /// Parses the JSON document form (an array of nested field nodes).
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: &FieldId) -> Option<&Field> {
        self.slots.get(id).map(|slot| &slot.field)
    }

    /// `None` both for root nodes and for ids not in the tree.
    pub fn parent_of(&self, id: &FieldId) -> Option<&FieldId> {
        self.slots.get(id).and_then(|slot| slot.parent.as_ref())
    }

    /// The ordered child ids of `id`, or `None` if it is absent or has no
    /// child list at all.
    pub fn children_of(&self, id: &FieldId) -> Option<impl Iterator<Item = &FieldId> + '_> {
        self.slots
            .get(id)
            .and_then(|slot| slot.children.as_ref())
            .map(|children| children.iter())
    }

    pub fn roots(&self) -> impl Iterator<Item = &FieldId> + '_ {
        self.roots.iter()
    }

    /// Snapshot of the node `id` with its whole subtree.
    pub fn subtree(&self, id: &FieldId) -> Option<FieldNode> {
        let slot = self.slots.get(id)?;
        let children = slot
            .children
            .as_ref()
            .map(|ids| ids.iter().filter_map(|child| self.subtree(child)).collect());
        Some(FieldNode {
            field: slot.field.clone(),
            children,
        })
    }

    /// Whether `id` is `ancestor` or lies somewhere beneath it.
    pub fn is_within(&self, id: &FieldId, ancestor: &FieldId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Shallow-merges `patch` into the node `id`, wherever it is. The result
    /// equals `self` when `id` is absent.
    pub fn update_node(&self, id: &FieldId, patch: &NodePatch) -> FieldTree {
        self.try_update_node(id, patch).unwrap_or_else(|| self.clone())
    }

    /// Like [`update_node`](Self::update_node), but `None` when nothing changed.
    pub fn try_update_node(&self, id: &FieldId, patch: &NodePatch) -> Option<FieldTree> {
        if !self.slots.contains_key(id) {
            return None;
        }
        let mut next = self.clone();
        let changed = next.slots.get_mut(id)?.field.apply(patch);
        changed.then_some(next)
    }

    /// Removes the node `id` and its entire subtree.
    pub fn remove_node(&self, id: &FieldId) -> FieldTree {
        self.try_remove_node(id).unwrap_or_else(|| self.clone())
    }

    /// Like [`remove_node`](Self::remove_node), but `None` when `id` is absent.
    pub fn try_remove_node(&self, id: &FieldId) -> Option<FieldTree> {
        let parent = self.slots.get(id)?.parent.clone();
        let mut next = self.clone();
        next.unlink(id, parent.as_ref());
        next.drop_subtree(id);
        Some(next)
    }

    /// Inserts `node` (with any subtree it carries).
    ///
    /// Without a placement, or when the placement's target is not in the tree,
    /// the node is appended to the root sequence. `Inside` appends to the
    /// target's children, creating the list if the target has none.
    pub fn insert_node(
        &self,
        node: FieldNode,
        placement: Option<&Placement>,
    ) -> Result<FieldTree, CoreError> {
        self.ensure_absent(&node)?;
        let mut next = self.clone();

        let placement = match placement {
            Some(p) if self.slots.contains_key(&p.target) => Some(p),
            Some(p) => {
                tracing::debug!(target_id = %p.target, "insert target not found, appending to root");
                None
            }
            None => None,
        };

        match placement {
            None => {
                let id = next.register(node, None);
                next.roots.push_back(id);
            }
            Some(Placement {
                target,
                position: DropPosition::Inside,
            }) => {
                let id = next.register(node, Some(target.clone()));
                if let Some(slot) = next.slots.get_mut(target) {
                    slot.children.get_or_insert_with(Vector::new).push_back(id);
                }
            }
            Some(Placement { target, position }) => {
                let parent = self.parent_of(target).cloned();
                let id = next.register(node, parent.clone());
                let siblings = next.siblings_mut(parent.as_ref());
                let index = siblings
                    .iter()
                    .position(|sibling| sibling == target)
                    .map(|i| if *position == DropPosition::After { i + 1 } else { i })
                    .unwrap_or(siblings.len());
                siblings.insert(index, id);
            }
        }

        Ok(next)
    }

    /// Relocates the subtree rooted at `id`: it is snapshotted, removed, and
    /// re-inserted unchanged at `placement`. If the placement target was inside
    /// the moved subtree it no longer exists after removal, and the subtree
    /// lands at the root.
    pub fn move_node(&self, id: &FieldId, placement: Option<&Placement>) -> FieldTree {
        let Some(snapshot) = self.subtree(id) else {
            return self.clone();
        };
        let without = self.remove_node(id);
        match without.insert_node(snapshot, placement) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(field_id = %id, error = %e, "move failed, keeping tree unchanged");
                self.clone()
            }
        }
    }

    // ========================================================================
    // Read-side passes
    // ========================================================================

    /// Every node in pre-order, regardless of depth or visibility.
    pub fn flatten(&self) -> Vec<FlatField<'_>> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<(&FieldId, usize)> = self.roots.iter().rev().map(|id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(slot) = self.slots.get(id) else {
                continue;
            };
            out.push(FlatField {
                field: &slot.field,
                parent: slot.parent.as_ref(),
                depth,
            });
            if let Some(children) = &slot.children {
                stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
            }
        }
        out
    }

    /// Read-only id → field lookup over the flattened tree.
    pub fn index(&self) -> FieldIndex<'_> {
        FieldIndex::new(self.flatten())
    }

    /// Fields a condition block may reference: every value-collecting field
    /// except the block itself, in pre-order.
    pub fn condition_candidates(&self, block_id: &FieldId) -> Vec<FlatField<'_>> {
        self.flatten()
            .into_iter()
            .filter(|flat| flat.field.id != *block_id && flat.field_type().collects_value())
            .collect()
    }

    /// Condition blocks whose rule references an id that is not in the tree.
    pub fn dangling_conditions(&self) -> Vec<&FieldId> {
        self.flatten()
            .into_iter()
            .filter(|flat| {
                flat.field
                    .condition_rule
                    .as_ref()
                    .is_some_and(|rule| !self.contains(&rule.field_id))
            })
            .map(|flat| &flat.field.id)
            .collect()
    }

    /// Checks every field's config and that condition rules only sit on
    /// condition blocks.
    pub fn validate(&self) -> Result<(), CoreError> {
        for flat in self.flatten() {
            flat.field.config.validate()?;
            if flat.field.condition_rule.is_some()
                && flat.field_type() != FieldType::ConditionBlock
            {
                return Err(CoreError::InvalidData(format!(
                    "condition rule on {} field {}",
                    flat.field_type(),
                    flat.field.id
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Arena internals
    // ========================================================================

    fn ensure_absent(&self, node: &FieldNode) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for id in node.ids() {
            if self.slots.contains_key(id) || !seen.insert(id) {
                return Err(CoreError::DuplicateFieldId(id.to_string()));
            }
        }
        Ok(())
    }

    /// Adds `node` and its descendants to the arena without linking `node`
    /// into any sibling list. Returns its id.
    fn register(&mut self, node: FieldNode, parent: Option<FieldId>) -> FieldId {
        let FieldNode { field, children } = node;
        let id = field.id.clone();
        let child_ids = children.map(|children| {
            children
                .into_iter()
                .map(|child| self.register(child, Some(id.clone())))
                .collect::<Vector<_>>()
        });
        self.slots.insert(
            id.clone(),
            Slot {
                field,
                parent,
                children: child_ids,
            },
        );
        id
    }

    fn siblings_mut(&mut self, parent: Option<&FieldId>) -> &mut Vector<FieldId> {
        match parent.and_then(|p| self.slots.get_mut(p)) {
            Some(slot) => slot.children.get_or_insert_with(Vector::new),
            None => &mut self.roots,
        }
    }

    fn unlink(&mut self, id: &FieldId, parent: Option<&FieldId>) {
        let siblings = self.siblings_mut(parent);
        if let Some(index) = siblings.iter().position(|sibling| sibling == id) {
            siblings.remove(index);
        }
    }

    fn drop_subtree(&mut self, id: &FieldId) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.slots.remove(&current) {
                if let Some(children) = slot.children {
                    stack.extend(children);
                }
            }
        }
    }
}

impl Serialize for FieldTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nodes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = Vec::<FieldNode>::deserialize(deserializer)?;
        FieldTree::from_nodes(nodes).map_err(serde::de::Error::custom)
    }
}

/// One entry of the pre-order flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatField<'a> {
    pub field: &'a Field,
    pub parent: Option<&'a FieldId>,
    pub depth: usize,
}

impl<'a> FlatField<'a> {
    pub fn id(&self) -> &'a FieldId {
        &self.field.id
    }

    pub fn field_type(&self) -> FieldType {
        self.field.field_type()
    }
}

/// Flattened fields plus an id lookup, handed to renderers.
#[derive(Debug, Clone)]
pub struct FieldIndex<'a> {
    entries: Vec<FlatField<'a>>,
    by_id: HashMap<&'a FieldId, usize>,
}

impl<'a> FieldIndex<'a> {
    fn new(entries: Vec<FlatField<'a>>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, flat)| (&flat.field.id, i))
            .collect();
        Self { entries, by_id }
    }

    pub fn get(&self, id: &FieldId) -> Option<&FlatField<'a>> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn position(&self, id: &FieldId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatField<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
