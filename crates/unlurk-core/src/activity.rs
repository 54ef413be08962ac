//! Activity classification over a discussion tree.
//!
//! A tree is first flattened into a depth-annotated pre-order sequence, then each node
//! is marked:
//!
//! - `SELF` when the node itself was posted after the cutoff and is neither dead nor deleted;
//! - `CHILD` when any node below it, at any depth, carries `SELF`.
//!
//! Nodes with an empty mark are rendered as placeholders (no text). The traversal root is
//! always rendered, whatever its mark.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::item::{Item, ItemGraph, ItemId};
use crate::roots::Root;

/// Bitset over {SELF, CHILD}.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActivityMark(u8);

impl ActivityMark {
    /// Neither the node nor anything below it is fresh.
    pub const INERT: Self = Self(0);
    /// The node itself is fresh.
    pub const SELF: Self = Self(0b01);
    /// Some descendant is fresh.
    pub const CHILD: Self = Self(0b10);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_inert(self) -> bool {
        self.0 == 0
    }

    pub fn is_self(self) -> bool {
        self.contains(Self::SELF)
    }

    pub fn has_active_child(self) -> bool {
        self.contains(Self::CHILD)
    }
}

impl BitOr for ActivityMark {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ActivityMark {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ActivityMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_self(), self.has_active_child()) {
            (false, false) => f.write_str("INERT"),
            (true, false) => f.write_str("SELF"),
            (false, true) => f.write_str("CHILD"),
            (true, true) => f.write_str("SELF|CHILD"),
        }
    }
}

/// One node of a flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedNode {
    pub item: Arc<Item>,

    /// Distance from the traversal root (0 for the root).
    pub depth: usize,

    /// Time shown for the node; the root's effective time when flattened from a [`Root`].
    pub display_time: i64,
}

impl FlattenedNode {
    pub fn id(&self) -> ItemId {
        self.item.id
    }
}

/// Depth-first pre-order flattening of the subtree under `root`.
///
/// Children are visited in the graph's stored order. Ids missing from the graph are
/// leaves; an id already visited in this traversal is skipped.
pub fn flatten(root: &Arc<Item>, graph: &ItemGraph) -> Vec<FlattenedNode> {
    let mut flat = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(Arc::clone(root), 0usize)];

    while let Some((item, depth)) = stack.pop() {
        if !visited.insert(item.id) {
            continue;
        }

        // Reversed so the first child is popped next
        for child in graph.children(item.id).iter().rev() {
            stack.push((Arc::clone(child), depth + 1));
        }

        flat.push(FlattenedNode {
            display_time: item.time,
            item,
            depth,
        });
    }

    flat
}

/// Flatten a selected root, showing its effective (possibly promoted) time.
pub fn flatten_root(root: &Root, graph: &ItemGraph) -> Vec<FlattenedNode> {
    let mut flat = flatten(&root.item, graph);
    if let Some(first) = flat.first_mut() {
        first.display_time = root.time;
    }
    flat
}

/// Whether `item` counts as fresh for the given cutoff (unix seconds).
pub fn is_fresh(item: &Item, active_after: i64) -> bool {
    item.time > active_after && item.is_live()
}

/// Marks for one flattened tree.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    root: Option<ItemId>,
    marks: HashMap<ItemId, ActivityMark>,
    active_authors: Vec<String>,
}

impl Classification {
    /// Computed mark for `id` (inert for unknown ids).
    pub fn mark(&self, id: ItemId) -> ActivityMark {
        self.marks.get(&id).copied().unwrap_or_default()
    }

    /// Whether the node's text should be rendered: always for the traversal root,
    /// otherwise when the mark is not inert.
    pub fn is_renderable(&self, id: ItemId) -> bool {
        self.root == Some(id) || !self.mark(id).is_inert()
    }

    pub fn root(&self) -> Option<ItemId> {
        self.root
    }

    /// Distinct authors of fresh nodes, in first-seen pre-order.
    pub fn active_authors(&self) -> &[String] {
        &self.active_authors
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Classify a pre-order sequence as produced by [`flatten`].
///
/// The first node is treated as the traversal root. `CHILD` is computed bottom-up:
/// walking the sequence backwards, every descendant of a node has been seen by the
/// time the node itself is reached.
pub fn classify(nodes: &[FlattenedNode], active_after: i64) -> Classification {
    let mut marks = HashMap::with_capacity(nodes.len());
    // fresh_below[d]: some node at depth >= d seen since the last node at depth < d was
    // fresh (itself or below)
    let mut fresh_below: Vec<bool> = Vec::new();

    for node in nodes.iter().rev() {
        let d = node.depth;
        let child_fresh = fresh_below.get(d + 1).copied().unwrap_or(false);
        fresh_below.truncate(d + 1);
        if fresh_below.len() < d + 1 {
            fresh_below.resize(d + 1, false);
        }

        let mut mark = ActivityMark::INERT;
        if is_fresh(&node.item, active_after) {
            mark |= ActivityMark::SELF;
        }
        if child_fresh {
            mark |= ActivityMark::CHILD;
        }

        fresh_below[d] |= !mark.is_inert();
        marks.insert(node.id(), mark);
    }

    let mut seen = HashSet::new();
    let active_authors = nodes
        .iter()
        .filter(|n| marks.get(&n.id()).is_some_and(|m| m.is_self()))
        .filter(|n| !n.item.by.is_empty() && seen.insert(n.item.by.as_str()))
        .map(|n| n.item.by.clone())
        .collect();

    Classification {
        root: nodes.first().map(FlattenedNode::id),
        marks,
        active_authors,
    }
}
