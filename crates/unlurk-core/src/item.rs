//! Item model and the parent → children grouping.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{UnlurkError, UnlurkResult};

/// Item id as assigned by the upstream item API.
pub type ItemId = u64;

/// Kind of item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Story,
    Comment,
    Job,
    Poll,
    Pollopt,
}

/// A story or comment. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    /// Item id.
    pub id: ItemId,

    /// Author handle (empty for deleted items).
    #[serde(default)]
    pub by: String,

    /// Creation time (unix seconds).
    #[serde(default)]
    pub time: i64,

    /// Parent id; `None` for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,

    #[serde(default, rename = "type")]
    pub kind: ItemKind,

    #[serde(default)]
    pub dead: bool,

    #[serde(default)]
    pub deleted: bool,

    /// Story title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Comment or self-post body (HTML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Item {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the item still carries content (neither dead nor deleted).
    pub fn is_live(&self) -> bool {
        !self.dead && !self.deleted
    }
}

/// Cache key comparing items by identity (id) rather than content.
///
/// Two separate fetches of the same id resolve to the same key.
#[derive(Debug, Clone)]
pub struct ItemKey(pub Arc<Item>);

impl ItemKey {
    pub fn item(&self) -> &Item {
        &self.0
    }
}

impl PartialEq for ItemKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ItemKey {}

impl Hash for ItemKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl From<Arc<Item>> for ItemKey {
    fn from(item: Arc<Item>) -> Self {
        Self(item)
    }
}

/// Unordered collection of fetched items.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: HashMap<ItemId, Arc<Item>>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any earlier fetch of the same id.
    pub fn insert(&mut self, item: Arc<Item>) {
        self.items.insert(item.id, item);
    }

    pub fn get(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Item>> {
        self.items.values()
    }

    /// Group items by parent id.
    ///
    /// Returns the grouping (children sorted by id) and the parentless items sorted by id.
    /// An item listed as its own parent is rejected.
    pub fn group_by_parent(&self) -> UnlurkResult<(ItemGraph, Vec<Arc<Item>>)> {
        let mut children: HashMap<ItemId, Vec<Arc<Item>>> = HashMap::new();
        let mut roots = Vec::new();

        for item in self.items.values() {
            match item.parent {
                Some(parent) if parent == item.id => {
                    return Err(UnlurkError::parse(format!(
                        "item {} lists itself as parent",
                        item.id
                    )));
                }
                Some(parent) => children.entry(parent).or_default().push(Arc::clone(item)),
                None => roots.push(Arc::clone(item)),
            }
        }

        for siblings in children.values_mut() {
            siblings.sort_by_key(|item| item.id);
        }
        roots.sort_by_key(|item| item.id);

        Ok((ItemGraph { children }, roots))
    }
}

impl FromIterator<Arc<Item>> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Arc<Item>>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Parent id → direct children, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct ItemGraph {
    children: HashMap<ItemId, Vec<Arc<Item>>>,
}

impl ItemGraph {
    /// Children of `id` in stored order; empty for leaves and unknown ids.
    pub fn children(&self, id: ItemId) -> &[Arc<Item>] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of parents with at least one child.
    pub fn parent_count(&self) -> usize {
        self.children.len()
    }
}
