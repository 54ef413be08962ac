//! Item source boundary.
//!
//! Fetching items from the upstream API is the source's job; everything above it works on
//! already-fetched [`Item`] values. [`SnapshotSource`] serves a fixed set of items held in
//! memory, loaded from a JSON array.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{UnlurkError, UnlurkResult};
use crate::item::{Item, ItemId, ItemSet};

/// Provider of items and their reply trees.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch items by id. Any missing id is an error.
    async fn get_items(&self, ids: &[ItemId]) -> UnlurkResult<HashMap<ItemId, Arc<Item>>>;

    /// The given items plus every transitive reply.
    async fn get_descendants(&self, items: &[Arc<Item>]) -> UnlurkResult<ItemSet>;

    /// Root items (stories) posted after `posted_after` (unix seconds).
    async fn recent_roots(&self, posted_after: i64) -> UnlurkResult<Vec<Arc<Item>>>;
}

/// In-memory item source.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    items: HashMap<ItemId, Arc<Item>>,
    kids: HashMap<ItemId, Vec<ItemId>>,
}

impl SnapshotSource {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        let mut source = Self::default();
        for item in items {
            if let Some(parent) = item.parent {
                source.kids.entry(parent).or_default().push(item.id);
            }
            source.items.insert(item.id, Arc::new(item));
        }
        source
    }

    /// Parse a JSON array of items.
    pub fn from_json(json: &str) -> UnlurkResult<Self> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Ok(Self::new(items))
    }

    /// Load a JSON array of items from disk.
    pub async fn load(path: impl AsRef<Path>) -> UnlurkResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UnlurkError::InvalidInput {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
        let source = Self::from_json(&json)?;
        debug!(path = %path.display(), items = source.len(), "loaded item snapshot");
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemSource for SnapshotSource {
    async fn get_items(&self, ids: &[ItemId]) -> UnlurkResult<HashMap<ItemId, Arc<Item>>> {
        ids.iter()
            .map(|&id| {
                self.items
                    .get(&id)
                    .map(|item| (id, Arc::clone(item)))
                    .ok_or(UnlurkError::NotFound { id })
            })
            .collect()
    }

    async fn get_descendants(&self, items: &[Arc<Item>]) -> UnlurkResult<ItemSet> {
        let mut set = ItemSet::new();
        let mut queue: Vec<ItemId> = Vec::new();

        for item in items {
            set.insert(Arc::clone(item));
            queue.push(item.id);
        }

        while let Some(id) = queue.pop() {
            for kid in self.kids.get(&id).into_iter().flatten() {
                if set.get(*kid).is_some() {
                    continue;
                }
                let child = self
                    .items
                    .get(kid)
                    .ok_or(UnlurkError::NotFound { id: *kid })?;
                set.insert(Arc::clone(child));
                queue.push(*kid);
            }
        }

        Ok(set)
    }

    async fn recent_roots(&self, posted_after: i64) -> UnlurkResult<Vec<Arc<Item>>> {
        let mut roots: Vec<_> = self
            .items
            .values()
            .filter(|item| item.is_root() && item.time > posted_after)
            .cloned()
            .collect();
        roots.sort_by_key(|item| item.id);
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"[
        {"id": 1, "type": "story", "by": "pg", "time": 1000, "title": "Old"},
        {"id": 2, "type": "story", "by": "dang", "time": 5000, "title": "New"},
        {"id": 3, "type": "comment", "by": "a", "time": 5100, "parent": 2, "text": "hi"},
        {"id": 4, "type": "comment", "by": "b", "time": 5200, "parent": 3, "text": "yo"},
        {"id": 5, "type": "comment", "by": "c", "time": 1100, "parent": 1, "text": "x"}
    ]"#;

    #[tokio::test]
    async fn test_get_items_missing_id() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let found = source.get_items(&[1, 2]).await.unwrap();
        assert_eq!(found.len(), 2);

        let err = source.get_items(&[2, 42]).await.unwrap_err();
        assert_eq!(err, UnlurkError::NotFound { id: 42 });
    }

    #[tokio::test]
    async fn test_get_descendants_transitive() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let root = source.get_items(&[2]).await.unwrap()[&2].clone();

        let all = source.get_descendants(&[root]).await.unwrap();
        let mut ids: Vec<_> = all.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_recent_roots() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let roots = source.recent_roots(2000).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, 2);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        tokio::fs::write(&path, SNAPSHOT).await.unwrap();

        let source = SnapshotSource::load(&path).await.unwrap();
        assert_eq!(source.len(), 5);

        let missing = SnapshotSource::load(dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(UnlurkError::InvalidInput { .. })));
    }

    #[test]
    fn test_malformed_snapshot() {
        let err = SnapshotSource::from_json("{not json").unwrap_err();
        assert!(matches!(err, UnlurkError::ParseFailed { .. }));
    }
}
