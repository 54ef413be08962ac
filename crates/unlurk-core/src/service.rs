//! Request-level assembly: which threads are active right now, as display rows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::activity::{classify, flatten, Classification, FlattenedNode};
use crate::clock::Clock;
use crate::config::UnlurkConfig;
use crate::error::{UnlurkError, UnlurkResult};
use crate::format::pretty_age;
use crate::frontpage::{FrontPageTimeResolver, Resolution};
use crate::item::ItemId;
use crate::roots::select_roots;
use crate::source::ItemSource;
use crate::text::TextCache;

/// Parameters of an activity request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuery {
    /// Items posted within this window count as fresh.
    pub window: Duration,

    /// Roots whose effective time is older than this are dropped.
    pub max_age: Duration,

    /// Minimum number of distinct fresh authors in a thread.
    pub min_by: usize,

    /// Include author handles in the rows.
    pub show_authors: bool,
}

impl Default for ActiveQuery {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60 * 60),
            max_age: Duration::from_secs(24 * 60 * 60),
            min_by: 3,
            show_authors: true,
        }
    }
}

impl ActiveQuery {
    pub fn validate(&self) -> UnlurkResult<()> {
        if self.window.is_zero() {
            return Err(UnlurkError::InvalidInput {
                message: "window must be positive".to_string(),
            });
        }
        if self.max_age.is_zero() {
            return Err(UnlurkError::InvalidInput {
                message: "max-age must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One node of an active thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub by: String,

    /// Sanitized text; empty for inert placeholder nodes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    pub age: String,
    pub id: ItemId,
    pub depth: usize,

    /// The node itself is fresh.
    #[serde(default, skip_serializing_if = "is_false")]
    pub active: bool,

    /// Root whose time comes from a second-chance promotion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub second_chance: bool,
}

/// Rows for every selected thread, roots in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveResponse {
    pub rows: Vec<ActiveRow>,

    /// Listing times were unavailable; roots use their own creation times.
    #[serde(default)]
    pub second_chance_failed: bool,
}

/// One node of a full item tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub by: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    pub time: i64,
    pub id: ItemId,
    pub depth: usize,
}

/// Computes activity views over an [`ItemSource`].
pub struct ActivityService<S> {
    source: S,
    resolver: Option<Arc<FrontPageTimeResolver>>,
    text_cache: Arc<TextCache>,
    clock: Arc<dyn Clock>,
    lookback: Duration,
}

fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

impl<S: ItemSource> ActivityService<S> {
    /// Service without second-chance resolution; see [`with_resolver`](Self::with_resolver).
    pub fn new(source: S, clock: Arc<dyn Clock>, config: &UnlurkConfig) -> Self {
        Self {
            source,
            resolver: None,
            text_cache: Arc::new(TextCache::new(Arc::clone(&clock))),
            clock,
            lookback: config.lookback(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<FrontPageTimeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share a text cache across services.
    pub fn with_text_cache(mut self, text_cache: Arc<TextCache>) -> Self {
        self.text_cache = text_cache;
        self
    }

    pub fn text_cache(&self) -> &Arc<TextCache> {
        &self.text_cache
    }

    /// Active threads as indented rows.
    ///
    /// Item source failures are fatal; a failed listing scrape only sets
    /// `second_chance_failed`.
    pub async fn active(&self, query: &ActiveQuery) -> UnlurkResult<ActiveResponse> {
        query.validate()?;

        let now = self.clock.now();
        let now_ts = now.timestamp();
        let active_after = now_ts.saturating_sub(secs(query.window));
        let aged_after = now_ts.saturating_sub(secs(query.max_age));

        // Look well past max-age: promoted stories can be days old
        let candidates = self
            .source
            .recent_roots(now_ts.saturating_sub(secs(self.lookback)))
            .await?;
        let all = self.source.get_descendants(&candidates).await?;
        let (graph, _) = all.group_by_parent()?;

        let mut trees: HashMap<ItemId, (Vec<FlattenedNode>, Classification)> = HashMap::new();
        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|root| {
                let flat = flatten(root, &graph);
                let classification = classify(&flat, active_after);
                let keep = classification.active_authors().len() >= query.min_by;
                if keep {
                    trees.insert(root.id, (flat, classification));
                }
                keep
            })
            .collect();
        debug!(candidates = candidates.len(), "threads with enough fresh authors");

        let resolution = match &self.resolver {
            Some(resolver) => resolver.resolve_or_degrade(now).await,
            None => Resolution::default(),
        };

        let roots = select_roots(&candidates, &resolution.times, aged_after);
        let mut rows = Vec::new();

        for root in &roots {
            let Some((flat, classification)) = trees.get(&root.id()) else {
                continue;
            };

            for node in flat {
                let is_root = node.id() == root.id();
                let display_time = if is_root { root.time } else { node.display_time };
                let text = if classification.is_renderable(node.id()) {
                    self.text_cache.text_for(&node.item).to_string()
                } else {
                    String::new()
                };

                rows.push(ActiveRow {
                    by: self.author(&node.item.by, query.show_authors),
                    text,
                    age: pretty_age(display_time, now),
                    id: node.id(),
                    depth: node.depth,
                    active: classification.mark(node.id()).is_self(),
                    second_chance: is_root && root.second_chance(),
                });
            }
        }

        info!(
            roots = roots.len(),
            rows = rows.len(),
            second_chance_failed = resolution.degraded,
            "computed active threads"
        );

        Ok(ActiveResponse {
            rows,
            second_chance_failed: resolution.degraded,
        })
    }

    /// Every node under `id`, with text.
    pub async fn item_tree(&self, id: ItemId, show_authors: bool) -> UnlurkResult<Vec<TreeRow>> {
        let items = self.source.get_items(&[id]).await?;
        let item = items
            .get(&id)
            .cloned()
            .ok_or(UnlurkError::NotFound { id })?;

        let all = self.source.get_descendants(&[Arc::clone(&item)]).await?;
        let (graph, _) = all.group_by_parent()?;

        Ok(flatten(&item, &graph)
            .into_iter()
            .map(|node| TreeRow {
                by: self.author(&node.item.by, show_authors),
                text: self.text_cache.text_for(&node.item).to_string(),
                time: node.item.time,
                id: node.id(),
                depth: node.depth,
            })
            .collect())
    }

    fn author(&self, by: &str, show_authors: bool) -> String {
        if show_authors {
            by.to_string()
        } else {
            String::new()
        }
    }
}

impl<S> std::fmt::Debug for ActivityService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityService")
            .field("resolver", &self.resolver)
            .field("text_cache", &self.text_cache)
            .field("lookback", &self.lookback)
            .finish()
    }
}
