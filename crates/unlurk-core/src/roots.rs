//! Root selection: which candidate threads are still young enough to show.

use std::sync::Arc;

use crate::frontpage::FrontPageTimes;
use crate::item::{Item, ItemId};

/// A selected root thread with its effective time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub item: Arc<Item>,

    /// Creation time, or the later listing time when the item was promoted.
    pub time: i64,
}

impl Root {
    pub fn new(item: Arc<Item>, time: i64) -> Self {
        Self { item, time }
    }

    pub fn id(&self) -> ItemId {
        self.item.id
    }

    /// Whether the effective time comes from a second-chance promotion.
    pub fn second_chance(&self) -> bool {
        self.time != self.item.time
    }
}

/// Effective time of `item`: the listing time when it is later than creation.
pub fn effective_time(item: &Item, front_page_times: &FrontPageTimes) -> i64 {
    match front_page_times.get(&item.id) {
        Some(&listed) if listed > item.time => listed,
        _ => item.time,
    }
}

/// Keep candidates whose effective time is after `aged_after` (unix seconds), newest
/// first with ties broken by id descending.
pub fn select_roots(
    candidates: &[Arc<Item>],
    front_page_times: &FrontPageTimes,
    aged_after: i64,
) -> Vec<Root> {
    let mut roots: Vec<Root> = candidates
        .iter()
        .map(|item| Root::new(Arc::clone(item), effective_time(item, front_page_times)))
        .filter(|root| root.time > aged_after)
        .collect();

    roots.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| b.id().cmp(&a.id())));
    roots
}
