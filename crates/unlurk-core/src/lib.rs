//! Surface the Hacker News threads that are active right now.
//!
//! This crate provides:
//!
//! - Activity classification over reply trees (fresh / has fresh descendants / inert)
//! - Root selection with second-chance (re-promoted story) time correction
//! - A coalesced, TTL-cached scrape of the front page for promotion signals
//! - A generic per-entry TTL cache, used for sanitized display text
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use unlurk_core::{
//!     ActiveQuery, ActivityService, FrontPageTimeResolver, SnapshotSource, SystemClock,
//!     UnlurkConfig,
//! };
//!
//! # async fn example() -> unlurk_core::UnlurkResult<()> {
//! let config = UnlurkConfig::from_env();
//! let clock = Arc::new(SystemClock);
//! let resolver = Arc::new(FrontPageTimeResolver::new(&config, clock.clone())?);
//!
//! let source = SnapshotSource::load("items.json").await?;
//! let service = ActivityService::new(source, clock, &config).with_resolver(resolver);
//!
//! let response = service.active(&ActiveQuery::default()).await?;
//! for row in response.rows {
//!     println!("{}{} {}", "  ".repeat(row.depth), row.age, row.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `UNLURK_FRONT_PAGE_URL` | Listing page (default: `https://news.ycombinator.com`) |
//! | `UNLURK_TIMEOUT` | Request timeout in seconds (default: 10) |
//! | `UNLURK_FRONT_PAGE_TTL` | Listing cache lifetime in seconds (default: 60) |
//! | `UNLURK_DRIFT_THRESHOLD` | Promotion drift threshold in seconds (default: 7200) |
//! | `UNLURK_LOOKBACK` | Candidate lookback in seconds (default: one week) |

pub mod activity;
pub mod cache;
pub mod clock;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod format;
pub mod frontpage;
pub mod item;
pub mod roots;
pub mod service;
pub mod source;
pub mod text;

// Re-export main types
pub use activity::{
    classify, flatten, flatten_root, is_fresh, ActivityMark, Classification, FlattenedNode,
};
pub use cache::{CacheEntry, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::CoalescedFetch;
pub use config::UnlurkConfig;
pub use error::{UnlurkError, UnlurkResult};
pub use format::{default_cache_for, pretty_age, pretty_format_duration, sanitize_and_format_title};
pub use frontpage::{FrontPageTimeResolver, FrontPageTimes, Resolution};
pub use item::{Item, ItemGraph, ItemId, ItemKey, ItemKind, ItemSet};
pub use roots::{effective_time, select_roots, Root};
pub use service::{ActiveQuery, ActiveResponse, ActiveRow, ActivityService, TreeRow};
pub use source::{ItemSource, SnapshotSource};
pub use text::TextCache;

/// User agent sent with listing requests.
pub const USER_AGENT: &str = concat!("unlurk/", env!("CARGO_PKG_VERSION"));
