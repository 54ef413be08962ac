//! Second-chance time resolution from the public listing page.
//!
//! The resolver scrapes the listing at most once per TTL window (one minute by default),
//! coalescing concurrent callers onto a single request, and returns the effective time
//! of every listed item after drift correction. See [`extract`] for the heuristic.

pub mod extract;
mod http;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::coalesce::CoalescedFetch;
use crate::config::UnlurkConfig;
use crate::error::UnlurkResult;

pub use extract::{correct_drift, extract_times, parse_age, FrontPageTimes};
use http::ListingClient;

/// Outcome of a resolution that degrades instead of failing.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Effective listing times; empty when degraded.
    pub times: Arc<FrontPageTimes>,

    /// Set when the listing could not be fetched or parsed.
    pub degraded: bool,
}

/// Scrapes the listing page for promoted (second-chance) item times.
#[derive(Debug)]
pub struct FrontPageTimeResolver {
    listing: ListingClient,
    fetch: CoalescedFetch<Arc<FrontPageTimes>>,
    drift_threshold: Duration,
}

impl FrontPageTimeResolver {
    pub fn new(config: &UnlurkConfig, clock: Arc<dyn Clock>) -> UnlurkResult<Self> {
        config.validate()?;

        Ok(Self {
            listing: ListingClient::new(&config.front_page_url, config.timeout())?,
            fetch: CoalescedFetch::new(clock, config.front_page_ttl()),
            drift_threshold: config.drift_threshold(),
        })
    }

    /// Bound each scrape; on expiry every waiter fails with the same cancellation error.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.fetch = self.fetch.with_deadline(deadline);
        self
    }

    pub fn url(&self) -> &str {
        self.listing.url()
    }

    /// Effective listing times, fetched at most once per TTL window.
    ///
    /// `now` anchors the relative ages on the page; callers joining an in-flight scrape
    /// share the `now` of the caller that started it.
    pub async fn resolve_times(&self, now: DateTime<Utc>) -> UnlurkResult<Arc<FrontPageTimes>> {
        let listing = self.listing.clone();
        let threshold = self.drift_threshold;

        self.fetch
            .fetch(move || async move {
                let body = listing.fetch_body().await?;
                let times = extract_times(&body, now, threshold)?;
                info!(url = %listing.url(), items = times.len(), "resolved front page times");
                Ok(Arc::new(times))
            })
            .await
    }

    /// Like [`resolve_times`](Self::resolve_times), but degrades to an empty mapping on failure.
    pub async fn resolve_or_degrade(&self, now: DateTime<Utc>) -> Resolution {
        match self.resolve_times(now).await {
            Ok(times) => Resolution {
                times,
                degraded: false,
            },
            Err(e) => {
                warn!(error = %e, url = %self.listing.url(), "second-chance resolution unavailable");
                Resolution {
                    times: Arc::default(),
                    degraded: true,
                }
            }
        }
    }

    /// Drop the cached listing so the next call scrapes again.
    pub fn invalidate(&self) {
        self.fetch.invalidate();
    }
}
