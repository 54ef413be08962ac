//! Extraction of per-item times from the listing HTML.
//!
//! Each listed item carries a span like
//!
//! ```text
//! <span class="age" title="2024-05-01T12:00:00 1714564800"><a href="item?id=40001">3 hours ago</a></span>
//! ```
//!
//! The `title` holds the first-seen unix time; the link text is the relative age the
//! listing currently shows. Items pulled back from the second-chance pool keep their old
//! first-seen time while the relative age restarts, so a large drift between the two
//! marks a promotion.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::clock::elapsed;
use crate::error::{UnlurkError, UnlurkResult};
use crate::item::ItemId;

/// Effective listing times keyed by item id (unix seconds).
pub type FrontPageTimes = HashMap<ItemId, i64>;

lazy_static! {
    /// One listed item: first-seen unix time, item id, relative age phrase.
    static ref AGE_SPAN: Regex = Regex::new(
        r#"<span class="age" title="[^"]+\s+(\d+)"><a href="item\?id=(\d+)">([^<]+) ago</a></span>"#
    )
    .unwrap();
    static ref RELATIVE_AGE: Regex =
        Regex::new(r"^\s*(\d+)\s+(minute|minutes|hour|hours|day|days)\s*$").unwrap();
}

/// Parse a relative age phrase such as `"3 hours"` (the trailing "ago" already removed).
pub fn parse_age(phrase: &str) -> UnlurkResult<Duration> {
    let caps = RELATIVE_AGE
        .captures(phrase)
        .ok_or_else(|| UnlurkError::parse(format!("unexpected age format: {phrase:?}")))?;

    let n: u64 = caps[1]
        .parse()
        .map_err(|e| UnlurkError::parse(format!("failed to parse age {phrase:?}: {e}")))?;

    let unit = match &caps[2] {
        "minute" | "minutes" => 60,
        "hour" | "hours" => 60 * 60,
        "day" | "days" => 24 * 60 * 60,
        other => {
            return Err(UnlurkError::parse(format!(
                "unexpected age unit: {other:?}"
            )))
        }
    };

    n.checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| UnlurkError::parse(format!("age out of range: {phrase:?}")))
}

/// Reconcile a first-seen timestamp with the relative age shown next to it.
///
/// Returns `now - age` when `(now - first_seen)` and `age` differ by more than
/// `threshold` in either direction, otherwise `first_seen`.
pub fn correct_drift(
    now: DateTime<Utc>,
    first_seen: i64,
    age: Duration,
    threshold: Duration,
) -> i64 {
    let first_seen_at = DateTime::from_timestamp(first_seen, 0).unwrap_or_default();
    let since_first_seen = elapsed(first_seen_at, now);
    let drift = if since_first_seen >= age {
        since_first_seen - age
    } else {
        age - since_first_seen
    };

    if drift > threshold {
        let age_secs = i64::try_from(age.as_secs()).unwrap_or(i64::MAX);
        now.timestamp().saturating_sub(age_secs)
    } else {
        first_seen
    }
}

/// Extract effective times for every listed item.
///
/// Any malformed fragment fails the whole batch.
pub fn extract_times(
    body: &str,
    now: DateTime<Utc>,
    threshold: Duration,
) -> UnlurkResult<FrontPageTimes> {
    let mut times = FrontPageTimes::new();

    for caps in AGE_SPAN.captures_iter(body) {
        let first_seen: i64 = caps[1]
            .parse()
            .map_err(|e| UnlurkError::parse(format!("failed to parse time {:?}: {e}", &caps[1])))?;
        let id: ItemId = caps[2]
            .parse()
            .map_err(|e| UnlurkError::parse(format!("failed to parse id {:?}: {e}", &caps[2])))?;
        let age = parse_age(&caps[3])?;

        times.insert(id, correct_drift(now, first_seen, age, threshold));
    }

    Ok(times)
}
