//! Display text for items: sanitized titles/comment bodies and compact ages.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::clock::elapsed;
use crate::item::Item;

lazy_static! {
    static ref PARAGRAPH: Regex = Regex::new(r"(?i)<p\s*/?>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref HEX_ENTITY: Regex = Regex::new(r"&#[xX]([0-9a-fA-F]{1,6});").unwrap();
    static ref DEC_ENTITY: Regex = Regex::new(r"&#([0-9]{1,7});").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Title (stories) or body (comments) ready for plain display.
///
/// With `strip_html`, tags are removed (paragraph breaks become newlines) and entities
/// decoded. Dead and deleted items render as a bracketed marker.
pub fn sanitize_and_format_title(item: &Item, strip_html: bool) -> String {
    if item.deleted {
        return "[deleted]".to_string();
    }
    if item.dead {
        return "[dead]".to_string();
    }

    let raw = match (&item.title, &item.text) {
        (Some(title), _) if !title.is_empty() => title.as_str(),
        (_, Some(text)) => text.as_str(),
        _ => "",
    };

    if !strip_html {
        return raw.trim().to_string();
    }

    let text = PARAGRAPH.replace_all(raw, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = BLANK_RUN.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    let text = HEX_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let text = DEC_ENTITY.replace_all(&text, |caps: &regex::Captures<'_>| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // &amp; last so "&amp;lt;" decodes to "&lt;"
    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Compact age such as `"45s"`, `"12m"`, `"3h"` or `"2d"`.
pub fn pretty_format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3_599 => format!("{}m", secs / 60),
        3_600..=86_399 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Age of a unix timestamp relative to `now`.
pub fn pretty_age(time: i64, now: DateTime<Utc>) -> String {
    let then = DateTime::from_timestamp(time, 0).unwrap_or_default();
    pretty_format_duration(elapsed(then, now))
}

/// TTL for cached display text: fresh items may still be edited, old ones are settled.
pub fn default_cache_for(item: &Item, now: DateTime<Utc>) -> Duration {
    const MINUTE: u64 = 60;

    let created = DateTime::from_timestamp(item.time, 0).unwrap_or_default();
    let age = elapsed(created, now).as_secs();

    if age < 5 * MINUTE {
        Duration::ZERO
    } else if age < 60 * MINUTE {
        Duration::from_secs(MINUTE)
    } else if age < 24 * 60 * MINUTE {
        Duration::from_secs(10 * MINUTE)
    } else {
        Duration::from_secs(60 * MINUTE)
    }
}
