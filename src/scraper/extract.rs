//! Detail-page field extraction.
//!
//! A detail page carries its useful data as prose inside `.inside-article`:
//! paragraphs or `h3`s that start with a fixed marker ("OPEN TO:",
//! "GIVEAWAY END", "STEP 1"). Each container is reduced to a
//! [`RawFieldBundle`] by folding over those elements in document order.

use crate::error::ScrapeResult;
use crate::models::{ELIGIBLE_REGIONS, RawFieldBundle};
use crate::scraper::dates::remaining_millis_or_expired;
use crate::scraper::selector;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const OPEN_TO_MARKER: &str = "OPEN TO:";
pub const GIVEAWAY_END_MARKER: &str = "GIVEAWAY END";
pub const STEP_ONE_MARKER: &str = "STEP 1";

/// Byte offset of the date inside a "GIVEAWAY END: <date>" element.
///
/// Counted from the start of the element text, not from the marker, so any
/// leading whitespace or a different separator shifts the slice.
pub const EXPIRY_OFFSET: usize = 14;

/// Compiled selectors for one crawl.
#[derive(Debug)]
pub struct DetailSelectors {
    container: Selector,
    title: Selector,
    image: Selector,
    blocks: Selector,
    entry_link: Selector,
}

impl DetailSelectors {
    pub fn new() -> ScrapeResult<Self> {
        Ok(Self {
            container: selector(".inside-article")?,
            title: selector(".entry-title")?,
            image: selector(".attachment-full")?,
            blocks: selector("p, h3")?,
            entry_link: selector("span a")?,
        })
    }
}

/// One bundle per `.inside-article` container in the document.
pub fn extract_bundles(
    doc: &Html,
    sels: &DetailSelectors,
    now: DateTime<Utc>,
) -> Vec<RawFieldBundle> {
    doc.select(&sels.container)
        .map(|container| extract_container(container, sels, now))
        .collect()
}

pub fn extract_container(
    container: ElementRef<'_>,
    sels: &DetailSelectors,
    now: DateTime<Utc>,
) -> RawFieldBundle {
    let title = container
        .select(&sels.title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let image_url = container
        .select(&sels.image)
        .next()
        .and_then(|el| el.value().attr("src"))
        .unwrap_or_default()
        .to_string();

    let seed = RawFieldBundle {
        title,
        image_url,
        ..RawFieldBundle::default()
    };

    container
        .select(&sels.blocks)
        .fold(seed, |acc, el| absorb(acc, el, sels, now))
}

/// Fold step: apply every marker found in `el` to the bundle.
///
/// Flags only ever move towards "eligible" and "not expired"; a later element
/// can't undo an earlier match.
fn absorb(
    mut acc: RawFieldBundle,
    el: ElementRef<'_>,
    sels: &DetailSelectors,
    now: DateTime<Utc>,
) -> RawFieldBundle {
    let text: String = el.text().collect();

    if text.contains(OPEN_TO_MARKER) && mentions_eligible_region(&text) {
        acc.is_eligible = true;
    }

    if text.contains(GIVEAWAY_END_MARKER) {
        acc.expires = expiry_text(&text).to_string();
        if remaining_millis_or_expired(&acc.expires, now) >= 0 {
            acc.is_expired = false;
        }
    }

    if text.contains(STEP_ONE_MARKER) {
        match el
            .select(&sels.entry_link)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            Some(href) => acc.link = href.to_string(),
            None => debug!("href attribute not found in {:?}", text.trim()),
        }
    }

    acc
}

pub fn mentions_eligible_region(text: &str) -> bool {
    let lower = text.to_lowercase();
    ELIGIBLE_REGIONS.iter().any(|region| lower.contains(region))
}

/// Everything after the fixed offset; empty if the text is too short or the
/// offset splits a character.
pub fn expiry_text(text: &str) -> &str {
    text.get(EXPIRY_OFFSET..).unwrap_or_default()
}
