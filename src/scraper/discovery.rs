use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Detail-page URLs referenced by an index page's "read more" anchors.
///
/// Relative hrefs are resolved against `page_url`. The iterator borrows the
/// document; call again to re-query.
pub fn discover_links<'a>(
    doc: &'a Html,
    read_more: &'a Selector,
    page_url: &'a Url,
) -> impl Iterator<Item = Url> + 'a {
    doc.select(read_more)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(move |href| match page_url.join(href.trim()) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Skipping unresolvable href {:?} on {}: {}", href, page_url, e);
                None
            }
        })
}
