use crate::filter::{PostUrlFilter, resolve_href};
use crate::parsers::html;
use crate::results::ListingScan;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Id of the "Older Posts" anchor in the blog's pager
pub const OLDER_POSTS_LINK_ID: &str = "Blog1_blog-pager-older-link";

static OLDER_POSTS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("#{}", OLDER_POSTS_LINK_ID))
        .expect("Older posts selector should be valid")
});

/// Extracts post links and the older-posts link from a loaded listing page.
///
/// Hrefs are resolved against `page_url` before filtering, matching what a
/// browser reports for `a.href`.
pub fn scan_listing(html: &str, page_url: &Url, filter: &PostUrlFilter) -> ListingScan {
    let doc = Html::parse_document(html);

    let resolved = html::collect_hrefs(&doc)
        .into_iter()
        .filter_map(|href| resolve_href(page_url, &href));
    let post_links = filter.filter_posts(resolved);

    let next_page = html::first_href(&doc, &OLDER_POSTS_SELECTOR)
        .and_then(|href| resolve_href(page_url, &href));

    ::log::info!("Found {} post links on {}", post_links.len(), page_url);
    match &next_page {
        Some(next) => ::log::debug!("Older posts link: {}", next),
        None => ::log::debug!("No older posts link on {}", page_url),
    }

    ListingScan {
        post_links,
        next_page,
    }
}
