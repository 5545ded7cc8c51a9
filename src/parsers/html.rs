use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Anchor selector should be valid"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Title selector should be valid"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("Body selector should be valid"));

/// Raw `href` attributes of every anchor, in document order
pub fn collect_hrefs(doc: &Html) -> Vec<String> {
    let links = doc
        .select(&LINK_SELECTOR)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    // Log the number of links found
    ::log::debug!("HTML parser found {} links", links.len());
    if !links.is_empty() {
        ::log::debug!(
            "First few links: {:?}",
            links.iter().take(5).collect::<Vec<_>>()
        );
    }

    links
}

/// `href` attribute of the first element matching `selector`
pub fn first_href(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(|s| s.to_string())
}

/// Text content of the first element matching `selector`, untouched
pub fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector).next().map(text_content)
}

/// Text of the `<title>` element, trimmed
pub fn title_text(doc: &Html) -> Option<String> {
    first_text(doc, &TITLE_SELECTOR)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Whitespace-normalized text of the `<body>`
pub fn body_text(doc: &Html) -> String {
    doc.select(&BODY_SELECTOR)
        .flat_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concatenated text nodes of an element, like DOM `textContent`
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
