use crate::error::{BackupError, Result};
use crate::parsers::html;
use crate::results::PostRecord;
use dom_smoothie::Readability;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Container the blog template renders each post body into
pub const POST_BODY_SELECTOR: &str = ".post-body.entry-content";

/// Header carrying the post's date
pub const DATE_HEADER_SELECTOR: &str = ".date-header";

static POST_BODY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(POST_BODY_SELECTOR).expect("Post body selector should be valid")
});
static DATE_HEADER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(DATE_HEADER_SELECTOR).expect("Date header selector should be valid")
});
static POST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)$").expect("Post id pattern should be valid"));

/// Title and main text picked out of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub text_content: String,
}

/// Readability-style main content extraction
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &str) -> Result<ExtractedArticle>;
}

/// Extraction backed by `dom_smoothie`'s port of Readability
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

impl ArticleExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &str) -> Result<ExtractedArticle> {
        let readability = Readability::new(html, Some(url), None)
            .and_then(|mut reader| reader.parse());

        match readability {
            Ok(article) => Ok(ExtractedArticle {
                title: article.title.to_string(),
                text_content: article.text_content.to_string(),
            }),
            Err(e) => {
                // Readability gives up on pages it cannot score; fall back
                // to the whole document so the post is still archived
                ::log::debug!("Readability failed for {}: {}, using page text", url, e);
                let doc = Html::parse_document(html);
                let title = html::title_text(&doc).ok_or_else(|| BackupError::Extract {
                    url: url.to_string(),
                    reason: "page has no title".to_string(),
                })?;
                Ok(ExtractedArticle {
                    title,
                    text_content: html::body_text(&doc),
                })
            }
        }
    }
}

/// Parses the trailing `(digits)` of a title
pub fn parse_post_id(title: &str) -> Option<String> {
    POST_ID
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Builds a post record from a fetched post page.
///
/// Readability misjudges short posts and drops their body, so the template's
/// post-body container wins whenever the page has one.
pub fn extract_post(
    html: &str,
    url: &str,
    extractor: &dyn ArticleExtractor,
) -> Result<PostRecord> {
    let article = extractor.extract(html, url)?;
    let doc = Html::parse_document(html);

    let content = html::first_text(&doc, &POST_BODY).unwrap_or(article.text_content);
    let date = html::first_text(&doc, &DATE_HEADER);
    let id = parse_post_id(&article.title);

    Ok(PostRecord::new(
        id,
        article.title,
        content,
        url.to_string(),
        date,
    ))
}
