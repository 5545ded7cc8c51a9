use crate::error::{BackupError, Result};
use crate::parsers::post::{ArticleExtractor, ExtractedArticle, parse_post_id};
use crate::parsers::{ReadabilityExtractor, extract_post};

#[cfg(test)]
mod tests {
    use super::*;

    /// Stands in for readability with a fixed answer
    struct FixedExtractor {
        title: &'static str,
        text: &'static str,
    }

    impl ArticleExtractor for FixedExtractor {
        fn extract(&self, _html: &str, _url: &str) -> Result<ExtractedArticle> {
            Ok(ExtractedArticle {
                title: self.title.to_string(),
                text_content: self.text.to_string(),
            })
        }
    }

    struct FailingExtractor;

    impl ArticleExtractor for FailingExtractor {
        fn extract(&self, _html: &str, url: &str) -> Result<ExtractedArticle> {
            Err(BackupError::Extract {
                url: url.to_string(),
                reason: "no article".to_string(),
            })
        }
    }

    const URL: &str = "https://myblog.blogspot.com/2023/05/my-great-post.html";

    #[test]
    fn test_parse_post_id() {
        assert_eq!(parse_post_id("My Great Post (42)").as_deref(), Some("42"));
        assert_eq!(parse_post_id("Untitled Musings"), None);
        // Only a trailing group counts
        assert_eq!(parse_post_id("Part (3) of the story"), None);
        assert_eq!(parse_post_id("Notes (draft)"), None);
        assert_eq!(parse_post_id("(1) and (2)").as_deref(), Some("2"));
    }

    #[test]
    fn test_post_body_overrides_extracted_text() {
        let html = r#"<html><body>
            <h2 class="date-header"><span>Monday, May 1, 2023</span></h2>
            <div class="post-body entry-content">Hello world</div>
        </body></html>"#;
        let extractor = FixedExtractor {
            title: "My Great Post (42)",
            text: "Sidebar noise chosen by readability",
        };

        let record = extract_post(html, URL, &extractor).unwrap();
        assert_eq!(record.id.as_deref(), Some("42"));
        assert_eq!(record.title, "My Great Post (42)");
        assert_eq!(record.content, "Hello world");
        assert_eq!(record.url, URL);
        assert_eq!(record.date.as_deref(), Some("Monday, May 1, 2023"));
    }

    #[test]
    fn test_extracted_text_used_without_post_body() {
        let html = r#"<html><body><div class="post-body">Not the container</div></body></html>"#;
        let extractor = FixedExtractor {
            title: "Untitled Musings",
            text: "Generic article text",
        };

        let record = extract_post(html, URL, &extractor).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.content, "Generic article text");
        assert_eq!(record.date, None);
    }

    #[test]
    fn test_post_body_text_is_verbatim() {
        let html = "<div class=\"post-body entry-content\">\nLine one<br>\nLine <i>two</i>\n</div>";
        let extractor = FixedExtractor { title: "T", text: "" };

        let record = extract_post(html, URL, &extractor).unwrap();
        assert_eq!(record.content, "\nLine one\nLine two\n");
    }

    #[test]
    fn test_extractor_failure_propagates() {
        let err = extract_post("<html></html>", URL, &FailingExtractor).unwrap_err();
        assert!(matches!(err, BackupError::Extract { .. }));
    }

    #[test]
    fn test_readability_short_post_keeps_container_body() {
        let html = r#"<!DOCTYPE html>
            <html><head><title>Short one (7)</title></head>
            <body>
              <div class="date-header"><span>Tuesday, June 6, 2023</span></div>
              <div class="post-body entry-content">Tiny.</div>
            </body></html>"#;

        let record = extract_post(html, URL, &ReadabilityExtractor).unwrap();
        assert_eq!(record.title, "Short one (7)");
        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.content, "Tiny.");
        assert_eq!(record.date.as_deref(), Some("Tuesday, June 6, 2023"));
    }
}
