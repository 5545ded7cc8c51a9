use crate::crawlers::crawler::PostFetcher;
use crate::error::{BackupError, Result};
use crate::parsers::{ArticleExtractor, ReadabilityExtractor, extract_post};
use crate::results::PostRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Fetches posts with plain HTTP GETs; posts need no JavaScript to render
#[derive(Clone)]
pub struct HttpPostFetcher {
    client: Client,
    extractor: Arc<dyn ArticleExtractor>,
}

impl HttpPostFetcher {
    /// Create a fetcher that extracts with Readability
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(BackupError::HttpClient)?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            extractor: Arc::new(ReadabilityExtractor),
        }
    }

    /// Swap the content extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn ArticleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let to_fetch_error = |source| BackupError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(to_fetch_error)?;

        response.text().await.map_err(to_fetch_error)
    }
}

#[async_trait]
impl PostFetcher for HttpPostFetcher {
    async fn fetch_post(&self, url: &str) -> Result<PostRecord> {
        let worker_start = std::time::Instant::now();
        ::log::debug!("FETCH: {}", url);

        let html = self.fetch_html(url).await?;
        let record = extract_post(&html, url, self.extractor.as_ref())?;

        ::log::debug!(
            "Extracted \"{}\" from {} in {:.2} seconds",
            record.title,
            url,
            worker_start.elapsed().as_secs_f64()
        );
        Ok(record)
    }
}
