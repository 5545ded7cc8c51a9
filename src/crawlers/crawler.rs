use crate::error::Result;
use crate::results::PostRecord;
use async_trait::async_trait;
use url::Url;

/// A listing page as the browser currently shows it
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// URL after redirects
    pub url: Url,
    /// Rendered page source
    pub html: String,
}

/// Browser-like page that can be pointed at listing pages
#[async_trait]
pub trait ListingBrowser: Send {
    /// Navigate to `url` and wait for the page to finish loading
    async fn visit(&mut self, url: &str) -> Result<()>;

    /// Source of the page loaded by the last `visit`
    async fn current_page(&mut self) -> Result<LoadedPage>;

    /// Release the browser session
    async fn close(&mut self) -> Result<()>;
}

/// Fetches a single post page and turns it into a record
#[async_trait]
pub trait PostFetcher: Send + Sync + 'static {
    async fn fetch_post(&self, url: &str) -> Result<PostRecord>;
}
