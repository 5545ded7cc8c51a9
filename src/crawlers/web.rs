use crate::crawlers::crawler::{ListingBrowser, LoadedPage};
use crate::error::{BackupError, Result};
use async_trait::async_trait;
use fantoccini::error::NewSessionError;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

/// Listing-page browser driven over WebDriver
pub struct WebDriverBrowser {
    client: Option<Client>,
    navigation_timeout: Duration,
}

impl WebDriverBrowser {
    /// Opens a headless session on the WebDriver server at `webdriver_url`,
    /// falling back to the usual local driver ports.
    pub async fn connect(webdriver_url: &str, navigation_timeout: Duration) -> Result<Self> {
        let client = connect_to_webdriver(webdriver_url)
            .await
            .ok_or_else(|| BackupError::WebDriverConnect(webdriver_url.to_string()))?;

        Ok(Self {
            client: Some(client),
            navigation_timeout,
        })
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(BackupError::SessionClosed)
    }
}

#[async_trait]
impl ListingBrowser for WebDriverBrowser {
    async fn visit(&mut self, url: &str) -> Result<()> {
        let client = self.client()?;
        let started = std::time::Instant::now();

        // goto returns once the document has loaded; bound it so a hung page
        // ends the run instead of stalling it
        match timeout(self.navigation_timeout, client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if e.to_string().contains("Unable to find session") {
                    ::log::warn!("Lost WebDriver session while accessing {}", url);
                }
                return Err(BackupError::Navigation {
                    url: url.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                ::log::error!("Timeout loading: {}", url);
                return Err(BackupError::NavigationTimeout {
                    url: url.to_string(),
                    secs: self.navigation_timeout.as_secs(),
                });
            }
        }

        ::log::debug!(
            "Loaded {} in {:.2} seconds",
            url,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn current_page(&mut self) -> Result<LoadedPage> {
        let client = self.client()?;
        let url = client.current_url().await?;
        let html = client.source().await?;
        Ok(LoadedPage { url, html })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            ::log::info!("Releasing browser resources...");
            client.close().await?;
            ::log::info!("Browser resources have been released");
        }
        Ok(())
    }
}

/// Capabilities asking Chrome or Firefox to run without a window
fn headless_capabilities() -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless", "--disable-gpu"] }),
    );
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );
    caps
}

async fn open_session(webdriver_url: &str) -> std::result::Result<Client, NewSessionError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(headless_capabilities());
    builder.connect(webdriver_url).await
}

/// Connects to the WebDriver instance
async fn connect_to_webdriver(webdriver_url: &str) -> Option<Client> {
    // Try to connect to the specified WebDriver URL
    match open_session(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some(client);
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
        }
    }

    // If we couldn't connect, try with common alternative URLs
    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // Selenium and geckodriver default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue; // Skip if it's the same as the one we already tried
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = open_session(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some(client);
        }
    }

    ::log::error!("Failed to connect to any WebDriver servers");
    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    None
}
