// Re-export modules
pub mod archive;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod operator;
pub mod parsers;
pub mod results;
pub mod runner;

// Re-export commonly used types for convenience
pub use archive::{Archive, ArchiveStore};
pub use config::{BackupConfig, BlogSite};
pub use error::{BackupError, Result};
pub use results::{PostRecord, RunStats};
pub use runner::{BlogBackup, RunState};

use crawlers::{HttpPostFetcher, WebDriverBrowser};
use operator::ConsolePrompt;

/// Back up the configured blog with a WebDriver browser, HTTP post fetches
/// and console prompts
pub async fn backup_blog(config: &BackupConfig) -> Result<RunStats> {
    let site = config.site()?;
    ::log::info!("Backing up {} into {}", site.host(), config.backup_file.display());

    let fetcher = HttpPostFetcher::new()?;
    let browser =
        WebDriverBrowser::connect(&config.webdriver_url, config.navigation_timeout()).await?;

    let mut backup = BlogBackup::from_config(config, browser, fetcher, ConsolePrompt::new())?;
    backup.run().await
}
