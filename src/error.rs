use thiserror::Error;

/// Errors raised while backing up a blog
#[derive(Debug, Error)]
pub enum BackupError {
    /// Listing page could not be loaded
    #[error("failed to navigate to {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: fantoccini::error::CmdError,
    },

    /// Listing page did not finish loading in time
    #[error("navigation to {url} timed out after {secs} seconds")]
    NavigationTimeout { url: String, secs: u64 },

    /// No WebDriver session could be opened
    #[error("could not connect to a WebDriver server at {0}")]
    WebDriverConnect(String),

    /// Browser session was used after it was released
    #[error("browser session is closed")]
    SessionClosed,

    /// WebDriver command failed outside of navigation
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP request for a post failed
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Post HTML could not be turned into a record
    #[error("failed to extract post from {url}: {reason}")]
    Extract { url: String, reason: String },

    /// Reading or writing the archive file failed
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive could not be encoded or decoded
    #[error("archive JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A post-fetch task panicked or was cancelled
    #[error("post task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BackupError>;
