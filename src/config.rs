use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Suffix shared by every hosted blog
pub const BLOGSPOT_SUFFIX: &str = ".blogspot.com";

/// Configuration for a backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Blog to back up: `myblog`, `myblog.blogspot.com` or `https://myblog.blogspot.com/`
    pub url: String,

    /// Archive file, fully rewritten at the end of every run
    #[serde(default = "default_backup_file")]
    pub backup_file: PathBuf,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// How long a listing page may take to load
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Upper bound on concurrent post fetches per listing page (unbounded if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Log and skip posts that fail to fetch instead of ending the run
    #[serde(default)]
    pub isolate_post_failures: bool,
}

/// Default archive location
fn default_backup_file() -> PathBuf {
    PathBuf::from("backup.json")
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

impl BackupConfig {
    /// Create a new configuration with default values
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            backup_file: default_backup_file(),
            webdriver_url: default_webdriver_url(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            max_concurrency: None,
            isolate_post_failures: false,
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BackupError::Config(format!("malformed config: {}", e)))?;
        Ok(config)
    }

    /// Apply a `WEBDRIVER_URL` value from the environment unless it is unset or empty
    pub fn apply_webdriver_env(&mut self, webdriver_url: Option<String>) {
        if let Some(webdriver_url) = webdriver_url.filter(|url| !url.is_empty()) {
            self.webdriver_url = webdriver_url;
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Resolve the configured `url` into the blog's name and homepage
    pub fn site(&self) -> Result<BlogSite> {
        BlogSite::parse(&self.url)
    }
}

/// Identity of the blog being backed up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogSite {
    /// Subdomain under blogspot.com
    pub name: String,
    /// Homepage, the first listing page
    pub base_url: Url,
}

impl BlogSite {
    /// Accepts a bare blog name, a blogspot host, or a full homepage URL
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(BackupError::Config("blog url is empty".to_string()));
        }

        let host = if input.contains("://") {
            let url = Url::parse(input)
                .map_err(|e| BackupError::Config(format!("invalid blog url {}: {}", input, e)))?;
            url.host_str()
                .ok_or_else(|| BackupError::Config(format!("blog url {} has no host", input)))?
                .to_string()
        } else {
            input.trim_end_matches('/').to_string()
        };

        let name = host
            .strip_suffix(BLOGSPOT_SUFFIX)
            .unwrap_or(&host)
            .to_ascii_lowercase();

        if name.is_empty() || name.contains('/') || name.contains('.') {
            return Err(BackupError::Config(format!(
                "{} is not a blogspot blog",
                input
            )));
        }

        let base_url = Url::parse(&format!("https://{}{}/", name, BLOGSPOT_SUFFIX))
            .map_err(|e| BackupError::Config(format!("invalid blog name {}: {}", name, e)))?;

        Ok(Self { name, base_url })
    }

    /// Host name serving the blog's pages
    pub fn host(&self) -> String {
        format!("{}{}", self.name, BLOGSPOT_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_from_bare_name() {
        let site = BlogSite::parse("myblog").unwrap();
        assert_eq!(site.name, "myblog");
        assert_eq!(site.base_url.as_str(), "https://myblog.blogspot.com/");
        assert_eq!(site.host(), "myblog.blogspot.com");
    }

    #[test]
    fn test_site_from_host_and_url() {
        let from_host = BlogSite::parse("myblog.blogspot.com").unwrap();
        let from_url = BlogSite::parse("https://MyBlog.blogspot.com/").unwrap();
        assert_eq!(from_host, from_url);
        assert_eq!(from_url.name, "myblog");
    }

    #[test]
    fn test_site_rejects_other_hosts() {
        assert!(BlogSite::parse("").is_err());
        assert!(BlogSite::parse("https://example.com/").is_err());
        assert!(BlogSite::parse("foo/bar").is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config = BackupConfig::from_json(r#"{"url": "myblog"}"#).unwrap();
        assert_eq!(config.backup_file, PathBuf::from("backup.json"));
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_concurrency, None);
        assert!(!config.isolate_post_failures);
    }

    #[test]
    fn test_config_requires_url() {
        let err = BackupConfig::from_json(r#"{"backup_file": "x.json"}"#).unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"url": "myblog", "navigation_timeout_secs": 5, "isolate_post_failures": true}"#,
        )
        .unwrap();

        let config = BackupConfig::from_file(&path).unwrap();
        assert_eq!(config.navigation_timeout_secs, 5);
        assert!(config.isolate_post_failures);
    }
}
