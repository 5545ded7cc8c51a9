use blog_backup::{BackupConfig, BackupError, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blog-backup")]
#[command(about = "Incrementally backs up a blogspot blog into a JSON file")]
#[command(version)]
pub struct Args {
    /// Blog to back up (name, blogspot host, or homepage URL)
    pub url: Option<String>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Archive file to merge into
    #[arg(short, long)]
    pub backup_file: Option<PathBuf>,

    /// WebDriver server used to load listing pages
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Seconds a listing page may take to load
    #[arg(long)]
    pub navigation_timeout: Option<u64>,

    /// Maximum concurrent post fetches per listing page
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Skip posts that fail to fetch instead of ending the run
    #[arg(long)]
    pub skip_failed_posts: bool,
}

impl Args {
    /// Build the run configuration from the config file, environment and flags
    pub fn into_config(self) -> Result<BackupConfig> {
        let webdriver_env = std::env::var("WEBDRIVER_URL").ok();
        self.resolve(webdriver_env)
    }

    /// Layers, lowest precedence first: config file, `WEBDRIVER_URL`, flags
    fn resolve(self, webdriver_env: Option<String>) -> Result<BackupConfig> {
        let mut config = match (&self.config, &self.url) {
            (Some(path), _) => BackupConfig::from_file(path)?,
            (None, Some(url)) => BackupConfig::new(url),
            (None, None) => {
                return Err(BackupError::Config(
                    "a blog url or --config file is required".to_string(),
                ));
            }
        };
        config.apply_webdriver_env(webdriver_env);

        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(backup_file) = self.backup_file {
            config.backup_file = backup_file;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if let Some(secs) = self.navigation_timeout {
            config.navigation_timeout_secs = secs;
        }
        if self.max_concurrency.is_some() {
            config.max_concurrency = self.max_concurrency;
        }
        if self.skip_failed_posts {
            config.isolate_post_failures = true;
        }

        Ok(config)
    }
}
