use clap::Parser;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("{}", e);
            return;
        }
    };

    println!("Note: listing pages are loaded through a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using {}",
        config.webdriver_url
    );

    let start_time = std::time::Instant::now();
    match blog_backup::backup_blog(&config).await {
        Ok(stats) => {
            ::log::info!(
                "Backup complete - {} listing pages, {} new posts, {} posts archived in {:.2} seconds",
                stats.pages_visited,
                stats.posts_added,
                stats.archive_size,
                start_time.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            // Failures end the process like a normal finish, the log is the only signal
            ::log::error!("Backup failed: {}", e);
        }
    }
}
