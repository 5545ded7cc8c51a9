use crate::archive::{Archive, ArchiveStore};
use crate::config::{BackupConfig, BlogSite};
use crate::crawlers::{ListingBrowser, PostFetcher};
use crate::error::{BackupError, Result};
use crate::filter::PostUrlFilter;
use crate::operator::{Decision, OperatorDecision};
use crate::parsers::scan_listing;
use crate::results::{PageOutcome, RunStats};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Where a backup run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Nothing loaded yet
    Init,
    /// Visiting a listing page and backing up its posts
    CrawlingPage { url: String },
    /// Choosing whether to follow the older-posts link
    DecidingContinue(PageOutcome),
    /// Sorting and writing the archive
    Finalizing,
    Done,
}

/// Mutable state threaded through one run
struct RunContext {
    archive: Arc<Mutex<Archive>>,
    pages_without_new_posts: usize,
    stats: RunStats,
}

/// Incremental backup of one blog into a JSON archive.
///
/// Listing pages are visited one at a time, newest first. Every post linked
/// from a page is fetched concurrently and merged into the archive by title.
/// When a page brings nothing new the operator is asked whether to keep
/// paging back.
pub struct BlogBackup<B, F, O> {
    site: BlogSite,
    filter: PostUrlFilter,
    store: ArchiveStore,
    browser: B,
    fetcher: Arc<F>,
    operator: O,
    max_concurrency: Option<usize>,
    isolate_post_failures: bool,
}

impl<B, F, O> BlogBackup<B, F, O>
where
    B: ListingBrowser,
    F: PostFetcher,
    O: OperatorDecision,
{
    /// Create a backup of `site` into `backup.json` with default settings
    pub fn new(site: BlogSite, browser: B, fetcher: F, operator: O) -> Result<Self> {
        let filter = PostUrlFilter::new(&site)
            .map_err(|e| BackupError::Config(format!("invalid post URL pattern: {}", e)))?;

        Ok(Self {
            site,
            filter,
            store: ArchiveStore::new("backup.json"),
            browser,
            fetcher: Arc::new(fetcher),
            operator,
            max_concurrency: None,
            isolate_post_failures: false,
        })
    }

    /// Create a backup using everything `config` specifies
    pub fn from_config(
        config: &BackupConfig,
        browser: B,
        fetcher: F,
        operator: O,
    ) -> Result<Self> {
        Ok(Self::new(config.site()?, browser, fetcher, operator)?
            .with_backup_file(config.backup_file.clone())
            .with_max_concurrency(config.max_concurrency)
            .with_isolated_post_failures(config.isolate_post_failures))
    }

    /// Set the archive file
    pub fn with_backup_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = ArchiveStore::new(path);
        self
    }

    /// Bound concurrent post fetches per page; `None` fetches all at once
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Skip posts that fail instead of ending the run
    pub fn with_isolated_post_failures(mut self, isolate: bool) -> Self {
        self.isolate_post_failures = isolate;
        self
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Runs the backup to completion.
    ///
    /// The archive file is only written once the crawl has finished, so a
    /// failed run leaves the previous backup untouched.
    pub async fn run(&mut self) -> Result<RunStats> {
        let mut ctx = RunContext {
            archive: Arc::new(Mutex::new(Archive::new())),
            pages_without_new_posts: 0,
            stats: RunStats::default(),
        };

        let mut state = RunState::Init;
        while state != RunState::Done {
            state = match self.step(state, &mut ctx).await {
                Ok(next) => next,
                Err(e) => {
                    self.release_browser().await;
                    return Err(e);
                }
            };
        }

        Ok(ctx.stats)
    }

    async fn step(&mut self, state: RunState, ctx: &mut RunContext) -> Result<RunState> {
        ::log::trace!("Run state: {:?}", state);

        match state {
            RunState::Init => {
                let archive = self.store.load();
                *ctx.archive.lock().await = archive;

                ::log::info!("Starting backup of {}", self.site.base_url);
                Ok(RunState::CrawlingPage {
                    url: self.site.base_url.to_string(),
                })
            }

            RunState::CrawlingPage { url } => {
                if ctx.stats.pages_visited > 0 {
                    ::log::info!(
                        "Older posts has been clicked {} times",
                        ctx.stats.pages_visited
                    );
                }

                self.browser.visit(&url).await?;
                ctx.stats.pages_visited += 1;

                let outcome = self.scrape_current_page(ctx).await?;
                Ok(RunState::DecidingContinue(outcome))
            }

            RunState::DecidingContinue(outcome) => {
                let Some(next_page) = outcome.next_page else {
                    ::log::info!("No older posts link, reached the end of the blog");
                    return Ok(RunState::Finalizing);
                };

                if outcome.new_posts > 0 {
                    ctx.pages_without_new_posts = 0;
                    return Ok(RunState::CrawlingPage { url: next_page });
                }

                ctx.pages_without_new_posts += 1;
                match self.operator.decide(ctx.pages_without_new_posts).await? {
                    Decision::Stop => {
                        ::log::info!("Stopping at operator request");
                        ctx.stats.stopped_by_operator = true;
                        Ok(RunState::Finalizing)
                    }
                    Decision::Continue => {
                        ctx.pages_without_new_posts = 0;
                        Ok(RunState::CrawlingPage { url: next_page })
                    }
                }
            }

            RunState::Finalizing => {
                self.release_browser().await;

                let mut archive = ctx.archive.lock().await;
                archive.sort_by_id_desc();
                self.store.save(&archive)?;

                ctx.stats.archive_size = archive.len();
                ::log::info!("Added {} posts to backup.", ctx.stats.posts_added);
                Ok(RunState::Done)
            }

            RunState::Done => Ok(RunState::Done),
        }
    }

    /// Backs up every post linked from the loaded listing page
    async fn scrape_current_page(&mut self, ctx: &mut RunContext) -> Result<PageOutcome> {
        let page = self.browser.current_page().await?;
        let scan = scan_listing(&page.html, &page.url, &self.filter);

        let new_posts = self.fetch_and_merge(scan.post_links, &ctx.archive).await?;
        ctx.stats.posts_added += new_posts;
        ::log::info!("Found {} new posts to backup", new_posts);

        Ok(PageOutcome {
            next_page: scan.next_page,
            new_posts,
        })
    }

    /// Fetches all `links` concurrently and waits for every one to settle.
    ///
    /// Returns how many were new. Unless failures are isolated, the first
    /// failed post is returned as the page's error once the batch is done.
    async fn fetch_and_merge(
        &self,
        links: Vec<String>,
        archive: &Arc<Mutex<Archive>>,
    ) -> Result<usize> {
        let semaphore = self
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let mut tasks = JoinSet::new();

        for link in links {
            let fetcher = Arc::clone(&self.fetcher);
            let archive = Arc::clone(archive);
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = match &semaphore {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };

                let result = match fetcher.fetch_post(&link).await {
                    // Check and append under one lock so equal titles can't both land
                    Ok(record) => Ok(archive.lock().await.merge_if_new(record)),
                    Err(e) => Err(e),
                };
                (link, result)
            });
        }

        let mut new_posts = 0;
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (link, result) = match joined {
                Ok(settled) => settled,
                Err(e) => (String::from("<unknown>"), Err(BackupError::Task(e))),
            };

            match result {
                Ok(true) => new_posts += 1,
                Ok(false) => {}
                Err(e) if self.isolate_post_failures => {
                    ::log::warn!("Skipping post {}: {}", link, e);
                }
                Err(e) => {
                    ::log::error!("Failed to back up post {}: {}", link, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(new_posts),
        }
    }

    async fn release_browser(&mut self) {
        if let Err(e) = self.browser.close().await {
            ::log::warn!("Failed to release browser: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawlers::LoadedPage;
    use crate::operator::Scripted;
    use crate::results::PostRecord;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    const BASE: &str = "https://myblog.blogspot.com/";

    fn page_url(n: usize) -> String {
        if n == 0 {
            BASE.to_string()
        } else {
            format!("{}search?updated-max={}", BASE, n)
        }
    }

    fn post_url(n: usize) -> String {
        format!("{}2023/01/post-{}.html", BASE, n)
    }

    fn record(n: usize) -> PostRecord {
        PostRecord::new(
            Some(n.to_string()),
            format!("Post {} ({})", n, n),
            format!("Body {}", n),
            post_url(n),
            None,
        )
    }

    /// Listing pages served from memory
    #[derive(Default)]
    struct FakeBrowser {
        pages: HashMap<String, String>,
        current: Option<String>,
        visits: Vec<String>,
        closed: bool,
    }

    impl FakeBrowser {
        /// One listing page per entry, each linking the given posts and the next page
        fn with_listings(listings: &[Vec<usize>]) -> Self {
            let mut browser = Self::default();
            for (i, posts) in listings.iter().enumerate() {
                let mut html = String::from("<html><body>");
                for n in posts {
                    html.push_str(&format!("<a href=\"{}\">post</a>", post_url(*n)));
                }
                html.push_str("<a href=\"https://myblog.blogspot.com/p/about.html\">About</a>");
                if i + 1 < listings.len() {
                    html.push_str(&format!(
                        "<a id=\"Blog1_blog-pager-older-link\" href=\"{}\">Older Posts</a>",
                        page_url(i + 1)
                    ));
                }
                html.push_str("</body></html>");
                browser.pages.insert(page_url(i), html);
            }
            browser
        }
    }

    #[async_trait]
    impl ListingBrowser for FakeBrowser {
        async fn visit(&mut self, url: &str) -> Result<()> {
            self.visits.push(url.to_string());
            if !self.pages.contains_key(url) {
                return Err(BackupError::NavigationTimeout {
                    url: url.to_string(),
                    secs: 30,
                });
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn current_page(&mut self) -> Result<LoadedPage> {
            let url = self.current.clone().ok_or(BackupError::SessionClosed)?;
            Ok(LoadedPage {
                url: Url::parse(&url).unwrap(),
                html: self.pages[&url].clone(),
            })
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    /// Returns `record(n)` for `post_url(n)`
    #[derive(Default)]
    struct FakeFetcher {
        failing: HashSet<String>,
        fetched: AtomicUsize,
    }

    #[async_trait]
    impl PostFetcher for FakeFetcher {
        async fn fetch_post(&self, url: &str) -> Result<PostRecord> {
            self.fetched.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(url) {
                return Err(BackupError::Extract {
                    url: url.to_string(),
                    reason: "broken page".to_string(),
                });
            }
            let n = url
                .trim_start_matches(&format!("{}2023/01/post-", BASE))
                .trim_end_matches(".html")
                .parse()
                .unwrap();
            Ok(record(n))
        }
    }

    fn backup(
        dir: &tempfile::TempDir,
        browser: FakeBrowser,
        fetcher: FakeFetcher,
        operator: Scripted,
    ) -> BlogBackup<FakeBrowser, FakeFetcher, Scripted> {
        BlogBackup::new(BlogSite::parse("myblog").unwrap(), browser, fetcher, operator)
            .unwrap()
            .with_backup_file(dir.path().join("backup.json"))
    }

    fn saved_titles(dir: &tempfile::TempDir) -> Vec<String> {
        ArchiveStore::new(dir.path().join("backup.json"))
            .load()
            .into_posts()
            .into_iter()
            .map(|p| p.title)
            .collect()
    }

    #[tokio::test]
    async fn test_prompts_once_after_empty_page_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        // New-post counts per page: 3, 0, 5
        let browser = FakeBrowser::with_listings(&[vec![1, 2, 3], vec![1, 2], vec![4, 5, 6, 7, 8]]);
        let mut run = backup(&dir, browser, FakeFetcher::default(), Scripted::default());

        let stats = run.run().await.unwrap();

        assert_eq!(run.operator().times_asked(), 1);
        assert_eq!(run.browser().visits.len(), 3);
        assert_eq!(stats.pages_visited, 3);
        assert_eq!(stats.posts_added, 8);
        assert_eq!(stats.archive_size, 8);
        assert!(!stats.stopped_by_operator);
    }

    #[tokio::test]
    async fn test_each_empty_page_prompts_when_continuing() {
        let dir = tempfile::tempdir().unwrap();
        // New-post counts per page: 3, 0, 0, 5
        // Two prompts, not one: a "continue" answer resets the streak
        let browser = FakeBrowser::with_listings(&[
            vec![1, 2, 3],
            vec![3],
            vec![2, 1],
            vec![4, 5, 6, 7, 8],
        ]);
        let mut run = backup(
            &dir,
            browser,
            FakeFetcher::default(),
            Scripted::new([Decision::Continue, Decision::Continue]),
        );

        let stats = run.run().await.unwrap();

        assert_eq!(run.operator().times_asked(), 2);
        assert_eq!(stats.pages_visited, 4);
        assert_eq!(stats.posts_added, 8);
    }

    #[tokio::test]
    async fn test_stop_token_finalizes_early() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::with_listings(&[vec![1, 2, 3], vec![1], vec![4, 5]]);
        let mut run = backup(
            &dir,
            browser,
            FakeFetcher::default(),
            Scripted::new([Decision::Stop]),
        );

        let stats = run.run().await.unwrap();

        assert!(stats.stopped_by_operator);
        assert_eq!(stats.pages_visited, 2);
        assert!(run.browser().closed);
        assert_eq!(
            saved_titles(&dir),
            vec!["Post 3 (3)", "Post 2 (2)", "Post 1 (1)"]
        );
    }

    #[tokio::test]
    async fn test_last_page_without_new_posts_does_not_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::with_listings(&[vec![1, 2], vec![2]]);
        let mut run = backup(&dir, browser, FakeFetcher::default(), Scripted::default());

        let stats = run.run().await.unwrap();

        assert_eq!(run.operator().times_asked(), 0);
        assert_eq!(stats.pages_visited, 2);
        assert_eq!(stats.posts_added, 2);
    }

    #[tokio::test]
    async fn test_end_to_end_merges_with_existing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("backup.json"));

        // Post 2 is already archived; a post without an id must sort last
        let untagged = PostRecord::new(
            None,
            "Guest post".to_string(),
            "Hi".to_string(),
            format!("{}2019/01/guest.html", BASE),
            Some("Sunday".to_string()),
        );
        store
            .save(&Archive::from_posts(vec![untagged.clone(), record(2)]))
            .unwrap();

        let browser =
            FakeBrowser::with_listings(&[vec![12, 11, 10], vec![10, 5, 2], vec![1]]);
        let mut run = backup(&dir, browser, FakeFetcher::default(), Scripted::default());

        let stats = run.run().await.unwrap();

        let expected = vec![
            record(12),
            record(11),
            record(10),
            record(5),
            record(2),
            record(1),
            untagged,
        ];
        assert_eq!(store.load().into_posts(), expected);
        assert_eq!(stats.archive_size, expected.len());
        assert_eq!(stats.posts_added, expected.len() - 2);
        assert_eq!(run.operator().times_asked(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_titles_on_one_page_are_added_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut browser = FakeBrowser::with_listings(&[vec![7]]);

        // Same post reachable by two URLs, fetched concurrently
        let mirror = format!("{}2023/02/post-7.html", BASE);
        let html = browser.pages[BASE].replace(
            "</body>",
            &format!("<a href=\"{}\">mirror</a></body>", mirror),
        );
        browser.pages.insert(BASE.to_string(), html);

        struct MirrorFetcher;

        #[async_trait]
        impl PostFetcher for MirrorFetcher {
            async fn fetch_post(&self, url: &str) -> Result<PostRecord> {
                tokio::task::yield_now().await;
                let mut post = record(7);
                post.url = url.to_string();
                Ok(post)
            }
        }

        let mut run = BlogBackup::new(
            BlogSite::parse("myblog").unwrap(),
            browser,
            MirrorFetcher,
            Scripted::default(),
        )
        .unwrap()
        .with_backup_file(dir.path().join("backup.json"));

        let stats = run.run().await.unwrap();
        assert_eq!(stats.posts_added, 1);
        assert_eq!(saved_titles(&dir), vec!["Post 7 (7)"]);
    }

    #[tokio::test]
    async fn test_failed_post_ends_run_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("backup.json"));
        store.save(&Archive::from_posts(vec![record(1)])).unwrap();

        let browser = FakeBrowser::with_listings(&[vec![2, 3, 4], vec![5]]);
        let fetcher = FakeFetcher {
            failing: HashSet::from([post_url(3)]),
            ..FakeFetcher::default()
        };
        let mut run = backup(&dir, browser, fetcher, Scripted::default());

        let err = run.run().await.unwrap_err();

        assert!(matches!(err, BackupError::Extract { .. }));
        // Siblings still settled before the page failed
        assert_eq!(run.fetcher.fetched.load(Ordering::SeqCst), 3);
        assert_eq!(run.browser().visits.len(), 1);
        assert!(run.browser().closed);
        assert_eq!(saved_titles(&dir), vec!["Post 1 (1)"]);
    }

    #[tokio::test]
    async fn test_isolated_failures_skip_bad_posts() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::with_listings(&[vec![2, 3, 4], vec![5]]);
        let fetcher = FakeFetcher {
            failing: HashSet::from([post_url(3)]),
            ..FakeFetcher::default()
        };
        let mut run = backup(&dir, browser, fetcher, Scripted::default())
            .with_isolated_post_failures(true)
            .with_max_concurrency(Some(1));

        let stats = run.run().await.unwrap();

        assert_eq!(stats.posts_added, 3);
        assert_eq!(
            saved_titles(&dir),
            vec!["Post 5 (5)", "Post 4 (4)", "Post 2 (2)"]
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_keeps_previous_archive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("backup.json"));
        store.save(&Archive::from_posts(vec![record(1)])).unwrap();

        let mut browser = FakeBrowser::with_listings(&[vec![2], vec![3]]);
        browser.pages.remove(&page_url(1));
        let mut run = backup(&dir, browser, FakeFetcher::default(), Scripted::default());

        let err = run.run().await.unwrap_err();

        assert!(matches!(err, BackupError::NavigationTimeout { .. }));
        assert!(run.browser().closed);
        assert_eq!(saved_titles(&dir), vec!["Post 1 (1)"]);
    }
}
