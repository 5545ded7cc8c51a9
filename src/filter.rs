use crate::config::BlogSite;
use regex::Regex;
use url::Url;

/// Decides which links on a listing page are posts of the configured blog
#[derive(Debug, Clone)]
pub struct PostUrlFilter {
    pattern: Regex,
}

impl PostUrlFilter {
    /// Build a filter for `https://<name>.blogspot.com/<digits>/<slug>.html`
    pub fn new(site: &BlogSite) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"^https://{}\.blogspot\.com/\d+/.*\.html$",
            regex::escape(&site.name)
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Determine if an absolute URL is a post page
    pub fn is_post_url(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Keep post URLs only, dropping repeats while preserving page order
    pub fn filter_posts<I, S>(&self, hrefs: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut posts: Vec<String> = Vec::new();
        for href in hrefs {
            let href = href.as_ref();
            if !self.is_post_url(href) {
                ::log::trace!("Not a post link: {}", href);
                continue;
            }
            if posts.iter().any(|seen| seen == href) {
                continue;
            }
            posts.push(href.to_string());
        }
        posts
    }
}

/// Resolve an href the way a browser fills in `a.href`
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|url| url.to_string())
}
