use serde::{Deserialize, Deserializer, Serialize};

/// One backed-up blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Trailing `(digits)` of the title, if any
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,

    /// Title of the post, unique within an archive
    pub title: String,

    /// Text of the post body
    pub content: String,

    /// URL the post was fetched from
    #[serde(rename = "URL")]
    pub url: String,

    /// Text of the date header, if the page had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl PostRecord {
    /// Create a new post record
    pub fn new(
        id: Option<String>,
        title: String,
        content: String,
        url: String,
        date: Option<String>,
    ) -> Self {
        Self {
            id,
            title,
            content,
            url,
            date,
        }
    }

    /// Numeric value of `id`, used for ordering
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_deref().and_then(|id| id.parse().ok())
    }
}

/// Reads an id written as a string, a number or `null`
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
            RawId::Text(id) => id,
            RawId::Number(id) => id.to_string(),
        }),
    )
}

/// What a listing page offers: post links and the next (older) page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingScan {
    /// Post URLs on the page, deduplicated in first-seen order
    pub post_links: Vec<String>,

    /// Link to older posts; `None` once pagination is exhausted
    pub next_page: Option<String>,
}

/// Result of processing one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub next_page: Option<String>,
    pub new_posts: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Listing pages crawled, including the homepage
    pub pages_visited: usize,

    /// Posts admitted into the archive this run
    pub posts_added: usize,

    /// Records written to the archive file
    pub archive_size: usize,

    /// Whether the operator ended the run early
    pub stopped_by_operator: bool,
}
