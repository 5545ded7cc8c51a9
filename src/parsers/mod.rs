pub mod html;
pub mod listing;
pub mod post;

#[cfg(test)]
mod tests;

pub use listing::scan_listing;
pub use post::{ArticleExtractor, ExtractedArticle, ReadabilityExtractor, extract_post};
