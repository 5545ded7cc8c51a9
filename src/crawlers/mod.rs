pub mod crawler;
pub mod http;
pub mod web;

pub use crawler::{ListingBrowser, LoadedPage, PostFetcher};
pub use http::HttpPostFetcher;
pub use web::WebDriverBrowser;
