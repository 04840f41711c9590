mod models;
mod scraper;
mod scraper_error;

pub use models::RawListing;
pub use scraper::{parse_index_page, IndexPage, ListingScraper, PAGE_SOURCE};
pub use scraper_error::ScraperError;
