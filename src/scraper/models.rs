use crate::domain::listing::PostType;
use chrono::NaiveDate;
use serde::Serialize;

/// One listing card as parsed from an index page. Category labels stay raw
/// here; the taxonomy map runs when statistics read them back out. Numeric
/// fields are optional because a card can omit any feature line; rows
/// missing price, surface or rooms are dropped at save time.
#[derive(Debug, Clone, Serialize)]
pub struct RawListing {
    pub page_source: String,
    pub scrape_date: NaiveDate,
    pub post_type: PostType,
    pub property_type: Option<String>,
    pub price: Option<i64>,
    pub surface: Option<i64>,
    pub rooms: Option<i64>,
    pub furnished: Option<String>,
    pub postcode: Option<String>,
    pub url: String,
    pub status: String,
}
