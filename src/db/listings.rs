use crate::db::connection::Database;
use crate::domain::listing::{PostType, TaggedListing};
use crate::domain::logic::{map_furnished, map_property_type};
use crate::domain::region::RegionTags;
use crate::errors::ServerError;
use crate::regions::consolidate::ListingTag;
use crate::scraper::RawListing;
use chrono::NaiveDate;
use rusqlite::params;

const SQL_LISTINGS_WITH_POSTCODES: &str = include_str!("../../sql/listings_with_postcodes.sql");
const SQL_LISTINGS_WITH_REGIONS: &str = include_str!("../../sql/listings_with_regions.sql");

/// Merge one scraped batch into the warehouse. A known url only refreshes
/// its last-seen date and status; a new url gets first = last = scrape date.
/// Cards without a url or a positive price/surface/rooms never make it in.
pub fn save_listings(db: &Database, listings: &[RawListing]) -> Result<usize, ServerError> {
    db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut saved = 0;
        for l in listings {
            let (Some(price), Some(surface), Some(rooms)) = (l.price, l.surface, l.rooms) else {
                continue;
            };
            if price <= 0 || surface <= 0 || rooms <= 0 {
                continue;
            }

            tx.execute(
                r#"
                INSERT INTO listings (
                    url, page_source, post_type, property_type,
                    price, surface, rooms, furnished, postcode, status,
                    first_scrape_date, last_scrape_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                ON CONFLICT(url) DO UPDATE SET
                    last_scrape_date = excluded.last_scrape_date,
                    status = excluded.status
                "#,
                params![
                    l.url,
                    l.page_source,
                    l.post_type.as_str(),
                    l.property_type,
                    price,
                    surface,
                    rooms,
                    l.furnished,
                    l.postcode,
                    l.status,
                    l.scrape_date,
                ],
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;
            saved += 1;
        }

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(saved)
    })
}

/// Flip listings of one post type that a completed scrape cycle did not see.
/// Returns how many rows changed. Nothing is ever deleted.
pub fn mark_absent_unavailable(
    db: &Database,
    post_type: PostType,
    cycle_date: NaiveDate,
) -> Result<usize, ServerError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE listings SET status = 'Unavailable'
             WHERE status = 'Available' AND post_type = ?1 AND last_scrape_date != ?2",
            params![post_type.as_str(), cycle_date],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))
    })
}

pub fn count_listings(db: &Database) -> Result<i64, ServerError> {
    db.with_conn(|conn| {
        conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))
            .map_err(|e| ServerError::DbError(e.to_string()))
    })
}

/// Listings joined with the postcode lookup: the consolidation input. The
/// join is inner, so a listing without a known postcode takes no part.
pub fn load_listing_tags(db: &Database) -> Result<Vec<ListingTag>, ServerError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(SQL_LISTINGS_WITH_POSTCODES)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ListingTag {
                    url: row.get(0)?,
                    tags: RegionTags {
                        gemeente: row.get(1)?,
                        stadsdeel: row.get(2)?,
                        stadsdeel_onderverdeling: row.get(3)?,
                        wijk: row.get(4)?,
                        wijk_code: row.get(5)?,
                        buurt: row.get(6)?,
                        buurt_code: row.get(7)?,
                    },
                })
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })
}

type RawTaggedRow = (
    String,
    String,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<i64>,
    Option<String>,
    RegionTags,
);

/// Listings joined with their consolidated region tags: the statistics
/// input. Raw category labels are mapped to the canonical taxonomy here;
/// an unmapped label aborts the load.
pub fn load_tagged_listings(db: &Database) -> Result<Vec<TaggedListing>, ServerError> {
    let raw: Vec<RawTaggedRow> = db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(SQL_LISTINGS_WITH_REGIONS)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?, // url
                    row.get(1)?, // post_type
                    row.get(2)?, // property_type
                    row.get(3)?, // price
                    row.get(4)?, // surface
                    row.get(5)?, // rooms
                    row.get(6)?, // furnished
                    RegionTags {
                        gemeente: row.get(7)?,
                        stadsdeel: row.get(8)?,
                        stadsdeel_onderverdeling: row.get(9)?,
                        wijk: row.get(10)?,
                        wijk_code: row.get(11)?,
                        buurt: row.get(12)?,
                        buurt_code: row.get(13)?,
                    },
                ))
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })?;

    let mut listings = Vec::with_capacity(raw.len());
    for (url, post_type, property_type, price, surface, rooms, furnished, tags) in raw {
        let post_type = PostType::parse(&post_type)
            .ok_or_else(|| ServerError::Taxonomy(format!("unmapped post type: {post_type:?}")))?;
        let property_type = property_type
            .as_deref()
            .map(map_property_type)
            .transpose()?;
        // Furnished labels only mean anything on rent listings.
        let furnished = match post_type {
            PostType::Rent => furnished.as_deref().map(map_furnished).transpose()?,
            PostType::Buy => None,
        };
        listings.push(TaggedListing {
            url,
            post_type,
            property_type,
            furnished,
            price,
            surface,
            rooms,
            tags,
        });
    }
    Ok(listings)
}

/// Headline numbers for the home page.
#[derive(Debug, Default)]
pub struct WarehouseCounts {
    pub listings: i64,
    pub available: i64,
    pub buy: i64,
    pub rent: i64,
    pub assigned: i64,
    pub merged_buurten: i64,
    pub stats_rows: i64,
}

pub fn warehouse_counts(db: &Database) -> Result<WarehouseCounts, ServerError> {
    db.with_conn(|conn| {
        let count = |sql: &str| -> Result<i64, ServerError> {
            conn.query_row(sql, [], |row| row.get(0))
                .map_err(|e| ServerError::DbError(e.to_string()))
        };
        Ok(WarehouseCounts {
            listings: count("SELECT COUNT(*) FROM listings")?,
            available: count("SELECT COUNT(*) FROM listings WHERE status = 'Available'")?,
            buy: count("SELECT COUNT(*) FROM listings WHERE post_type = 'Buy'")?,
            rent: count("SELECT COUNT(*) FROM listings WHERE post_type = 'Rent'")?,
            assigned: count("SELECT COUNT(*) FROM listing_regions")?,
            merged_buurten: count("SELECT COUNT(*) FROM merged_regions WHERE level = 'buurt'")?,
            stats_rows: count("SELECT COUNT(*) FROM listing_stats")?,
        })
    })
}
