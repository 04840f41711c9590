use crate::db::connection::{init_db, Database};
use crate::domain::listing::PostType;
use crate::domain::region::RegionTags;
use crate::errors::ServerError;
use crate::scraper::{RawListing, PAGE_SOURCE};
use crate::stats::engine::StatsRow;
use chrono::NaiveDate;
use geo::MultiPolygon;
use rusqlite::params;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Initialize a fresh test DB using the production schema. Every call gets
/// its own file under the system temp dir so parallel tests never share a
/// warehouse.
pub fn init_test_db() -> Database {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = DB_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("woningmarkt_test_{nanos}_{seq}.sqlite3"));

    let db = Database::new(path.to_string_lossy().into_owned());
    init_db(&db, "sql/schema.sql")
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date")
}

/// A complete scraped card; tests override the fields they care about.
pub fn raw_listing(
    url: &str,
    post_type: PostType,
    price: i64,
    postcode: Option<&str>,
) -> RawListing {
    RawListing {
        page_source: PAGE_SOURCE.to_string(),
        scrape_date: test_date(),
        post_type,
        property_type: Some("Appartement".to_string()),
        price: Some(price),
        surface: Some(80),
        rooms: Some(3),
        furnished: None,
        postcode: postcode.map(str::to_string),
        url: url.to_string(),
        status: "Available".to_string(),
    }
}

/// Full ancestry for one buurt, codes derived from the display names.
pub fn buurt_tags(gemeente: &str, stadsdeel: &str, wijk: &str, buurt: &str) -> RegionTags {
    RegionTags {
        gemeente: gemeente.to_string(),
        stadsdeel: Some(stadsdeel.to_string()),
        stadsdeel_onderverdeling: Some(format!("{stadsdeel} Noord")),
        wijk: Some(wijk.to_string()),
        wijk_code: Some(format!("WK-{wijk}")),
        buurt: Some(buurt.to_string()),
        buurt_code: Some(format!("BU-{buurt}")),
    }
}

/// 1x1 square polygon with its south-west corner at (x, y).
pub fn square_wkt(x: f64, y: f64) -> String {
    format!(
        "POLYGON(({x} {y},{x1} {y},{x1} {y1},{x} {y1},{x} {y}))",
        x1 = x + 1.0,
        y1 = y + 1.0
    )
}

pub fn square(x: f64, y: f64) -> MultiPolygon<f64> {
    crate::geos::parse_multi_polygon(&square_wkt(x, y)).expect("valid square WKT")
}

pub fn insert_postcode_region(db: &Database, postcode: &str, tags: &RegionTags) {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO postcode_regions (postcode, gemeente, stadsdeel, stadsdeel_onderverdeling, wijk, wijk_code, buurt, buurt_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                postcode,
                tags.gemeente,
                tags.stadsdeel,
                tags.stadsdeel_onderverdeling,
                tags.wijk,
                tags.wijk_code,
                tags.buurt,
                tags.buurt_code,
            ],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
    .expect("insert postcode region");
}

pub fn insert_buurt_geometry(db: &Database, tags: &RegionTags, wkt: &str) {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO region_geometry (level, gemeente, stadsdeel, stadsdeel_onderverdeling, wijk, wijk_code, buurt, buurt_code, wkt)
             VALUES ('buurt', ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tags.gemeente,
                tags.stadsdeel,
                tags.stadsdeel_onderverdeling,
                tags.wijk,
                tags.wijk_code,
                tags.buurt,
                tags.buurt_code,
                wkt,
            ],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
    .expect("insert buurt geometry");
}

/// Assign one listing to a region directly, bypassing the consolidator.
pub fn insert_assignment(db: &Database, url: &str, tags: &RegionTags) {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO listing_regions (url, gemeente, stadsdeel, stadsdeel_onderverdeling, wijk, wijk_code, buurt, buurt_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                url,
                tags.gemeente,
                tags.stadsdeel,
                tags.stadsdeel_onderverdeling,
                tags.wijk,
                tags.wijk_code,
                tags.buurt,
                tags.buurt_code,
            ],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
    .expect("insert assignment");
}

/// One synthetic statistics row, matching the default stats view
/// (stadsdeel resolution, buy side, all types, price).
pub fn sample_stats_row(stadsdeel: &str, median: f64) -> StatsRow {
    StatsRow {
        region_resolution: "stadsdeel".to_string(),
        stadsdeel: Some(stadsdeel.to_string()),
        subdivision: None,
        wijk: None,
        wijk_code: None,
        buurt: None,
        buurt_code: None,
        post_type: "Buy".to_string(),
        property_type: "All".to_string(),
        furnished: None,
        value: "price".to_string(),
        number_of_properties: 24,
        median: Some(median),
        q1: Some(median * 0.9),
        q3: Some(median * 1.1),
        mode: None,
        geometric_mean: Some(median),
        geometric_std: Some(1.2),
        geometric_conf_int_95_low: Some(median * 0.7),
        geometric_conf_int_95_upp: Some(median * 1.3),
        geometric_conf_int_75_low: Some(median * 0.8),
        geometric_conf_int_75_upp: Some(median * 1.2),
        geometric_conf_int_50_low: Some(median * 0.9),
        geometric_conf_int_50_upp: Some(median * 1.1),
    }
}
