use crate::config::AppConfig;
use crate::db::stats::StatsQuery;
use crate::db::Database;
use crate::domain::listing::PostType;
use crate::domain::region::RegionLevel;
use crate::errors::ServerError;
use crate::responses::{html_response, json_response, see_other, ResultResp};
use crate::scraper::ListingScraper;
use crate::stats::filters::{FurnishedFilter, Measure, PropertyFilter};
use crate::templates;
use astra::Request;
use std::collections::HashMap;

pub fn handle(req: Request, db: &Database, cfg: &AppConfig) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();

    match (method, path) {
        ("GET", "/") => home(db),
        ("GET", "/stats") => stats_html(&req, db),
        ("GET", "/stats.json") => stats_json(&req, db),
        ("GET", "/stats.xlsx") => stats_xlsx(db),
        ("GET", "/regions.json") => regions_json(&req, db),
        ("POST", "/admin/scrape") => trigger_scrape(db, cfg),
        _ => Err(ServerError::NotFound),
    }
}

fn home(db: &Database) -> ResultResp {
    let counts = crate::db::listings::warehouse_counts(db)?;
    let scrapes = db.with_conn(|conn| crate::db::scrapes::get_recent_scrapes(conn))?;
    let vm = templates::pages::HomeVm { counts, scrapes };
    html_response(templates::pages::home_page(&vm))
}

fn stats_html(req: &Request, db: &Database) -> ResultResp {
    let query = parse_stats_query(&parse_query(req))?;
    let rows = crate::db::stats::load_stats(db, &query)?;
    let vm = templates::pages::StatsVm { query, rows };
    html_response(templates::pages::stats_page(&vm))
}

fn stats_json(req: &Request, db: &Database) -> ResultResp {
    let query = parse_stats_query(&parse_query(req))?;
    let rows = crate::db::stats::load_stats(db, &query)?;
    json_response(&rows)
}

fn stats_xlsx(db: &Database) -> ResultResp {
    let rows = crate::db::stats::load_all_stats(db)?;
    crate::spreadsheets::export_stats_xlsx(&rows)
}

fn regions_json(req: &Request, db: &Database) -> ResultResp {
    let params = parse_query(req);
    let level = match params.get("level") {
        Some(s) => RegionLevel::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("unknown level: {s:?}")))?,
        None => RegionLevel::Buurt,
    };
    let regions = crate::db::regions::load_serving_geometry(db, level)?;
    json_response(&regions)
}

fn trigger_scrape(db: &Database, cfg: &AppConfig) -> ResultResp {
    ListingScraper::spawn_scrape(db, cfg);
    see_other("/")
}

/// Decode the statistics filter parameters, falling back to the default
/// view (stadsdeel resolution, buy side, all types, price) and rejecting
/// unknown values outright. The buy side carries no furnished dimension,
/// so any furnished parameter is ignored there.
fn parse_stats_query(params: &HashMap<String, String>) -> Result<StatsQuery, ServerError> {
    let resolution = match params.get("resolution") {
        Some(s) => RegionLevel::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("unknown resolution: {s:?}")))?,
        None => RegionLevel::Stadsdeel,
    };
    let post_type = match params.get("post_type") {
        Some(s) => PostType::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("unknown post_type: {s:?}")))?,
        None => PostType::Buy,
    };
    let property_type = match params.get("property_type") {
        Some(s) => PropertyFilter::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("unknown property_type: {s:?}")))?,
        None => PropertyFilter::All,
    };
    let furnished = match post_type {
        PostType::Buy => None,
        PostType::Rent => Some(match params.get("furnished") {
            Some(s) => FurnishedFilter::parse(s)
                .ok_or_else(|| ServerError::BadRequest(format!("unknown furnished: {s:?}")))?,
            None => FurnishedFilter::All,
        }),
    };
    let value = match params.get("value") {
        Some(s) => Measure::parse(s)
            .ok_or_else(|| ServerError::BadRequest(format!("unknown value: {s:?}")))?,
        None => Measure::Price,
    };

    Ok(StatsQuery {
        resolution,
        post_type,
        property_type,
        furnished,
        value,
    })
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    let mut map = HashMap::new();

    if let Some(q) = req.uri().query() {
        for pair in q.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(k), Some(v)) = (parts.next(), parts.next()) {
                map.insert(k.to_string(), v.to_string());
            }
        }
    }

    map
}
