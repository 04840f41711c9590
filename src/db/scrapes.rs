use crate::errors::ServerError;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub page_source: String,
    pub post_type: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub pages_fetched: Option<i64>,
    pub listings_seen: Option<i64>,
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

pub fn start_scrape_run(
    conn: &Connection,
    page_source: &str,
    post_type: &str,
    now: i64,
) -> Result<i64, ServerError> {
    conn.execute(
        "INSERT INTO scrape_runs (page_source, post_type, started_at, success) VALUES (?, ?, ?, 0)",
        params![page_source, post_type, now],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    pages: usize,
    listings: usize,
    success: bool,
    error: Option<String>,
) -> Result<(), ServerError> {
    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, pages_fetched = ?, listings_seen = ?, success = ?, error_message = ? WHERE id = ?",
        params![now, pages, listings, success, error, run_id],
    ).map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, ServerError> {
    let mut stmt = conn
        .prepare("SELECT id, page_source, post_type, started_at, finished_at, pages_fetched, listings_seen, success, error_message FROM scrape_runs ORDER BY started_at DESC LIMIT 50")
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ScrapeRun {
                id: row.get(0)?,
                page_source: row.get(1)?,
                post_type: row.get(2)?,
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
                pages_fetched: row.get(5)?,
                listings_seen: row.get(6)?,
                success: row.get(7)?,
                error_message: row.get(8)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(runs)
}
