pub mod engine;
pub mod filters;
pub mod math;

use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::errors::ServerError;

/// Full statistics run: snapshot the consolidated listings, sweep the filter
/// space, then swap the new table in. A failed run leaves the previous
/// statistics table untouched.
pub fn run_statistics(db: &Database, cfg: &AppConfig) -> Result<usize, ServerError> {
    let listings = crate::db::listings::load_tagged_listings(db)?;
    println!("📄 Loaded {} consolidated listings", listings.len());

    let rows = engine::run_sweep(&listings, cfg);
    crate::db::stats::replace_stats(db, &rows)?;

    println!("✅ Statistics table replaced ({} rows)", rows.len());
    Ok(rows.len())
}
