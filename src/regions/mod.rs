pub mod arena;
pub mod consolidate;

use crate::config::AppConfig;
use crate::db::Database;
use crate::errors::ServerError;
use consolidate::ConsolidationReport;

/// Full consolidation cycle: load the reference polygons and the tagged
/// listings, merge sparse regions up to the configured threshold, then
/// replace the merged-region and assignment tables in one transaction.
pub fn run_consolidation(db: &Database, cfg: &AppConfig) -> Result<ConsolidationReport, ServerError> {
    let regions = crate::db::regions::load_buurt_geometry(db)?;
    if regions.is_empty() {
        return Err(ServerError::Geometry(
            "no buurt polygons loaded; is the reference geometry table filled?".to_string(),
        ));
    }
    let tags = crate::db::listings::load_listing_tags(db)?;
    let total = crate::db::listings::count_listings(db)?;
    println!(
        "📄 Consolidating {} regions over {} tagged listings (threshold {})",
        regions.len(),
        tags.len(),
        cfg.region_min_listings
    );

    let mut outcome = consolidate::consolidate(regions, &tags, cfg.region_min_listings)?;
    outcome.report.untagged_listings = (total as usize).saturating_sub(tags.len());

    let buurt_rows = consolidate::final_regions(&outcome.arena);
    let wijk_rows = consolidate::dissolve_wijk_geometry(&outcome.arena)?;
    crate::db::regions::replace_consolidation(db, &buurt_rows, &wijk_rows, &outcome.assignments)?;

    let report = outcome.report;
    println!(
        "✅ Consolidation done: {} merges ({} intra-wijk, {} intra-gemeente, {} cross-gemeente), {} final regions",
        report.total_merges(),
        report.pass_merges[0],
        report.pass_merges[1],
        report.pass_merges[2],
        buurt_rows.len()
    );
    if !report.residue.is_empty() {
        println!(
            "⚠️ {} regions still below the threshold: {}",
            report.residue.len(),
            report.residue.join(", ")
        );
    }
    if report.unmatched_listings > 0 {
        println!(
            "⚠️ {} listings tagged with a buurt that has no polygon; original tags kept",
            report.unmatched_listings
        );
    }
    if report.untagged_listings > 0 {
        println!(
            "⚠️ {} listings without a usable postcode; left out of the region tables",
            report.untagged_listings
        );
    }
    Ok(report)
}
