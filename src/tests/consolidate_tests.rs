use crate::config::AppConfig;
use crate::db::listings::save_listings;
use crate::domain::listing::PostType;
use crate::domain::region::RegionTags;
use crate::errors::ServerError;
use crate::regions::consolidate::{
    consolidate, dissolve_wijk_geometry, final_regions, BuurtGeometry, ListingTag,
};
use crate::regions::run_consolidation;
use crate::tests::utils::{
    buurt_tags, init_test_db, insert_buurt_geometry, insert_postcode_region, raw_listing, square,
    square_wkt,
};

const THRESHOLD: usize = 30;

fn region(tags: &RegionTags, x: f64, y: f64) -> BuurtGeometry {
    BuurtGeometry {
        tags: tags.clone(),
        geometry: square(x, y),
    }
}

fn tagged(tags: &RegionTags, n: usize) -> Vec<ListingTag> {
    (0..n)
        .map(|i| ListingTag {
            url: format!(
                "https://example.org/{}-{i}",
                tags.buurt.as_deref().unwrap_or("none")
            ),
            tags: tags.clone(),
        })
        .collect()
}

#[test]
fn sparse_buurten_chain_merge_inside_their_wijk() {
    let x = buurt_tags("Amsterdam", "Centrum", "Grachten", "X");
    let y = buurt_tags("Amsterdam", "Centrum", "Grachten", "Y");
    let z = buurt_tags("Amsterdam", "Centrum", "Grachten", "Z");
    let regions = vec![region(&x, 0.0, 0.0), region(&y, 1.0, 0.0), region(&z, 2.0, 0.0)];

    let mut listings = tagged(&x, 5);
    listings.extend(tagged(&y, 8));
    listings.extend(tagged(&z, 30));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.pass_merges, [2, 0, 0]);
    let finals = final_regions(&outcome.arena);
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].listing_count, 43);
    // the absorbing partner's name always comes first
    assert_eq!(finals[0].tags.buurt.as_deref(), Some("Z & Y & X"));
    assert_eq!(finals[0].tags.buurt_code.as_deref(), Some("BU-Z & BU-Y & BU-X"));
    assert_eq!(finals[0].tags.wijk.as_deref(), Some("Grachten"));

    assert_eq!(outcome.assignments.len(), 43);
    assert!(outcome
        .assignments
        .iter()
        .all(|(_, tags)| tags.buurt.as_deref() == Some("Z & Y & X")));
}

#[test]
fn sparse_wijk_waits_for_the_gemeente_pass() {
    let a = buurt_tags("Amsterdam", "Noord", "Buiksloot", "A");
    let b = buurt_tags("Amsterdam", "Noord", "Volewijck", "B");
    let regions = vec![region(&a, 0.0, 0.0), region(&b, 1.0, 0.0)];

    let mut listings = tagged(&a, 5);
    listings.extend(tagged(&b, 40));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    // A's whole wijk holds 5 listings, so the intra-wijk pass leaves it alone.
    assert_eq!(outcome.report.pass_merges, [0, 1, 0]);
    let finals = final_regions(&outcome.arena);
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].tags.buurt.as_deref(), Some("B & A"));
    assert_eq!(finals[0].tags.wijk.as_deref(), Some("Volewijck & Buiksloot"));
    assert_eq!(finals[0].listing_count, 45);
}

#[test]
fn island_region_stays_in_the_residue() {
    let a = buurt_tags("Amsterdam", "Centrum", "Grachten", "A");
    let b = buurt_tags("Amsterdam", "Centrum", "Grachten", "B");
    let regions = vec![region(&a, 0.0, 0.0), region(&b, 5.0, 5.0)];

    let mut listings = tagged(&a, 5);
    listings.extend(tagged(&b, 40));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.total_merges(), 0);
    assert_eq!(outcome.report.residue, vec!["A".to_string()]);
    assert_eq!(final_regions(&outcome.arena).len(), 2);

    // the island's listings keep their original tags
    let kept = outcome
        .assignments
        .iter()
        .filter(|(_, tags)| tags.buurt.as_deref() == Some("A"))
        .count();
    assert_eq!(kept, 5);
}

#[test]
fn corner_contact_is_not_adjacency() {
    let a = buurt_tags("Amsterdam", "Centrum", "Grachten", "A");
    let b = buurt_tags("Amsterdam", "Centrum", "Grachten", "B");
    let regions = vec![region(&a, 0.0, 0.0), region(&b, 1.0, 1.0)];

    let mut listings = tagged(&a, 5);
    listings.extend(tagged(&b, 40));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");
    assert_eq!(outcome.report.total_merges(), 0);
    assert_eq!(outcome.report.residue, vec!["A".to_string()]);
}

#[test]
fn listingless_neighbour_can_absorb_a_sparse_region() {
    let a = buurt_tags("Amsterdam", "Centrum", "Grachten", "A");
    let e = buurt_tags("Amsterdam", "Centrum", "Grachten", "E");
    let far = buurt_tags("Amsterdam", "Centrum", "Grachten", "F");
    let regions = vec![
        region(&a, 0.0, 0.0),
        region(&e, 1.0, 0.0),
        region(&far, 10.0, 10.0),
    ];

    let listings = tagged(&a, 5);

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.pass_merges, [0, 1, 0]);
    let finals = final_regions(&outcome.arena);
    assert_eq!(finals.len(), 1, "regions without listings stay out of the final table");
    assert_eq!(finals[0].tags.buurt.as_deref(), Some("E & A"));
    assert_eq!(finals[0].listing_count, 5);
    assert_eq!(outcome.report.residue, vec!["E & A".to_string()]);
}

#[test]
fn cross_gemeente_merge_composites_both_names() {
    let a = buurt_tags("Amsterdam", "Zuidoost", "Gein", "A");
    let d = buurt_tags("Diemen", "Diemen-Zuid", "Biesbosch", "D");
    let regions = vec![region(&a, 0.0, 0.0), region(&d, 1.0, 0.0)];

    let mut listings = tagged(&a, 5);
    listings.extend(tagged(&d, 40));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.pass_merges, [0, 0, 1]);
    let finals = final_regions(&outcome.arena);
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].tags.gemeente, "Diemen & Amsterdam");
    assert_eq!(finals[0].tags.buurt.as_deref(), Some("D & A"));
}

#[test]
fn dense_regions_are_left_alone() {
    let a = buurt_tags("Amsterdam", "West", "Staatslieden", "A");
    let b = buurt_tags("Amsterdam", "West", "Staatslieden", "B");
    let regions = vec![region(&a, 0.0, 0.0), region(&b, 1.0, 0.0)];

    let mut listings = tagged(&a, 30);
    listings.extend(tagged(&b, 31));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.total_merges(), 0);
    assert!(outcome.report.residue.is_empty());
    assert_eq!(final_regions(&outcome.arena).len(), 2);
    assert!(outcome.assignments.iter().all(|(_, tags)| {
        tags.buurt.as_deref() == Some("A") || tags.buurt.as_deref() == Some("B")
    }));
}

#[test]
fn listing_with_unknown_buurt_keeps_its_tags() {
    let a = buurt_tags("Amsterdam", "West", "Staatslieden", "A");
    let ghost = buurt_tags("Amsterdam", "West", "Staatslieden", "Ghost");
    let regions = vec![region(&a, 0.0, 0.0)];

    let mut listings = tagged(&a, 40);
    listings.extend(tagged(&ghost, 1));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");

    assert_eq!(outcome.report.unmatched_listings, 1);
    let (_, tags) = outcome
        .assignments
        .iter()
        .find(|(url, _)| url.contains("Ghost"))
        .expect("ghost listing assigned");
    assert_eq!(tags.buurt.as_deref(), Some("Ghost"));
}

#[test]
fn wijk_dissolve_covers_the_merged_buurten() {
    use geo::Area;

    let a = buurt_tags("Amsterdam", "Centrum", "Grachten", "A");
    let b = buurt_tags("Amsterdam", "Centrum", "Grachten", "B");
    let c = buurt_tags("Amsterdam", "Centrum", "Jordaan", "C");
    let regions = vec![region(&a, 0.0, 0.0), region(&b, 1.0, 0.0), region(&c, 5.0, 0.0)];

    let mut listings = tagged(&a, 5);
    listings.extend(tagged(&b, 40));
    listings.extend(tagged(&c, 35));

    let outcome = consolidate(regions, &listings, THRESHOLD).expect("consolidate");
    let wijken = dissolve_wijk_geometry(&outcome.arena).expect("dissolve");

    assert_eq!(wijken.len(), 2);
    let grachten = wijken
        .iter()
        .find(|w| w.tags.wijk.as_deref() == Some("Grachten"))
        .expect("Grachten row");
    assert_eq!(grachten.listing_count, 45);
    assert!((grachten.geometry.unsigned_area() - 2.0).abs() < 1e-9);
    assert!(grachten.tags.buurt.is_none());
    assert!(grachten.tags.buurt_code.is_none());
}

#[test]
fn full_run_replaces_the_region_tables() {
    let db = init_test_db();
    let sparse = buurt_tags("Amsterdam", "Centrum", "Grachten", "Sparse");
    let dense = buurt_tags("Amsterdam", "Centrum", "Grachten", "Dense");
    insert_buurt_geometry(&db, &sparse, &square_wkt(0.0, 0.0));
    insert_buurt_geometry(&db, &dense, &square_wkt(1.0, 0.0));
    insert_postcode_region(&db, "1011 AB", &sparse);
    insert_postcode_region(&db, "1012 AB", &dense);

    let mut batch = Vec::new();
    for i in 0..5i64 {
        batch.push(raw_listing(
            &format!("https://example.org/s{i}"),
            PostType::Buy,
            400_000 + i,
            Some("1011 AB"),
        ));
    }
    for i in 0..40i64 {
        batch.push(raw_listing(
            &format!("https://example.org/d{i}"),
            PostType::Buy,
            500_000 + i,
            Some("1012 AB"),
        ));
    }
    assert_eq!(save_listings(&db, &batch).expect("seed listings"), 45);

    let cfg = AppConfig::default();
    let report = run_consolidation(&db, &cfg).expect("consolidation");
    assert_eq!(report.pass_merges, [1, 0, 0]);

    let counts = |db: &crate::db::connection::Database| {
        db.with_conn(|conn| {
            let count = |sql: &str| -> Result<i64, ServerError> {
                conn.query_row(sql, [], |row| row.get(0))
                    .map_err(|e| ServerError::DbError(e.to_string()))
            };
            Ok((
                count("SELECT COUNT(*) FROM merged_regions WHERE level = 'buurt'")?,
                count("SELECT COUNT(*) FROM merged_regions WHERE level = 'wijk'")?,
                count("SELECT COUNT(*) FROM listing_regions")?,
                count("SELECT COUNT(*) FROM region_geometry")?,
            ))
        })
        .expect("table counts")
    };

    let (buurten, wijken, assigned, reference) = counts(&db);
    assert_eq!(buurten, 1);
    assert_eq!(wijken, 1);
    assert_eq!(assigned, 45);
    assert_eq!(reference, 2, "the reference polygons are never touched");

    let name: String = db
        .with_conn(|conn| {
            conn.query_row(
                "SELECT buurt FROM merged_regions WHERE level = 'buurt'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ServerError::DbError(e.to_string()))
        })
        .expect("merged name");
    assert_eq!(name, "Dense & Sparse");

    // a second run starts from the reference polygons and lands in the
    // same place instead of appending
    let report = run_consolidation(&db, &cfg).expect("second consolidation");
    assert_eq!(report.pass_merges, [1, 0, 0]);
    let (buurten, wijken, assigned, _) = counts(&db);
    assert_eq!(buurten, 1);
    assert_eq!(wijken, 1);
    assert_eq!(assigned, 45);
}
