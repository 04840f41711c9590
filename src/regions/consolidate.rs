use crate::domain::region::RegionTags;
use crate::errors::ServerError;
use crate::geos;
use crate::regions::arena::{RegionArena, RegionId, RegionRecord};
use geo::MultiPolygon;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One buurt polygon row with its full ancestry, as loaded from the
/// geometry table.
#[derive(Debug, Clone)]
pub struct BuurtGeometry {
    pub tags: RegionTags,
    pub geometry: MultiPolygon<f64>,
}

/// One listing with the original tags from the postcode lookup.
#[derive(Debug, Clone)]
pub struct ListingTag {
    pub url: String,
    pub tags: RegionTags,
}

/// A region polygon at some serving level, ready to persist.
#[derive(Debug, Clone)]
pub struct LevelGeometry {
    pub tags: RegionTags,
    pub listing_count: usize,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Default)]
pub struct ConsolidationReport {
    /// Merges performed by the intra-wijk, intra-gemeente and
    /// cross-gemeente passes.
    pub pass_merges: [usize; 3],
    /// Display names of regions still below the threshold after the last
    /// pass. Their listings keep the original tags.
    pub residue: Vec<String>,
    /// Tagged listings whose buurt code has no polygon row.
    pub unmatched_listings: usize,
    /// Listings with no postcode row at all. Counted by the caller; the
    /// merge passes never see these.
    pub untagged_listings: usize,
}

impl ConsolidationReport {
    pub fn total_merges(&self) -> usize {
        self.pass_merges.iter().sum()
    }
}

pub struct ConsolidationOutcome {
    pub arena: RegionArena,
    /// url -> final tags, one entry per input listing.
    pub assignments: Vec<(String, RegionTags)>,
    pub report: ConsolidationReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeScope {
    IntraWijk,
    IntraGemeente,
    Anywhere,
}

/// Merge sparse regions into adjacent ones until every region holding
/// listings reaches `threshold`, widening the partner search from wijk to
/// gemeente to the whole dataset. Each pass loops to a fixed point; each
/// merge shrinks the active set by one, so the loops terminate.
pub fn consolidate(
    regions: Vec<BuurtGeometry>,
    listings: &[ListingTag],
    threshold: usize,
) -> Result<ConsolidationOutcome, ServerError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for l in listings {
        if let Some(code) = l.tags.buurt_code.as_deref() {
            *counts.entry(code).or_insert(0) += 1;
        }
    }

    let mut arena = RegionArena::default();
    for region in regions {
        let count = region
            .tags
            .buurt_code
            .as_deref()
            .and_then(|c| counts.get(c))
            .copied()
            .unwrap_or(0);
        arena.insert(RegionRecord::from_tags(&region.tags, region.geometry, count));
    }

    let mut report = ConsolidationReport::default();
    let passes = [
        ("intra-wijk", MergeScope::IntraWijk),
        ("intra-gemeente", MergeScope::IntraGemeente),
        ("cross-gemeente", MergeScope::Anywhere),
    ];
    for (i, (label, scope)) in passes.into_iter().enumerate() {
        eprintln!("Pass {}: {label} merges", i + 1);
        report.pass_merges[i] = run_pass(&mut arena, scope, threshold)?;
    }

    for id in arena.active_ids() {
        let r = arena.get(id);
        if r.listing_count > 0 && r.listing_count < threshold {
            report.residue.push(r.display_buurt());
        }
    }

    let mut assignments = Vec::with_capacity(listings.len());
    for l in listings {
        let resolved = l
            .tags
            .buurt_code
            .as_deref()
            .and_then(|code| arena.resolve(code));
        match resolved {
            Some(id) => assignments.push((l.url.clone(), arena.get(id).tags())),
            None => {
                report.unmatched_listings += 1;
                assignments.push((l.url.clone(), l.tags.clone()));
            }
        }
    }

    Ok(ConsolidationOutcome {
        arena,
        assignments,
        report,
    })
}

/// One fixed-point pass. Candidates with no adjacent partner in scope are
/// shelved for the remainder of the pass (neither candidate nor partner);
/// the next, wider pass reconsiders them.
fn run_pass(
    arena: &mut RegionArena,
    scope: MergeScope,
    threshold: usize,
) -> Result<usize, ServerError> {
    let mut merges = 0;
    let mut shelved: HashSet<RegionId> = HashSet::new();
    loop {
        let Some(cand) = next_candidate(arena, &shelved, scope, threshold) else {
            break;
        };
        match best_partner(arena, &shelved, cand, scope) {
            None => {
                eprintln!(
                    "⚠️ No adjacent partner for {}",
                    arena.get(cand).display_buurt()
                );
                shelved.insert(cand);
            }
            Some(partner) => {
                let geometry =
                    geos::union_regions(&arena.get(partner).geometry, &arena.get(cand).geometry)?;
                let merged = arena.merge(partner, cand, geometry);
                merges += 1;
                let r = arena.get(merged);
                eprintln!("  {} ({} listings)", r.display_buurt(), r.listing_count);
            }
        }
    }
    Ok(merges)
}

/// First sparse region in (gemeente, wijk, buurt) display order. Regions
/// without listings are never candidates; in the intra-wijk pass the wijk
/// also needs enough total listings to be worth redistributing.
fn next_candidate(
    arena: &RegionArena,
    shelved: &HashSet<RegionId>,
    scope: MergeScope,
    threshold: usize,
) -> Option<RegionId> {
    arena
        .active_ids()
        .into_iter()
        .filter(|id| !shelved.contains(id))
        .filter(|id| {
            let r = arena.get(*id);
            r.listing_count > 0 && r.listing_count < threshold
        })
        .filter(|id| {
            scope != MergeScope::IntraWijk || wijk_total(arena, shelved, *id) >= threshold
        })
        .min_by_key(|id| sort_key(arena.get(*id)))
}

/// Total active listings across the candidate's wijk, candidate included.
fn wijk_total(arena: &RegionArena, shelved: &HashSet<RegionId>, cand: RegionId) -> usize {
    let c = arena.get(cand);
    arena
        .active_ids()
        .into_iter()
        .filter(|id| !shelved.contains(id))
        .map(|id| arena.get(id))
        .filter(|r| r.wijk_code.intersects(&c.wijk_code))
        .map(|r| r.listing_count)
        .sum()
}

/// Adjacent in-scope region with the fewest listings; ties break on the
/// buurt display name so the choice never depends on arena order.
fn best_partner(
    arena: &RegionArena,
    shelved: &HashSet<RegionId>,
    cand: RegionId,
    scope: MergeScope,
) -> Option<RegionId> {
    let c = arena.get(cand);
    arena
        .active_ids()
        .into_iter()
        .filter(|id| *id != cand && !shelved.contains(id))
        .filter(|id| in_scope(c, arena.get(*id), scope))
        .filter(|id| geos::shares_border(&c.geometry, &arena.get(*id).geometry))
        .min_by_key(|id| {
            let r = arena.get(*id);
            (r.listing_count, r.display_buurt())
        })
}

fn in_scope(a: &RegionRecord, b: &RegionRecord, scope: MergeScope) -> bool {
    match scope {
        MergeScope::IntraWijk => a.gemeente.intersects(&b.gemeente) && a.wijk_code.intersects(&b.wijk_code),
        MergeScope::IntraGemeente => a.gemeente.intersects(&b.gemeente),
        MergeScope::Anywhere => true,
    }
}

fn sort_key(r: &RegionRecord) -> (String, String, String) {
    (
        r.gemeente.display().unwrap_or_default(),
        r.wijk.display().unwrap_or_default(),
        r.display_buurt(),
    )
}

/// Final buurt-level region table: every active region that holds listings,
/// with its composite polygon.
pub fn final_regions(arena: &RegionArena) -> Vec<LevelGeometry> {
    arena
        .active_ids()
        .into_iter()
        .map(|id| arena.get(id))
        .filter(|r| r.listing_count > 0)
        .map(|r| LevelGeometry {
            tags: r.tags(),
            listing_count: r.listing_count,
            geometry: r.geometry.clone(),
        })
        .collect()
}

/// Wijk-level serving polygons: final regions dissolved by wijk display
/// name.
pub fn dissolve_wijk_geometry(arena: &RegionArena) -> Result<Vec<LevelGeometry>, ServerError> {
    let mut groups: BTreeMap<String, Vec<RegionId>> = BTreeMap::new();
    for id in arena.active_ids() {
        let r = arena.get(id);
        if r.listing_count == 0 {
            continue;
        }
        if let Some(wijk) = r.wijk.display() {
            groups.entry(wijk).or_default().push(id);
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, ids) in groups {
        let geoms: Vec<&MultiPolygon<f64>> =
            ids.iter().map(|id| &arena.get(*id).geometry).collect();
        let geometry = geos::union_many(&geoms)?;
        let listing_count = ids.iter().map(|id| arena.get(*id).listing_count).sum();
        let mut tags = arena.get(ids[0]).tags();
        tags.buurt = None;
        tags.buurt_code = None;
        out.push(LevelGeometry {
            tags,
            listing_count,
            geometry,
        });
    }
    Ok(out)
}
