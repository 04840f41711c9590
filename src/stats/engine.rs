use crate::config::AppConfig;
use crate::domain::listing::TaggedListing;
use crate::domain::region::{RegionLevel, RegionTags};
use crate::stats::filters::{filter_space, FilterCombo};
use crate::stats::math::{mean, quantile, sample_std, unique_mode};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

// Fixed z-equivalents for the three confidence bands.
const Z_95: f64 = 1.96;
const Z_75: f64 = 1.15;
const Z_50: f64 = 0.674;

/// One row of the statistics table. Statistic fields stay None when the
/// trimmed sample is below the minimum; `number_of_properties` always
/// reports the pre-trim count.
#[derive(Debug, Clone, Serialize)]
pub struct StatsRow {
    pub region_resolution: String,
    pub stadsdeel: Option<String>,
    pub subdivision: Option<String>,
    pub wijk: Option<String>,
    pub wijk_code: Option<String>,
    pub buurt: Option<String>,
    pub buurt_code: Option<String>,
    pub post_type: String,
    pub property_type: String,
    pub furnished: Option<String>,
    pub value: String,
    pub number_of_properties: i64,
    pub median: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub mode: Option<f64>,
    pub geometric_mean: Option<f64>,
    pub geometric_std: Option<f64>,
    pub geometric_conf_int_95_low: Option<f64>,
    pub geometric_conf_int_95_upp: Option<f64>,
    pub geometric_conf_int_75_low: Option<f64>,
    pub geometric_conf_int_75_upp: Option<f64>,
    pub geometric_conf_int_50_low: Option<f64>,
    pub geometric_conf_int_50_upp: Option<f64>,
}

impl StatsRow {
    /// Keys-and-count-only row: the combination exists but has too little
    /// data. Insufficient sample is a data value here, not an error.
    fn insufficient(combo: &FilterCombo, identity: RegionIdentity, raw_count: usize) -> Self {
        StatsRow {
            region_resolution: combo.resolution.as_str().to_string(),
            stadsdeel: identity.stadsdeel,
            subdivision: identity.subdivision,
            wijk: identity.wijk,
            wijk_code: identity.wijk_code,
            buurt: identity.buurt,
            buurt_code: identity.buurt_code,
            post_type: combo.post_type.as_str().to_string(),
            property_type: combo.property_filter.as_str().to_string(),
            furnished: combo.furnished_filter.map(|f| f.as_str().to_string()),
            value: combo.measure.as_str().to_string(),
            number_of_properties: raw_count as i64,
            median: None,
            q1: None,
            q3: None,
            mode: None,
            geometric_mean: None,
            geometric_std: None,
            geometric_conf_int_95_low: None,
            geometric_conf_int_95_upp: None,
            geometric_conf_int_75_low: None,
            geometric_conf_int_75_upp: None,
            geometric_conf_int_50_low: None,
            geometric_conf_int_50_upp: None,
        }
    }
}

/// Region name/code fields for a row, filled down to the active resolution
/// and None below it. Ancestors come from the consolidated tags, which are
/// consistent within a group by construction.
struct RegionIdentity {
    stadsdeel: Option<String>,
    subdivision: Option<String>,
    wijk: Option<String>,
    wijk_code: Option<String>,
    buurt: Option<String>,
    buurt_code: Option<String>,
}

impl RegionIdentity {
    fn at(level: RegionLevel, tags: &RegionTags) -> Self {
        let mut identity = RegionIdentity {
            stadsdeel: tags.stadsdeel.clone(),
            subdivision: None,
            wijk: None,
            wijk_code: None,
            buurt: None,
            buurt_code: None,
        };
        if level == RegionLevel::Stadsdeel {
            return identity;
        }
        identity.subdivision = tags.stadsdeel_onderverdeling.clone();
        if level == RegionLevel::Subdivision {
            return identity;
        }
        identity.wijk = tags.wijk.clone();
        identity.wijk_code = tags.wijk_code.clone();
        if level == RegionLevel::Wijk {
            return identity;
        }
        identity.buurt = tags.buurt.clone();
        identity.buurt_code = tags.buurt_code.clone();
        identity
    }
}

/// Compute every region row for one filter combination. Listings lacking a
/// tag at the combination's resolution sit this one out; regions only appear
/// when at least one listing matches the filters.
pub fn compute_combination(listings: &[TaggedListing], combo: &FilterCombo, cfg: &AppConfig) -> Vec<StatsRow> {
    let mut groups: BTreeMap<&str, Vec<&TaggedListing>> = BTreeMap::new();
    for l in listings {
        if !combo.matches(l) {
            continue;
        }
        if let Some(key) = l.tags.key_at(combo.resolution) {
            groups.entry(key).or_default().push(l);
        }
    }

    let mut rows = Vec::with_capacity(groups.len());
    for (_, group) in groups {
        let identity = RegionIdentity::at(combo.resolution, &group[0].tags);

        let mut values: Vec<f64> = group
            .iter()
            .filter_map(|l| combo.measure.extract(l))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let raw_count = values.len();

        // ln is monotonic, so the log vector inherits the sort order.
        let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
        let (trimmed, trimmed_logs) = trim_by_log_window(&values, &logs, cfg);

        if trimmed.len() < cfg.stats_min_sample || trimmed.len() < 2 {
            rows.push(StatsRow::insufficient(combo, identity, raw_count));
            continue;
        }

        let log_mean = mean(&trimmed_logs).unwrap_or(f64::NAN);
        let log_std = sample_std(&trimmed_logs).unwrap_or(f64::NAN);

        rows.push(StatsRow {
            region_resolution: combo.resolution.as_str().to_string(),
            stadsdeel: identity.stadsdeel,
            subdivision: identity.subdivision,
            wijk: identity.wijk,
            wijk_code: identity.wijk_code,
            buurt: identity.buurt,
            buurt_code: identity.buurt_code,
            post_type: combo.post_type.as_str().to_string(),
            property_type: combo.property_filter.as_str().to_string(),
            furnished: combo.furnished_filter.map(|f| f.as_str().to_string()),
            value: combo.measure.as_str().to_string(),
            number_of_properties: raw_count as i64,
            median: quantile(&trimmed, 0.5),
            q1: quantile(&trimmed, 0.25),
            q3: quantile(&trimmed, 0.75),
            mode: unique_mode(&trimmed),
            geometric_mean: Some(log_mean.exp()),
            geometric_std: Some(log_std.exp()),
            geometric_conf_int_95_low: Some((log_mean - Z_95 * log_std).exp()),
            geometric_conf_int_95_upp: Some((log_mean + Z_95 * log_std).exp()),
            geometric_conf_int_75_low: Some((log_mean - Z_75 * log_std).exp()),
            geometric_conf_int_75_upp: Some((log_mean + Z_75 * log_std).exp()),
            geometric_conf_int_50_low: Some((log_mean - Z_50 * log_std).exp()),
            geometric_conf_int_50_upp: Some((log_mean + Z_50 * log_std).exp()),
        });
    }
    rows
}

/// Keep the values whose log lies inside the closed [lower, upper] quantile
/// window of the log-transformed sample. Both slices are sorted and aligned.
fn trim_by_log_window(values: &[f64], logs: &[f64], cfg: &AppConfig) -> (Vec<f64>, Vec<f64>) {
    let (Some(lo), Some(hi)) = (
        quantile(logs, cfg.outlier_lower),
        quantile(logs, cfg.outlier_upper),
    ) else {
        return (Vec::new(), Vec::new());
    };
    let mut trimmed = Vec::with_capacity(values.len());
    let mut trimmed_logs = Vec::with_capacity(values.len());
    for (v, lg) in values.iter().zip(logs) {
        if *lg >= lo && *lg <= hi {
            trimmed.push(*v);
            trimmed_logs.push(*lg);
        }
    }
    (trimmed, trimmed_logs)
}

/// Sweep the whole filter space over one listing snapshot. Combinations are
/// independent and read-only over the shared slice, so they run in parallel;
/// each contributes a disjoint set of output rows.
pub fn run_sweep(listings: &[TaggedListing], cfg: &AppConfig) -> Vec<StatsRow> {
    let kept: Vec<TaggedListing> = listings
        .iter()
        .filter(|l| {
            l.tags
                .stadsdeel
                .as_deref()
                .map(|s| !cfg.excluded_districts.iter().any(|x| x == s))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    filter_space()
        .par_iter()
        .flat_map(|combo| compute_combination(&kept, combo, cfg))
        .collect()
}
