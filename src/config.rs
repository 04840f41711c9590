/// Runtime tunables. There is no config file; overrides happen in code.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub bind_addr: String,
    /// City slug used in listing-index URLs.
    pub city: String,
    /// Minimum listings a region must hold to survive consolidation unmerged.
    pub region_min_listings: usize,
    /// Minimum trimmed sample size before a statistics row gets numbers.
    pub stats_min_sample: usize,
    /// Log-space outlier trim window, quantiles with 0 <= lower < upper <= 1.
    /// (0.0, 1.0) disables trimming.
    pub outlier_lower: f64,
    pub outlier_upper: f64,
    /// Districts dropped before the statistics sweep.
    pub excluded_districts: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "woningmarkt.sqlite3".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            city: "amsterdam".to_string(),
            region_min_listings: 30,
            stats_min_sample: 10,
            outlier_lower: 0.05,
            outlier_upper: 0.95,
            excluded_districts: vec!["Weesp".to_string()],
        }
    }
}
