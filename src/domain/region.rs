use serde::Serialize;

/// The four resolutions statistics are aggregated at, finest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegionLevel {
    Stadsdeel,
    Subdivision,
    Wijk,
    Buurt,
}

impl RegionLevel {
    pub const ALL: [RegionLevel; 4] = [
        RegionLevel::Stadsdeel,
        RegionLevel::Subdivision,
        RegionLevel::Wijk,
        RegionLevel::Buurt,
    ];

    /// Warehouse/API spelling of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionLevel::Stadsdeel => "stadsdeel",
            RegionLevel::Subdivision => "stadsdeel_onderverdeling",
            RegionLevel::Wijk => "wijk",
            RegionLevel::Buurt => "buurt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stadsdeel" => Some(RegionLevel::Stadsdeel),
            "stadsdeel_onderverdeling" => Some(RegionLevel::Subdivision),
            "wijk" => Some(RegionLevel::Wijk),
            "buurt" => Some(RegionLevel::Buurt),
            _ => None,
        }
    }
}

/// Region tags carried by a listing: the full ancestry of its home buurt.
/// After consolidation the names may be composites ("A & B"). Subdivision is
/// absent outside the core city, codes are absent above wijk level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTags {
    pub gemeente: String,
    pub stadsdeel: Option<String>,
    pub stadsdeel_onderverdeling: Option<String>,
    pub wijk: Option<String>,
    pub wijk_code: Option<String>,
    pub buurt: Option<String>,
    pub buurt_code: Option<String>,
}

impl RegionTags {
    /// The grouping key at a resolution, if this listing carries one.
    pub fn key_at(&self, level: RegionLevel) -> Option<&str> {
        match level {
            RegionLevel::Stadsdeel => self.stadsdeel.as_deref(),
            RegionLevel::Subdivision => self.stadsdeel_onderverdeling.as_deref(),
            RegionLevel::Wijk => self.wijk.as_deref(),
            RegionLevel::Buurt => self.buurt.as_deref(),
        }
    }
}
