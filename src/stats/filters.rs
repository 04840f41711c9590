use crate::domain::listing::{Furnished, PostType, PropertyType, TaggedListing};
use crate::domain::region::RegionLevel;
use serde::Serialize;

/// The five numeric measures statistics are computed over. The two ratios are
/// derived per listing; a zero divisor simply yields no value for that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Measure {
    Price,
    Surface,
    Rooms,
    PricePerM2,
    PricePerRoom,
}

impl Measure {
    pub const ALL: [Measure; 5] = [
        Measure::Price,
        Measure::Surface,
        Measure::Rooms,
        Measure::PricePerM2,
        Measure::PricePerRoom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Price => "price",
            Measure::Surface => "surface",
            Measure::Rooms => "rooms",
            Measure::PricePerM2 => "price_per_m2",
            Measure::PricePerRoom => "price_per_room",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "price" => Some(Measure::Price),
            "surface" => Some(Measure::Surface),
            "rooms" => Some(Measure::Rooms),
            "price_per_m2" => Some(Measure::PricePerM2),
            "price_per_room" => Some(Measure::PricePerRoom),
            _ => None,
        }
    }

    /// Extract this measure from a listing, requiring a strictly positive,
    /// finite value. Missing fields and undefined ratios yield None.
    pub fn extract(&self, l: &TaggedListing) -> Option<f64> {
        let value = match self {
            Measure::Price => l.price?,
            Measure::Surface => l.surface?,
            Measure::Rooms => l.rooms? as f64,
            Measure::PricePerM2 => {
                let surface = l.surface?;
                if surface <= 0.0 {
                    return None;
                }
                l.price? / surface
            }
            Measure::PricePerRoom => {
                let rooms = l.rooms?;
                if rooms <= 0 {
                    return None;
                }
                l.price? / rooms as f64
            }
        };
        (value > 0.0 && value.is_finite()).then_some(value)
    }
}

/// Property-type filter bucket. `Room` listings only ever contribute to
/// `All`; rooms have no bucket of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyFilter {
    All,
    Apartment,
    House,
}

impl PropertyFilter {
    pub const ALL: [PropertyFilter; 3] = [
        PropertyFilter::All,
        PropertyFilter::Apartment,
        PropertyFilter::House,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyFilter::All => "All",
            PropertyFilter::Apartment => "Apartment",
            PropertyFilter::House => "House",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "All" => Some(PropertyFilter::All),
            "Apartment" => Some(PropertyFilter::Apartment),
            "House" => Some(PropertyFilter::House),
            _ => None,
        }
    }

    pub fn matches(&self, property_type: Option<PropertyType>) -> bool {
        match self {
            PropertyFilter::All => true,
            PropertyFilter::Apartment => property_type == Some(PropertyType::Apartment),
            PropertyFilter::House => property_type == Some(PropertyType::House),
        }
    }
}

/// Furnished filter bucket, rent only. Buy combinations carry no furnished
/// dimension at all, so the combo stores Option<FurnishedFilter>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FurnishedFilter {
    All,
    Upholstered,
    Furnished,
    Shell,
}

impl FurnishedFilter {
    pub const ALL: [FurnishedFilter; 4] = [
        FurnishedFilter::All,
        FurnishedFilter::Upholstered,
        FurnishedFilter::Furnished,
        FurnishedFilter::Shell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FurnishedFilter::All => "All",
            FurnishedFilter::Upholstered => "Upholstered",
            FurnishedFilter::Furnished => "Furnished",
            FurnishedFilter::Shell => "Shell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "All" => Some(FurnishedFilter::All),
            "Upholstered" => Some(FurnishedFilter::Upholstered),
            "Furnished" => Some(FurnishedFilter::Furnished),
            "Shell" => Some(FurnishedFilter::Shell),
            _ => None,
        }
    }

    pub fn matches(&self, furnished: Option<Furnished>) -> bool {
        match self {
            FurnishedFilter::All => true,
            FurnishedFilter::Upholstered => furnished == Some(Furnished::Upholstered),
            FurnishedFilter::Furnished => furnished == Some(Furnished::Furnished),
            FurnishedFilter::Shell => furnished == Some(Furnished::Shell),
        }
    }
}

/// One cell of the filter cross product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCombo {
    pub resolution: RegionLevel,
    pub post_type: PostType,
    pub property_filter: PropertyFilter,
    pub furnished_filter: Option<FurnishedFilter>,
    pub measure: Measure,
}

impl FilterCombo {
    pub fn matches(&self, l: &TaggedListing) -> bool {
        if l.post_type != self.post_type {
            return false;
        }
        if !self.property_filter.matches(l.property_type) {
            return false;
        }
        if let Some(f) = self.furnished_filter {
            if !f.matches(l.furnished) {
                return false;
            }
        }
        true
    }
}

/// The full cross product of resolutions, post types, property buckets,
/// furnished buckets and measures. Buy combinations skip the furnished
/// dimension entirely instead of carrying an inapplicable filter.
pub fn filter_space() -> Vec<FilterCombo> {
    let mut combos = Vec::new();
    for resolution in RegionLevel::ALL {
        for post_type in [PostType::Buy, PostType::Rent] {
            let furnished: Vec<Option<FurnishedFilter>> = match post_type {
                PostType::Buy => vec![None],
                PostType::Rent => FurnishedFilter::ALL.into_iter().map(Some).collect(),
            };
            for property_filter in PropertyFilter::ALL {
                for furnished_filter in &furnished {
                    for measure in Measure::ALL {
                        combos.push(FilterCombo {
                            resolution,
                            post_type,
                            property_filter,
                            furnished_filter: *furnished_filter,
                            measure,
                        });
                    }
                }
            }
        }
    }
    combos
}
