use crate::domain::region::RegionTags;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostType {
    Buy,
    Rent,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Buy => "Buy",
            PostType::Rent => "Rent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(PostType::Buy),
            "Rent" => Some(PostType::Rent),
            _ => None,
        }
    }
}

/// Canonical property type after the taxonomy map. `Room` exists in the data
/// but is not a filter bucket of its own; it only contributes to `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyType {
    Apartment,
    House,
    Room,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Apartment",
            PropertyType::House => "House",
            PropertyType::Room => "Room",
        }
    }
}

/// Canonical furnished status after the taxonomy map, rent only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Furnished {
    Upholstered,
    Furnished,
    Shell,
}

impl Furnished {
    pub fn as_str(&self) -> &'static str {
        match self {
            Furnished::Upholstered => "Upholstered",
            Furnished::Furnished => "Furnished",
            Furnished::Shell => "Shell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Upholstered" => Some(Furnished::Upholstered),
            "Furnished" => Some(Furnished::Furnished),
            "Shell" => Some(Furnished::Shell),
            _ => None,
        }
    }
}

/// One listing as the statistics engine sees it: canonical categories,
/// numeric fields still optional (rows with missing values drop out per
/// measure), and the finalized region tags from the consolidation run.
/// A missing property type only matches the `All` filter; a missing
/// furnished status only matches the `All` furnished filter.
#[derive(Debug, Clone)]
pub struct TaggedListing {
    pub url: String,
    pub post_type: PostType,
    pub property_type: Option<PropertyType>,
    pub furnished: Option<Furnished>,
    pub price: Option<f64>,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub tags: RegionTags,
}
