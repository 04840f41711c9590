use crate::domain::listing::{Furnished, PropertyType};
use crate::errors::ServerError;

/// Map a raw source property-type label onto the canonical taxonomy.
/// The map is exhaustive on purpose: an unknown label aborts the run instead
/// of leaking a null category into the statistics table.
pub fn map_property_type(raw: &str) -> Result<PropertyType, ServerError> {
    match raw {
        "Appartement" | "Flat" | "Studio" | "Apartment" => Ok(PropertyType::Apartment),
        "House" | "Huis" => Ok(PropertyType::House),
        "Room" | "Kamer" => Ok(PropertyType::Room),
        other => Err(ServerError::Taxonomy(format!(
            "unmapped property type: {other:?}"
        ))),
    }
}

/// Map a raw furnished label onto the canonical taxonomy. Same loud-failure
/// rule as property types. Only meaningful for rent listings.
pub fn map_furnished(raw: &str) -> Result<Furnished, ServerError> {
    match raw {
        "Upholstered" | "Gestoffeerd" => Ok(Furnished::Upholstered),
        "Furnished" | "Upholstered or furnished" | "Gemeubileerd" => Ok(Furnished::Furnished),
        "Shell" | "Kaal" => Ok(Furnished::Shell),
        other => Err(ServerError::Taxonomy(format!(
            "unmapped furnished status: {other:?}"
        ))),
    }
}

/// Determine the canonical listing status from a source availability label.
/// The order of checks determines the precedence of the status lifecycle:
/// a sold/rented-out label wins over an under-offer label.
pub fn derive_listing_status(label: Option<&str>) -> &'static str {
    let Some(label) = label else {
        return "Available";
    };
    let lower = label.to_lowercase();
    if lower.contains("verkocht") || lower.contains("verhuurd") {
        return "Unavailable";
    }
    if lower.contains("onder bod") || lower.contains("onder optie") || lower.contains("in overleg")
    {
        return "In negotiations";
    }
    "Available"
}
