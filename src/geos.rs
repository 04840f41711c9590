use crate::errors::ServerError;
use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{BooleanOps, Geometry, MultiPolygon, Relate};
use std::panic::{catch_unwind, AssertUnwindSafe};
use wkt::{ToWkt, TryFromWkt};

/// Parse a POLYGON or MULTIPOLYGON WKT string. Everything downstream works
/// on multi-part polygons, so simple polygons are wrapped on the way in.
pub fn parse_multi_polygon(text: &str) -> Result<MultiPolygon<f64>, ServerError> {
    let geom = Geometry::<f64>::try_from_wkt_str(text)
        .map_err(|e| ServerError::Geometry(format!("WKT parse failed: {e}")))?;
    match geom {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        _ => Err(ServerError::Geometry(
            "expected POLYGON or MULTIPOLYGON".to_string(),
        )),
    }
}

pub fn to_wkt_string(mp: &MultiPolygon<f64>) -> String {
    mp.wkt_string()
}

/// Shared-border test: the two boundaries must intersect in a
/// one-dimensional stretch. Touching in a single corner point or one region
/// containing the other does not count as adjacency.
pub fn shares_border(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    if a.0.is_empty() || b.0.is_empty() {
        return false;
    }
    let im = a.relate(b);
    im.get(CoordPos::OnBoundary, CoordPos::OnBoundary) == Dimensions::OneDimensional
}

/// One union attempt. Boolean ops abort on degenerate rings, so the unwind
/// is caught here and reported as a failed attempt; an empty result counts
/// as failed too.
fn try_union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    match catch_unwind(AssertUnwindSafe(|| a.union(b))) {
        Ok(mp) if !mp.0.is_empty() => Some(mp),
        _ => None,
    }
}

/// Union two region polygons. If the direct union fails, both operands are
/// flattened into their constituent simple polygons and re-unioned one at a
/// time; if that fails as well the error is fatal for the caller, since
/// region identity cannot survive a half-merged polygon.
pub fn union_regions(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, ServerError> {
    if let Some(u) = try_union(a, b) {
        return Ok(u);
    }

    eprintln!("⚠️ Polygon union failed, retrying on flattened operands");
    let mut acc = MultiPolygon::new(Vec::new());
    for poly in a.0.iter().chain(b.0.iter()) {
        let part = MultiPolygon::new(vec![poly.clone()]);
        acc = if acc.0.is_empty() {
            part
        } else {
            try_union(&acc, &part).ok_or_else(|| {
                ServerError::Geometry("polygon union failed after flattening".to_string())
            })?
        };
    }
    if acc.0.is_empty() {
        return Err(ServerError::Geometry(
            "polygon union produced empty geometry".to_string(),
        ));
    }
    Ok(acc)
}

/// Union a whole group of polygons (used to dissolve buurt polygons up to
/// wijk level).
pub fn union_many(parts: &[&MultiPolygon<f64>]) -> Result<MultiPolygon<f64>, ServerError> {
    let mut iter = parts.iter();
    let first = iter
        .next()
        .ok_or_else(|| ServerError::Geometry("empty dissolve group".to_string()))?;
    let mut acc = (*first).clone();
    for mp in iter {
        acc = union_regions(&acc, mp)?;
    }
    Ok(acc)
}
