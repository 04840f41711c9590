use crate::db::connection::Database;
use crate::domain::region::{RegionLevel, RegionTags};
use crate::errors::ServerError;
use crate::geos;
use crate::regions::consolidate::{BuurtGeometry, LevelGeometry};
use rusqlite::params;
use serde::Serialize;

/// Reference buurt polygons with their ancestry, the consolidation input.
pub fn load_buurt_geometry(db: &Database) -> Result<Vec<BuurtGeometry>, ServerError> {
    let raw: Vec<(RegionTags, String)> = db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(
                r#"
                SELECT
                    gemeente,                 -- 0
                    stadsdeel,                -- 1
                    stadsdeel_onderverdeling, -- 2
                    wijk,                     -- 3
                    wijk_code,                -- 4
                    buurt,                    -- 5
                    buurt_code,               -- 6
                    wkt                       -- 7
                FROM region_geometry
                WHERE level = 'buurt'
                ORDER BY gemeente, wijk, buurt
                "#,
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    RegionTags {
                        gemeente: row.get(0)?,
                        stadsdeel: row.get(1)?,
                        stadsdeel_onderverdeling: row.get(2)?,
                        wijk: row.get(3)?,
                        wijk_code: row.get(4)?,
                        buurt: row.get(5)?,
                        buurt_code: row.get(6)?,
                    },
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })?;

    let mut regions = Vec::with_capacity(raw.len());
    for (tags, wkt) in raw {
        let geometry = geos::parse_multi_polygon(&wkt)?;
        regions.push(BuurtGeometry { tags, geometry });
    }
    Ok(regions)
}

/// Persist one consolidation run: the merged region polygons at both serving
/// levels and the per-listing assignments, replaced wholesale in one
/// transaction so readers never see half a run.
pub fn replace_consolidation(
    db: &Database,
    buurt_rows: &[LevelGeometry],
    wijk_rows: &[LevelGeometry],
    assignments: &[(String, RegionTags)],
) -> Result<(), ServerError> {
    db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        tx.execute("DELETE FROM merged_regions", [])
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        tx.execute("DELETE FROM listing_regions", [])
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let levels = [("buurt", buurt_rows), ("wijk", wijk_rows)];
        for (level, rows) in levels {
            for row in rows {
                tx.execute(
                    r#"
                    INSERT INTO merged_regions (
                        level, gemeente, stadsdeel, stadsdeel_onderverdeling,
                        wijk, wijk_code, buurt, buurt_code, listing_count, wkt
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    "#,
                    params![
                        level,
                        row.tags.gemeente,
                        row.tags.stadsdeel,
                        row.tags.stadsdeel_onderverdeling,
                        row.tags.wijk,
                        row.tags.wijk_code,
                        row.tags.buurt,
                        row.tags.buurt_code,
                        row.listing_count as i64,
                        geos::to_wkt_string(&row.geometry),
                    ],
                )
                .map_err(|e| ServerError::DbError(e.to_string()))?;
            }
        }

        for (url, tags) in assignments {
            tx.execute(
                r#"
                INSERT INTO listing_regions (
                    url, gemeente, stadsdeel, stadsdeel_onderverdeling,
                    wijk, wijk_code, buurt, buurt_code
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    url,
                    tags.gemeente,
                    tags.stadsdeel,
                    tags.stadsdeel_onderverdeling,
                    tags.wijk,
                    tags.wijk_code,
                    tags.buurt,
                    tags.buurt_code,
                ],
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
}

/// One region polygon as served to the map: the display name at the
/// requested resolution plus its boundary.
#[derive(Debug, Serialize)]
pub struct ServingRegion {
    pub name: String,
    pub wkt: String,
}

/// Polygons for one serving resolution. Stadsdeel and subdivision shapes
/// come straight from the reference table; wijk and buurt shapes are the
/// consolidator's merged output.
pub fn load_serving_geometry(
    db: &Database,
    level: RegionLevel,
) -> Result<Vec<ServingRegion>, ServerError> {
    let (sql, param) = match level {
        RegionLevel::Stadsdeel => (
            "SELECT stadsdeel, wkt FROM region_geometry
             WHERE level = ?1 AND stadsdeel IS NOT NULL ORDER BY stadsdeel",
            "stadsdeel",
        ),
        RegionLevel::Subdivision => (
            "SELECT stadsdeel_onderverdeling, wkt FROM region_geometry
             WHERE level = ?1 AND stadsdeel_onderverdeling IS NOT NULL
             ORDER BY stadsdeel_onderverdeling",
            "stadsdeel_onderverdeling",
        ),
        RegionLevel::Wijk => (
            "SELECT wijk, wkt FROM merged_regions
             WHERE level = ?1 AND wijk IS NOT NULL ORDER BY wijk",
            "wijk",
        ),
        RegionLevel::Buurt => (
            "SELECT buurt, wkt FROM merged_regions
             WHERE level = ?1 AND buurt IS NOT NULL ORDER BY buurt",
            "buurt",
        ),
    };

    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([param], |row| {
                Ok(ServingRegion {
                    name: row.get(0)?,
                    wkt: row.get(1)?,
                })
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })
}
