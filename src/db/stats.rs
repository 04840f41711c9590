use crate::db::connection::Database;
use crate::domain::listing::PostType;
use crate::domain::region::RegionLevel;
use crate::errors::ServerError;
use crate::stats::engine::StatsRow;
use crate::stats::filters::{FurnishedFilter, Measure, PropertyFilter};
use rusqlite::{params, Row};

/// Replace the statistics table with a fresh sweep. The new rows go into a
/// shadow table first and the swap happens inside the same transaction, so
/// readers see either the old sweep or the new one, never a partial fill.
pub fn replace_stats(db: &Database, rows: &[StatsRow]) -> Result<(), ServerError> {
    db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        tx.execute("DROP TABLE IF EXISTS listing_stats_new", [])
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        tx.execute(
            "CREATE TABLE listing_stats_new AS SELECT * FROM listing_stats WHERE 0",
            [],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

        for row in rows {
            tx.execute(
                r#"
                INSERT INTO listing_stats_new (
                    region_resolution, stadsdeel, subdivision,
                    wijk, wijk_code, buurt, buurt_code,
                    post_type, property_type, furnished, value,
                    number_of_properties,
                    median, q1, q3, mode,
                    geometric_mean, geometric_std,
                    geometric_conf_int_95_low, geometric_conf_int_95_upp,
                    geometric_conf_int_75_low, geometric_conf_int_75_upp,
                    geometric_conf_int_50_low, geometric_conf_int_50_upp
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
                )
                "#,
                params![
                    row.region_resolution,
                    row.stadsdeel,
                    row.subdivision,
                    row.wijk,
                    row.wijk_code,
                    row.buurt,
                    row.buurt_code,
                    row.post_type,
                    row.property_type,
                    row.furnished,
                    row.value,
                    row.number_of_properties,
                    row.median,
                    row.q1,
                    row.q3,
                    row.mode,
                    row.geometric_mean,
                    row.geometric_std,
                    row.geometric_conf_int_95_low,
                    row.geometric_conf_int_95_upp,
                    row.geometric_conf_int_75_low,
                    row.geometric_conf_int_75_upp,
                    row.geometric_conf_int_50_low,
                    row.geometric_conf_int_50_upp,
                ],
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        }

        tx.execute("DROP TABLE listing_stats", [])
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        tx.execute("ALTER TABLE listing_stats_new RENAME TO listing_stats", [])
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(())
    })
}

/// One fully-resolved filter combination as requested over the API.
#[derive(Debug, Clone)]
pub struct StatsQuery {
    pub resolution: RegionLevel,
    pub post_type: PostType,
    pub property_type: PropertyFilter,
    pub furnished: Option<FurnishedFilter>,
    pub value: Measure,
}

const SELECT_COLUMNS: &str = r#"
    region_resolution,         -- 0
    stadsdeel,                 -- 1
    subdivision,               -- 2
    wijk,                      -- 3
    wijk_code,                 -- 4
    buurt,                     -- 5
    buurt_code,                -- 6
    post_type,                 -- 7
    property_type,             -- 8
    furnished,                 -- 9
    value,                     -- 10
    number_of_properties,      -- 11
    median,                    -- 12
    q1,                        -- 13
    q3,                        -- 14
    mode,                      -- 15
    geometric_mean,            -- 16
    geometric_std,             -- 17
    geometric_conf_int_95_low, -- 18
    geometric_conf_int_95_upp, -- 19
    geometric_conf_int_75_low, -- 20
    geometric_conf_int_75_upp, -- 21
    geometric_conf_int_50_low, -- 22
    geometric_conf_int_50_upp  -- 23
"#;

fn map_stats_row(row: &Row) -> rusqlite::Result<StatsRow> {
    Ok(StatsRow {
        region_resolution: row.get(0)?,
        stadsdeel: row.get(1)?,
        subdivision: row.get(2)?,
        wijk: row.get(3)?,
        wijk_code: row.get(4)?,
        buurt: row.get(5)?,
        buurt_code: row.get(6)?,
        post_type: row.get(7)?,
        property_type: row.get(8)?,
        furnished: row.get(9)?,
        value: row.get(10)?,
        number_of_properties: row.get(11)?,
        median: row.get(12)?,
        q1: row.get(13)?,
        q3: row.get(14)?,
        mode: row.get(15)?,
        geometric_mean: row.get(16)?,
        geometric_std: row.get(17)?,
        geometric_conf_int_95_low: row.get(18)?,
        geometric_conf_int_95_upp: row.get(19)?,
        geometric_conf_int_75_low: row.get(20)?,
        geometric_conf_int_75_upp: row.get(21)?,
        geometric_conf_int_50_low: row.get(22)?,
        geometric_conf_int_50_upp: row.get(23)?,
    })
}

/// Rows for one filter combination. `furnished IS ?` so the buy side, which
/// stores NULL, matches when the query carries no furnished filter.
pub fn load_stats(db: &Database, query: &StatsQuery) -> Result<Vec<StatsRow>, ServerError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM listing_stats
         WHERE region_resolution = ?1
           AND post_type = ?2
           AND property_type = ?3
           AND furnished IS ?4
           AND value = ?5
         ORDER BY stadsdeel, subdivision, wijk, buurt"
    );
    let furnished = query.furnished.map(|f| f.as_str());

    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![
                    query.resolution.as_str(),
                    query.post_type.as_str(),
                    query.property_type.as_str(),
                    furnished,
                    query.value.as_str(),
                ],
                map_stats_row,
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })
}

/// Every statistics row, for the spreadsheet export.
pub fn load_all_stats(db: &Database) -> Result<Vec<StatsRow>, ServerError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM listing_stats
         ORDER BY region_resolution, post_type, property_type, furnished,
                  value, stadsdeel, subdivision, wijk, buurt"
    );

    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([], map_stats_row)
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
        }
        Ok(out)
    })
}
