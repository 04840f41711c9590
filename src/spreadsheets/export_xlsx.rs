use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use crate::stats::engine::StatsRow;
use rust_xlsxwriter::{Workbook, Worksheet};

/// One sheet holding the full statistics table, one row per region and
/// filter combination, empty cells where a row had too little data.
pub fn export_stats_xlsx(rows: &[StatsRow]) -> ResultResp {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let headers = [
        "region_resolution",
        "stadsdeel",
        "subdivision",
        "wijk",
        "wijk_code",
        "buurt",
        "buurt_code",
        "post_type",
        "property_type",
        "furnished",
        "value",
        "number_of_properties",
        "median",
        "q1",
        "q3",
        "mode",
        "geometric_mean",
        "geometric_std",
        "geometric_conf_int_95_low",
        "geometric_conf_int_95_upp",
        "geometric_conf_int_75_low",
        "geometric_conf_int_75_upp",
        "geometric_conf_int_50_low",
        "geometric_conf_int_50_upp",
    ];

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| {
                ServerError::XlsxError(format!("Failed to write header '{}': {}", header, e))
            })?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;

        write_str(worksheet, r, 0, &row.region_resolution)?;
        write_opt_str(worksheet, r, 1, row.stadsdeel.as_deref())?;
        write_opt_str(worksheet, r, 2, row.subdivision.as_deref())?;
        write_opt_str(worksheet, r, 3, row.wijk.as_deref())?;
        write_opt_str(worksheet, r, 4, row.wijk_code.as_deref())?;
        write_opt_str(worksheet, r, 5, row.buurt.as_deref())?;
        write_opt_str(worksheet, r, 6, row.buurt_code.as_deref())?;
        write_str(worksheet, r, 7, &row.post_type)?;
        write_str(worksheet, r, 8, &row.property_type)?;
        write_opt_str(worksheet, r, 9, row.furnished.as_deref())?;
        write_str(worksheet, r, 10, &row.value)?;

        worksheet
            .write_number(r, 11, row.number_of_properties as f64)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write count: {}", e)))?;

        let stats = [
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
        ];
        for (offset, v) in stats.iter().enumerate() {
            write_opt_number(worksheet, r, 12 + offset as u16, *v)?;
        }
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {}", e)))?;

    xlsx_response(buffer, "listing_stats.xlsx")
}

fn write_str(ws: &mut Worksheet, row: u32, col: u16, v: &str) -> Result<(), ServerError> {
    ws.write_string(row, col, v)
        .map_err(|e| ServerError::XlsxError(format!("Failed to write cell: {}", e)))?;
    Ok(())
}

fn write_opt_str(ws: &mut Worksheet, row: u32, col: u16, v: Option<&str>) -> Result<(), ServerError> {
    if let Some(v) = v {
        write_str(ws, row, col, v)?;
    }
    Ok(())
}

fn write_opt_number(ws: &mut Worksheet, row: u32, col: u16, v: Option<f64>) -> Result<(), ServerError> {
    if let Some(v) = v {
        ws.write_number(row, col, v)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write cell: {}", e)))?;
    }
    Ok(())
}
