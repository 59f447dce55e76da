use crate::error::{Error, Result};

use super::QuoteSheet;

const BLANK_ROW: [&str; 4] = ["", "", "", ""];

/// Write the sheet as CSV, one spreadsheet row per record.
///
/// Metadata rows have two cells, everything else four.
pub fn write_csv(sheet: &QuoteSheet) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for row in &sheet.metadata {
        writer.write_record([row.label, row.value.as_str()]).map_err(export_error)?;
    }
    writer.write_record(BLANK_ROW).map_err(export_error)?;

    writer.write_record(sheet.columns).map_err(export_error)?;
    for row in &sheet.rows {
        let quantity = row.quantity.to_string();
        let unit_cost = row.unit_cost.to_string();
        let total_cost = row.total_cost.to_string();
        writer
            .write_record([
                row.label.as_str(),
                quantity.as_str(),
                unit_cost.as_str(),
                total_cost.as_str(),
            ])
            .map_err(export_error)?;
    }

    writer.write_record(BLANK_ROW).map_err(export_error)?;
    let grand_total = sheet.grand_total.to_string();
    writer
        .write_record(["", "", "Grand Total", grand_total.as_str()])
        .map_err(export_error)?;

    writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))
}

fn export_error(e: csv::Error) -> Error {
    Error::Export(e.to_string())
}
