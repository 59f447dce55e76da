use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::error::{Error, Result};

use super::QuoteSheet;

pub const WORKSHEET_NAME: &str = "Quote";

/// Write the sheet as a single-worksheet Excel workbook.
///
/// Metadata starts at row 0, the header follows one blank row, and the grand
/// total sits one blank row below the last item. Quantities and prices are
/// number cells.
pub fn write_xlsx(sheet: &QuoteSheet) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    fill_worksheet(workbook.add_worksheet(), sheet).map_err(export_error)?;
    workbook.save_to_buffer().map_err(export_error)
}

fn fill_worksheet(
    worksheet: &mut Worksheet,
    sheet: &QuoteSheet,
) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(WORKSHEET_NAME)?;

    for (row, meta) in (0u32..).zip(&sheet.metadata) {
        worksheet.write_string(row, 0, meta.label)?;
        worksheet.write_string(row, 1, &meta.value)?;
    }

    let header_row = sheet.metadata.len() as u32 + 1;
    for (col, column) in (0u16..).zip(sheet.columns) {
        worksheet.write_string(header_row, col, column)?;
    }

    let mut row = header_row;
    for item in &sheet.rows {
        row += 1;
        worksheet.write_string(row, 0, &item.label)?;
        worksheet.write_number(row, 1, f64::from(item.quantity))?;
        worksheet.write_number(row, 2, item.unit_cost.0)?;
        worksheet.write_number(row, 3, item.total_cost.0)?;
    }

    let total_row = row + 2;
    worksheet.write_string(total_row, 2, "Grand Total")?;
    worksheet.write_number(total_row, 3, sheet.grand_total.0)?;
    Ok(())
}

fn export_error(e: XlsxError) -> Error {
    Error::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_detail;
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
    use std::io::Cursor;

    fn read_back(sheet: &QuoteSheet) -> Range<Data> {
        let bytes = write_xlsx(sheet).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        workbook.worksheet_range(WORKSHEET_NAME).unwrap()
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn writes_metadata_and_header_rows() {
        let range = read_back(&QuoteSheet::from(&sample_detail()));

        assert_eq!(range.get_value((0, 0)), Some(&text("Quote ID")));
        assert_eq!(
            range.get_value((0, 1)),
            Some(&text("00000000-0000-0000-0000-000000000000"))
        );
        assert_eq!(range.get_value((1, 1)), Some(&text("Acme")));
        assert_eq!(range.get_value((4, 0)), Some(&text("Created At")));
        assert_eq!(range.get_value((4, 1)), Some(&text("2024-02-20 09:30:00")));
        assert!(matches!(range.get_value((5, 0)), None | Some(Data::Empty)));

        assert_eq!(range.get_value((6, 0)), Some(&text("Project Label")));
        assert_eq!(range.get_value((6, 3)), Some(&text("Total Cost")));
    }

    #[test]
    fn writes_items_and_grand_total_as_numbers() {
        let range = read_back(&QuoteSheet::from(&sample_detail()));

        assert_eq!(range.get_value((7, 0)), Some(&text("Mural")));
        assert_eq!(range.get_value((7, 1)), Some(&Data::Float(3.0)));
        assert_eq!(range.get_value((7, 2)), Some(&Data::Float(40.0)));
        assert_eq!(range.get_value((7, 3)), Some(&Data::Float(120.0)));
        assert_eq!(range.get_value((8, 0)), Some(&text("North wall")));

        // Two items: the total lands at 6 + 2 + 2.
        assert_eq!(range.get_value((10, 2)), Some(&text("Grand Total")));
        assert_eq!(range.get_value((10, 3)), Some(&Data::Float(160.0)));
    }

    #[test]
    fn empty_quote_has_total_two_rows_below_header() {
        let mut sheet = QuoteSheet::from(&sample_detail());
        sheet.rows.clear();
        sheet.grand_total = super::super::Money(0.0);

        let range = read_back(&sheet);
        assert_eq!(range.get_value((8, 2)), Some(&text("Grand Total")));
        assert_eq!(range.get_value((8, 3)), Some(&Data::Float(0.0)));
    }
}
