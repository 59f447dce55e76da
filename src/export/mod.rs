//! Quote export.
//!
//! Every format renders the same [`QuoteSheet`]: metadata rows, a blank row,
//! the item table and a grand total row.

mod pdf;
mod spreadsheet;
mod workbook;

use std::fmt;
use std::sync::Arc;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::models::{QuoteDetail, DATE_FORMAT};
use crate::pricing::format_money;
use crate::views::Views;

pub use pdf::PdfRenderer;
pub use spreadsheet::write_csv;
pub use workbook::{write_xlsx, WORKSHEET_NAME};

/// Column headings of the item table, in order.
pub const COLUMNS: [&str; 4] = ["Project Label", "Quantity", "Unit Cost", "Total Cost"];

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Excel workbook. `excel` is the name used in export links.
    #[serde(alias = "excel")]
    Xlsx,
    Csv,
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

/// A price. Written as a number to workbooks and as a 2-decimal string
/// everywhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Money(pub f64);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetRow {
    pub label: String,
    pub quantity: u32,
    pub unit_cost: Money,
    pub total_cost: Money,
}

/// The fixed document layout shared by every export format.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteSheet {
    pub title: String,
    pub metadata: Vec<MetadataRow>,
    pub columns: [&'static str; 4],
    pub rows: Vec<SheetRow>,
    pub grand_total: Money,
}

impl From<&QuoteDetail> for QuoteSheet {
    fn from(detail: &QuoteDetail) -> Self {
        let quote = &detail.quote;
        let metadata = vec![
            MetadataRow {
                label: "Quote ID",
                value: quote.id.to_string(),
            },
            MetadataRow {
                label: "Client",
                value: quote.client_name.clone(),
            },
            MetadataRow {
                label: "Project",
                value: quote.project_name.clone(),
            },
            MetadataRow {
                label: "Project Date",
                value: quote.project_date.format(DATE_FORMAT).to_string(),
            },
            MetadataRow {
                label: "Created At",
                value: quote.created_at.format(CREATED_AT_FORMAT).to_string(),
            },
        ];

        let rows = detail
            .items
            .iter()
            .map(|item| SheetRow {
                label: item.label.clone(),
                quantity: item.item.quantity,
                unit_cost: Money(item.unit_cost),
                total_cost: Money(item.total_cost),
            })
            .collect();

        Self {
            title: format!("Quote for {}", quote.client_name),
            metadata,
            columns: COLUMNS,
            rows,
            grand_total: Money(detail.grand_total),
        }
    }
}

/// A rendered export, ready to be sent as a download or written to disk.
#[derive(Debug, Clone)]
pub struct Document {
    pub format: ExportFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        let disposition = match self.format {
            ExportFormat::Html => format!("inline; filename={}", self.filename),
            _ => format!("attachment; filename={}", self.filename),
        };
        (
            [
                (header::CONTENT_TYPE, self.format.content_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Renders quotes into downloadable documents.
#[derive(Clone)]
pub struct Exporter {
    views: Arc<Views>,
    pdf: PdfRenderer,
}

impl Exporter {
    pub fn new(views: Arc<Views>, pdf: PdfRenderer) -> Self {
        Self { views, pdf }
    }

    pub async fn export(&self, detail: &QuoteDetail, format: ExportFormat) -> Result<Document> {
        let sheet = QuoteSheet::from(detail);
        let bytes = match format {
            ExportFormat::Xlsx => write_xlsx(&sheet)?,
            ExportFormat::Csv => write_csv(&sheet)?,
            ExportFormat::Html => self.views.quote_document(&sheet)?.into_bytes(),
            ExportFormat::Pdf => {
                let html = self.views.quote_document(&sheet)?;
                self.pdf.render(&html).await?
            }
        };

        tracing::debug!(
            "Exported quote {} as {} ({} bytes)",
            detail.quote.id,
            format.as_str(),
            bytes.len()
        );

        Ok(Document {
            format,
            filename: format!("quote_{}.{}", detail.quote.id, format.as_str()),
            bytes,
        })
    }
}
