//! Server-rendered pages.
//!
//! Templates are compiled into the binary and rendered with Tera. Prices are
//! formatted here, so templates only ever print strings.

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use uuid::Uuid;

use crate::error::Result;
use crate::export::QuoteSheet;
use crate::models::{
    CreateQuoteInput, ProjectTypeWithResources, Quote, QuoteDetail, QuoteSummary, DATE_FORMAT,
};
use crate::pricing::format_money;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("confirmation.html", include_str!("../../templates/confirmation.html")),
    ("quotes.html", include_str!("../../templates/quotes.html")),
    ("quote_detail.html", include_str!("../../templates/quote_detail.html")),
    ("add_item.html", include_str!("../../templates/add_item.html")),
    ("export_quote.html", include_str!("../../templates/export_quote.html")),
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Values of the add-item form, echoed back when it has to be shown again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddItemForm {
    pub project_type: String,
    pub quantity: String,
    pub custom_label: String,
}

#[derive(Serialize)]
struct QuoteHeaderView {
    id: Uuid,
    client_name: String,
    project_name: String,
    project_date: String,
    created_at: String,
}

impl From<&Quote> for QuoteHeaderView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            client_name: quote.client_name.clone(),
            project_name: quote.project_name.clone(),
            project_date: quote.project_date.format(DATE_FORMAT).to_string(),
            created_at: quote.created_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

#[derive(Serialize)]
struct ItemView {
    id: Uuid,
    label: String,
    project_type_name: String,
    quantity: u32,
    unit_cost: String,
    total_cost: String,
}

#[derive(Serialize)]
struct QuoteView {
    #[serde(flatten)]
    header: QuoteHeaderView,
    items: Vec<ItemView>,
    grand_total: String,
}

impl From<&QuoteDetail> for QuoteView {
    fn from(detail: &QuoteDetail) -> Self {
        Self {
            header: QuoteHeaderView::from(&detail.quote),
            items: detail
                .items
                .iter()
                .map(|i| ItemView {
                    id: i.item.id,
                    label: i.label.clone(),
                    project_type_name: i.project_type_name.clone(),
                    quantity: i.item.quantity,
                    unit_cost: format_money(i.unit_cost),
                    total_cost: format_money(i.total_cost),
                })
                .collect(),
            grand_total: format_money(detail.grand_total),
        }
    }
}

#[derive(Serialize)]
struct SummaryView {
    #[serde(flatten)]
    header: QuoteHeaderView,
    item_count: usize,
    grand_total: String,
}

#[derive(Serialize)]
struct ProjectTypeOption {
    id: String,
    name: String,
    unit_cost: String,
}

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(name, context)?)
    }

    pub fn quote_form(&self, form: &CreateQuoteInput, error: Option<&str>) -> Result<String> {
        let mut context = Context::new();
        context.insert("form", form);
        context.insert("error", &error);
        self.render("index.html", &context)
    }

    pub fn confirmation(&self, quote: Option<&Quote>) -> Result<String> {
        let mut context = Context::new();
        context.insert("quote", &quote.map(QuoteHeaderView::from));
        self.render("confirmation.html", &context)
    }

    pub fn quote_list(&self, quotes: &[QuoteSummary]) -> Result<String> {
        let quotes: Vec<SummaryView> = quotes
            .iter()
            .map(|q| SummaryView {
                header: QuoteHeaderView::from(&q.quote),
                item_count: q.item_count,
                grand_total: format_money(q.grand_total),
            })
            .collect();

        let mut context = Context::new();
        context.insert("quotes", &quotes);
        self.render("quotes.html", &context)
    }

    pub fn quote_detail(&self, detail: &QuoteDetail) -> Result<String> {
        let mut context = Context::new();
        context.insert("quote", &QuoteView::from(detail));
        self.render("quote_detail.html", &context)
    }

    pub fn add_item_form(
        &self,
        quote: &Quote,
        project_types: &[ProjectTypeWithResources],
        form: &AddItemForm,
        error: Option<&str>,
    ) -> Result<String> {
        let options: Vec<ProjectTypeOption> = project_types
            .iter()
            .map(|pt| ProjectTypeOption {
                id: pt.project_type.id.to_string(),
                name: pt.project_type.name.clone(),
                unit_cost: format_money(pt.unit_cost),
            })
            .collect();

        let mut context = Context::new();
        context.insert("quote", &QuoteHeaderView::from(quote));
        context.insert("project_types", &options);
        context.insert("form", form);
        context.insert("error", &error);
        self.render("add_item.html", &context)
    }

    /// Standalone printable document, also the input to PDF conversion.
    pub fn quote_document(&self, sheet: &QuoteSheet) -> Result<String> {
        let mut context = Context::new();
        context.insert("sheet", sheet);
        self.render("export_quote.html", &context)
    }
}
