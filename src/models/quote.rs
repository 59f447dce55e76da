use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{optional, ProjectType, Resource};
use crate::error::{Error, Result};
use crate::pricing;

/// Date format accepted from forms and written to exports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A client-facing estimate. Owns its items; deleting a quote deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub client_name: String,
    pub project_name: String,
    pub project_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One line of a quote: a quantity of a project type, optionally relabeled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteItem {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub project_type_id: Uuid,
    pub custom_label: Option<String>,
    pub quantity: u32,
    /// Insertion index within the quote. Items are always listed in this order.
    pub position: u32,
}

impl QuoteItem {
    /// The custom label when one was given, otherwise the project type's name.
    pub fn label<'a>(&'a self, project_type: &'a ProjectType) -> &'a str {
        self.custom_label.as_deref().unwrap_or(&project_type.name)
    }
}

/// Raw quote fields as submitted by a form or API client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateQuoteInput {
    pub client_name: String,
    pub project_name: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub project_date: String,
}

/// Validated quote fields, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub client_name: String,
    pub project_name: String,
    pub project_date: NaiveDate,
}

impl CreateQuoteInput {
    pub fn validate(&self) -> Result<NewQuote> {
        let client_name = self.client_name.trim();
        let project_name = self.project_name.trim();
        let project_date = self.project_date.trim();

        if client_name.is_empty() || project_name.is_empty() || project_date.is_empty() {
            return Err(Error::validation("All fields are required."));
        }

        let project_date = NaiveDate::parse_from_str(project_date, DATE_FORMAT)
            .map_err(|_| Error::validation("Invalid date format. Please use YYYY-MM-DD."))?;

        Ok(NewQuote {
            client_name: client_name.to_string(),
            project_name: project_name.to_string(),
            project_date,
        })
    }
}

/// Input for appending an item to a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemInput {
    pub project_type_id: Uuid,
    /// Signed so that zero and negative submissions reach validation.
    pub quantity: i64,
    #[serde(default)]
    pub custom_label: Option<String>,
}

/// Validated item fields. The project type still has to be resolved against
/// the catalog inside the insert transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuoteItem {
    pub project_type_id: Uuid,
    pub quantity: u32,
    pub custom_label: Option<String>,
}

impl AddItemInput {
    pub fn validate(&self) -> Result<NewQuoteItem> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| Error::validation("Quantity must be a whole number of at least 1."))?;

        Ok(NewQuoteItem {
            project_type_id: self.project_type_id,
            quantity,
            custom_label: optional(self.custom_label.as_deref()),
        })
    }
}

/// A quote item with its label and prices resolved from live resource data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedItem {
    #[serde(flatten)]
    pub item: QuoteItem,
    pub project_type_name: String,
    pub label: String,
    pub unit_cost: f64,
    pub total_cost: f64,
}

impl PricedItem {
    pub fn new(item: QuoteItem, project_type: &ProjectType, resources: &[Resource]) -> Self {
        let unit_cost = pricing::unit_cost(resources);
        let total_cost = pricing::total_cost(unit_cost, item.quantity);
        let label = item.label(project_type).to_string();
        Self {
            item,
            project_type_name: project_type.name.clone(),
            label,
            unit_cost,
            total_cost,
        }
    }
}

/// The fully materialized quote aggregate consumed by detail views and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: Quote,
    pub items: Vec<PricedItem>,
    pub grand_total: f64,
}

impl QuoteDetail {
    pub fn new(quote: Quote, items: Vec<PricedItem>) -> Self {
        let grand_total = pricing::grand_total(&items);
        Self {
            quote,
            items,
            grand_total,
        }
    }
}

/// A quote with just enough derived data for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSummary {
    #[serde(flatten)]
    pub quote: Quote,
    pub item_count: usize,
    pub grand_total: f64,
}

impl From<QuoteDetail> for QuoteSummary {
    fn from(detail: QuoteDetail) -> Self {
        Self {
            quote: detail.quote,
            item_count: detail.items.len(),
            grand_total: detail.grand_total,
        }
    }
}
