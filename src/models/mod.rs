//! Domain models for Quoter.
//!
//! # Catalog
//!
//! - [`ProjectType`]: a billable category of work, priced from its resources.
//! - [`Resource`]: a labor unit (hours per unit at an hourly rate) owned by
//!   exactly one project type.
//!
//! # Quotes
//!
//! - [`Quote`]: the client-facing header (client, project, date).
//! - [`QuoteItem`]: one ordered line of a quote, a quantity of a project type.
//!
//! Prices are never stored. The read models ([`ProjectTypeWithResources`],
//! [`PricedItem`], [`QuoteDetail`], [`QuoteSummary`]) are built from live
//! resource rows through the functions in [`crate::pricing`].

mod catalog;
mod quote;

pub use catalog::*;
pub use quote::*;

use crate::error::{Error, Result};

/// Trim a required text field, rejecting blank values.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required.", field)));
    }
    Ok(value.to_string())
}

/// Trim an optional text field; blank becomes `None`.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
