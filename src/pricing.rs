//! Quote pricing.
//!
//! Nothing here is cached or persisted. Callers pass live resource rows and
//! get prices back, so a rate change is visible on every existing item the
//! next time it is read.

use crate::models::{PricedItem, Resource};

/// Price of one unit of a project type: the sum of `hours_per_unit *
/// rate_per_hour` over its resources. A project type with no resources
/// costs nothing.
pub fn unit_cost(resources: &[Resource]) -> f64 {
    resources
        .iter()
        .map(|r| r.hours_per_unit * r.rate_per_hour)
        .sum()
}

pub fn total_cost(unit_cost: f64, quantity: u32) -> f64 {
    unit_cost * f64::from(quantity)
}

/// Sum of the items' total costs.
pub fn grand_total(items: &[PricedItem]) -> f64 {
    items.iter().map(|i| i.total_cost).sum()
}

/// Round to whole cents for display.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}
