//! Quoter: build client quotes from priced project types and export them.
//!
//! - [`models`]: catalog and quote records plus their read models
//! - [`pricing`]: unit cost, total cost and grand total
//! - [`db`]: SQLite store with migrations
//! - [`export`]: Excel, CSV, HTML and PDF documents
//! - [`api`]: JSON API and HTML pages on one axum router

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod pricing;
pub mod views;
