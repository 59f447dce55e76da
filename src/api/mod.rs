mod handlers;
mod pages;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::export::{Exporter, PdfRenderer};
use crate::views::Views;

/// Everything a request handler may need. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub views: Arc<Views>,
    pub exporter: Exporter,
}

impl AppState {
    pub fn new(db: Database, pdf: PdfRenderer) -> Result<Self> {
        let views = Arc::new(Views::new()?);
        let exporter = Exporter::new(views.clone(), pdf);
        Ok(Self {
            db,
            views,
            exporter,
        })
    }

    pub fn from_config(db: Database, config: &Config) -> Result<Self> {
        Self::new(db, PdfRenderer::new(config.wkhtmltopdf.clone()))
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<Views> {
    fn from_ref(state: &AppState) -> Self {
        state.views.clone()
    }
}

impl FromRef<AppState> for Exporter {
    fn from_ref(state: &AppState) -> Self {
        state.exporter.clone()
    }
}

/// Parse an id taken from the URL. Text that is not a UUID cannot name a
/// stored record, so it is reported as not found.
pub(crate) fn parse_id(raw: &str, entity: &'static str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::NotFound(entity))
}

pub fn create_router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        // Project types
        .route(
            "/project-types",
            get(handlers::list_project_types).post(handlers::create_project_type),
        )
        .route(
            "/project-types/{id}",
            get(handlers::get_project_type)
                .put(handlers::update_project_type)
                .delete(handlers::delete_project_type),
        )
        .route(
            "/project-types/{id}/resources",
            get(handlers::list_resources).post(handlers::create_resource),
        )
        .route("/project-types/{id}/unit-cost", get(handlers::get_unit_cost))
        // Resources
        .route(
            "/resources/{id}",
            get(handlers::get_resource)
                .put(handlers::update_resource)
                .delete(handlers::delete_resource),
        )
        // Quotes
        .route(
            "/quotes",
            get(handlers::list_quotes).post(handlers::create_quote),
        )
        .route(
            "/quotes/{id}",
            get(handlers::get_quote).delete(handlers::delete_quote),
        )
        .route("/quotes/{id}/items", post(handlers::add_item))
        .route(
            "/quotes/{id}/items/{item_id}",
            axum::routing::delete(handlers::remove_item),
        )
        .route("/quotes/{id}/export", get(handlers::export_quote))
        // Health
        .route("/health", get(handlers::health));

    let pages = Router::new()
        .route("/", get(pages::new_quote).post(pages::submit_quote))
        .route("/confirmation", get(pages::confirmation))
        .route("/quotes", get(pages::quote_list))
        .route("/quote/{id}", get(pages::quote_detail))
        .route("/quote/{id}/delete", post(pages::delete_quote))
        .route(
            "/quote/{id}/add-item",
            get(pages::add_item_form).post(pages::submit_item),
        )
        .route(
            "/quote/{id}/items/{item_id}/delete",
            post(pages::remove_item),
        )
        .route("/quote/{id}/export/{format}", get(pages::export_quote))
        .route("/project-type/{id}/unit-cost", get(handlers::get_unit_cost));

    Router::new()
        .nest("/api/v1", api)
        .merge(pages)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(config.cors_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Quote").unwrap(), id);
    }

    #[test]
    fn malformed_id_is_not_found() {
        for raw in ["42", "", "not-a-uuid"] {
            let err = parse_id(raw, "Quote").unwrap_err();
            assert!(matches!(err, Error::NotFound("Quote")));
        }
    }
}
