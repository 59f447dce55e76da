use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::export::{Document, ExportFormat, Exporter};
use crate::models::*;
use crate::pricing;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Project types
// ============================================================

pub async fn list_project_types(
    State(db): State<Database>,
) -> Result<Json<Vec<ProjectTypeWithResources>>> {
    db.list_project_types_with_resources().map(Json)
}

pub async fn get_project_type(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<ProjectTypeWithResources>> {
    let id = parse_id(&id, "Project type")?;
    db.get_project_type_with_resources(id)?
        .map(Json)
        .ok_or(Error::NotFound("Project type"))
}

pub async fn create_project_type(
    State(db): State<Database>,
    Json(input): Json<CreateProjectTypeInput>,
) -> Result<(StatusCode, Json<ProjectType>)> {
    db.create_project_type(input)
        .map(|pt| (StatusCode::CREATED, Json(pt)))
}

pub async fn update_project_type(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProjectTypeInput>,
) -> Result<Json<ProjectType>> {
    let id = parse_id(&id, "Project type")?;
    db.update_project_type(id, input)?
        .map(Json)
        .ok_or(Error::NotFound("Project type"))
}

pub async fn delete_project_type(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id, "Project type")?;
    if db.delete_project_type(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("Project type"))
    }
}

/// Body of the unit-cost lookup used by the add-item form.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnitCostResponse {
    pub unit_cost: f64,
}

/// Current unit cost of a project type, rounded to cents.
pub async fn get_unit_cost(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<UnitCostResponse>> {
    let id = parse_id(&id, "Project type")?;
    let unit_cost = db.unit_cost(id)?.ok_or(Error::NotFound("Project type"))?;
    Ok(Json(UnitCostResponse {
        unit_cost: pricing::round_cents(unit_cost),
    }))
}

// ============================================================
// Resources
// ============================================================

pub async fn list_resources(
    State(db): State<Database>,
    Path(project_type_id): Path<String>,
) -> Result<Json<Vec<Resource>>> {
    let project_type_id = parse_id(&project_type_id, "Project type")?;
    db.get_project_type(project_type_id)?
        .ok_or(Error::NotFound("Project type"))?;

    db.get_resources(project_type_id).map(Json)
}

pub async fn create_resource(
    State(db): State<Database>,
    Path(project_type_id): Path<String>,
    Json(input): Json<CreateResourceInput>,
) -> Result<(StatusCode, Json<Resource>)> {
    let project_type_id = parse_id(&project_type_id, "Project type")?;
    db.add_resource(project_type_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
}

pub async fn get_resource(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Resource>> {
    let id = parse_id(&id, "Resource")?;
    db.get_resource(id)?
        .map(Json)
        .ok_or(Error::NotFound("Resource"))
}

pub async fn update_resource(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<UpdateResourceInput>,
) -> Result<Json<Resource>> {
    let id = parse_id(&id, "Resource")?;
    db.update_resource(id, input)?
        .map(Json)
        .ok_or(Error::NotFound("Resource"))
}

pub async fn delete_resource(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id, "Resource")?;
    if db.delete_resource(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("Resource"))
    }
}

// ============================================================
// Quotes
// ============================================================

pub async fn list_quotes(State(db): State<Database>) -> Result<Json<Vec<QuoteSummary>>> {
    db.list_quotes().map(Json)
}

pub async fn create_quote(
    State(db): State<Database>,
    Json(input): Json<CreateQuoteInput>,
) -> Result<(StatusCode, Json<Quote>)> {
    db.create_quote(input).map(|q| (StatusCode::CREATED, Json(q)))
}

pub async fn get_quote(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<QuoteDetail>> {
    let id = parse_id(&id, "Quote")?;
    db.get_quote_detail(id)?
        .map(Json)
        .ok_or(Error::NotFound("Quote"))
}

pub async fn delete_quote(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id, "Quote")?;
    if db.delete_quote(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("Quote"))
    }
}

pub async fn add_item(
    State(db): State<Database>,
    Path(quote_id): Path<String>,
    Json(input): Json<AddItemInput>,
) -> Result<(StatusCode, Json<QuoteItem>)> {
    let quote_id = parse_id(&quote_id, "Quote")?;
    db.add_item(quote_id, input)
        .map(|item| (StatusCode::CREATED, Json(item)))
}

pub async fn remove_item(
    State(db): State<Database>,
    Path((quote_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let quote_id = parse_id(&quote_id, "Quote")?;
    let item_id = parse_id(&item_id, "Quote item")?;
    if db.remove_item(quote_id, item_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("Quote item"))
    }
}

/// Query parameters for exporting a quote.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Defaults to an Excel workbook.
    pub format: Option<ExportFormat>,
}

pub async fn export_quote(
    State(db): State<Database>,
    State(exporter): State<Exporter>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Document> {
    let id = parse_id(&id, "Quote")?;
    let detail = db.get_quote_detail(id)?.ok_or(Error::NotFound("Quote"))?;
    exporter
        .export(&detail, query.format.unwrap_or(ExportFormat::Xlsx))
        .await
}
