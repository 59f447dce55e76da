//! HTML form handlers.
//!
//! Validation failures re-render the submitted form with the message and a
//! 422 status. Successful submissions redirect (303) so a reload does not
//! post twice.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;

use super::parse_id;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::export::{Document, ExportFormat, Exporter};
use crate::models::{AddItemInput, CreateQuoteInput};
use crate::views::{AddItemForm, Views};

const ITEM_FORM_ERROR: &str = "Please select a project type and enter a valid quantity.";

pub async fn new_quote(State(views): State<Arc<Views>>) -> Result<Html<String>> {
    views.quote_form(&CreateQuoteInput::default(), None).map(Html)
}

pub async fn submit_quote(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
    Form(form): Form<CreateQuoteInput>,
) -> Result<Response> {
    match db.create_quote(form.clone()) {
        Ok(quote) => {
            Ok(Redirect::to(&format!("/confirmation?quote_id={}", quote.id)).into_response())
        }
        Err(Error::Validation(msg)) => {
            let html = views.quote_form(&form, Some(&msg))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationQuery {
    pub quote_id: Option<String>,
}

pub async fn confirmation(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
    Query(query): Query<ConfirmationQuery>,
) -> Result<Html<String>> {
    let quote = match query.quote_id.as_deref().map(Uuid::parse_str) {
        Some(Ok(id)) => db.get_quote(id)?,
        _ => None,
    };
    views.confirmation(quote.as_ref()).map(Html)
}

pub async fn quote_list(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
) -> Result<Html<String>> {
    let quotes = db.list_quotes()?;
    views.quote_list(&quotes).map(Html)
}

pub async fn quote_detail(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id = parse_id(&id, "Quote")?;
    let detail = db.get_quote_detail(id)?.ok_or(Error::NotFound("Quote"))?;
    views.quote_detail(&detail).map(Html)
}

pub async fn delete_quote(State(db): State<Database>, Path(id): Path<String>) -> Result<Redirect> {
    let id = parse_id(&id, "Quote")?;
    if db.delete_quote(id)? {
        Ok(Redirect::to("/quotes"))
    } else {
        Err(Error::NotFound("Quote"))
    }
}

pub async fn add_item_form(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id = parse_id(&id, "Quote")?;
    let quote = db.get_quote(id)?.ok_or(Error::NotFound("Quote"))?;
    let project_types = db.list_project_types_with_resources()?;
    views
        .add_item_form(&quote, &project_types, &AddItemForm::default(), None)
        .map(Html)
}

pub async fn submit_item(
    State(db): State<Database>,
    State(views): State<Arc<Views>>,
    Path(id): Path<String>,
    Form(form): Form<AddItemForm>,
) -> Result<Response> {
    let id = parse_id(&id, "Quote")?;
    let quote = db.get_quote(id)?.ok_or(Error::NotFound("Quote"))?;

    let result = parse_item_form(&form).and_then(|input| db.add_item(id, input));
    match result {
        Ok(_) => Ok(Redirect::to(&format!("/quote/{}", id)).into_response()),
        Err(Error::Validation(msg)) => {
            let project_types = db.list_project_types_with_resources()?;
            let html = views.add_item_form(&quote, &project_types, &form, Some(&msg))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Form fields arrive as strings; anything unparsable is a validation error.
fn parse_item_form(form: &AddItemForm) -> Result<AddItemInput> {
    let project_type_id = Uuid::parse_str(form.project_type.trim())
        .map_err(|_| Error::validation(ITEM_FORM_ERROR))?;
    let quantity = form
        .quantity
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::validation(ITEM_FORM_ERROR))?;

    Ok(AddItemInput {
        project_type_id,
        quantity,
        custom_label: Some(form.custom_label.clone()),
    })
}

pub async fn remove_item(
    State(db): State<Database>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Redirect> {
    let id = parse_id(&id, "Quote")?;
    let item_id = parse_id(&item_id, "Quote item")?;
    if db.remove_item(id, item_id)? {
        Ok(Redirect::to(&format!("/quote/{}", id)))
    } else {
        Err(Error::NotFound("Quote item"))
    }
}

pub async fn export_quote(
    State(db): State<Database>,
    State(exporter): State<Exporter>,
    Path((id, format)): Path<(String, ExportFormat)>,
) -> Result<Document> {
    let id = parse_id(&id, "Quote")?;
    let detail = db.get_quote_detail(id)?.ok_or(Error::NotFound("Quote"))?;
    exporter.export(&detail, format).await
}
