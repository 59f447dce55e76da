use std::io::Cursor;

use axum::http::StatusCode;
use axum_test::TestServer;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use quoter::api::{create_router, AppState};
use quoter::config::Config;
use quoter::db::Database;
use quoter::export::PdfRenderer;
use quoter::models::*;
use serde_json::{json, Value};
use uuid::Uuid;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let state = AppState::new(db, PdfRenderer::disabled()).expect("Failed to build state");
    let app = create_router(state, &Config::default());
    TestServer::new(app).expect("Failed to create test server")
}

/// Creates "Mural" priced at 40 per unit.
async fn create_project_type(server: &TestServer) -> ProjectType {
    let pt = server
        .post("/api/v1/project-types")
        .json(&json!({ "name": "Mural" }))
        .await
        .json::<ProjectType>();

    for (name, hours, rate) in [("Painter", 2.0, 10.0), ("Designer", 1.0, 20.0)] {
        server
            .post(&format!("/api/v1/project-types/{}/resources", pt.id))
            .json(&json!({ "name": name, "hours_per_unit": hours, "rate_per_hour": rate }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    pt
}

async fn create_quote(server: &TestServer) -> Quote {
    server
        .post("/api/v1/quotes")
        .json(&json!({
            "client_name": "Acme",
            "project_name": "Lobby",
            "project_date": "2024-03-01"
        }))
        .await
        .json::<Quote>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }
}

mod project_types {
    use super::*;

    #[tokio::test]
    async fn get_returns_resources_and_unit_cost() {
        let server = setup();
        let pt = create_project_type(&server).await;

        let response = server
            .get(&format!("/api/v1/project-types/{}", pt.id))
            .await;

        response.assert_status_ok();
        let body: ProjectTypeWithResources = response.json();
        assert_eq!(body.project_type.name, "Mural");
        assert_eq!(body.resources.len(), 2);
        assert_eq!(body.unit_cost, 40.0);
    }

    #[tokio::test]
    async fn get_unknown_returns_not_found() {
        let server = setup();
        server
            .get(&format!("/api/v1/project-types/{}", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let server = setup();
        create_project_type(&server).await;

        server
            .post("/api/v1/project-types")
            .json(&json!({ "name": "Mural" }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_is_rejected_while_referenced() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;
        server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 1 }))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .delete(&format!("/api/v1/project-types/{}", pt.id))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .delete(&format!("/api/v1/quotes/{}", quote.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/api/v1/project-types/{}", pt.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn negative_hours_are_rejected() {
        let server = setup();
        let pt = create_project_type(&server).await;

        server
            .post(&format!("/api/v1/project-types/{}/resources", pt.id))
            .json(&json!({ "name": "Helper", "hours_per_unit": -1.0, "rate_per_hour": 10.0 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

mod unit_cost_lookup {
    use super::*;

    #[tokio::test]
    async fn returns_unit_cost_rounded_to_cents() {
        let server = setup();
        let pt = server
            .post("/api/v1/project-types")
            .json(&json!({ "name": "Survey" }))
            .await
            .json::<ProjectType>();
        server
            .post(&format!("/api/v1/project-types/{}/resources", pt.id))
            .json(&json!({ "name": "Surveyor", "hours_per_unit": 1.333, "rate_per_hour": 10.0 }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/project-type/{}/unit-cost", pt.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "unit_cost": 13.33 }));
    }

    #[tokio::test]
    async fn project_type_without_resources_costs_zero() {
        let server = setup();
        let pt = server
            .post("/api/v1/project-types")
            .json(&json!({ "name": "Walkthrough" }))
            .await
            .json::<ProjectType>();

        let response = server
            .get(&format!("/api/v1/project-types/{}/unit-cost", pt.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["unit_cost"], 0.0);
    }

    #[tokio::test]
    async fn unknown_project_type_is_not_found() {
        let server = setup();
        server
            .get(&format!("/project-type/{}/unit-cost", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod quotes_api {
    use super::*;

    #[tokio::test]
    async fn creates_quote_with_zero_grand_total() {
        let server = setup();
        let quote = create_quote(&server).await;

        let response = server.get(&format!("/api/v1/quotes/{}", quote.id)).await;

        response.assert_status_ok();
        let detail: QuoteDetail = response.json();
        assert_eq!(detail.quote.client_name, "Acme");
        assert!(detail.items.is_empty());
        assert_eq!(detail.grand_total, 0.0);
    }

    #[tokio::test]
    async fn blank_client_is_a_bad_request() {
        let server = setup();
        let response = server
            .post("/api/v1/quotes")
            .json(&json!({
                "client_name": " ",
                "project_name": "Lobby",
                "project_date": "2024-03-01"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "All fields are required.");
    }

    #[tokio::test]
    async fn add_item_validates_quantity() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;

        server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 0 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 3, "custom_label": "North wall" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let detail = server
            .get(&format!("/api/v1/quotes/{}", quote.id))
            .await
            .json::<QuoteDetail>();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].label, "North wall");
        assert_eq!(detail.items[0].total_cost, 120.0);
        assert_eq!(detail.grand_total, 120.0);
    }

    #[tokio::test]
    async fn add_item_to_missing_quote_is_not_found() {
        let server = setup();
        let pt = create_project_type(&server).await;

        server
            .post(&format!("/api/v1/quotes/{}/items", Uuid::new_v4()))
            .json(&json!({ "project_type_id": pt.id, "quantity": 1 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn removes_item() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;
        let item = server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 1 }))
            .await
            .json::<QuoteItem>();

        server
            .delete(&format!("/api/v1/quotes/{}/items/{}", quote.id, item.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/api/v1/quotes/{}/items/{}", quote.id, item.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleted_quote_is_not_found() {
        let server = setup();
        let quote = create_quote(&server).await;

        server
            .delete(&format!("/api/v1/quotes/{}", quote.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/quotes/{}", quote.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod export {
    use super::*;

    #[tokio::test]
    async fn csv_has_items_and_grand_total() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;
        server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 3 }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/quote/{}/export/csv", quote.id))
            .await;

        response.assert_status_ok();
        let disposition = response.header("content-disposition");
        assert_eq!(
            disposition.to_str().unwrap(),
            format!("attachment; filename=quote_{}.csv", quote.id)
        );
        let body = response.text();
        assert!(body.contains("Client,Acme"));
        assert!(body.contains("Project Label,Quantity,Unit Cost,Total Cost"));
        assert!(body.contains("Mural,3,40.00,120.00"));
        assert!(body.ends_with(",,Grand Total,120.00\n"));
    }

    #[tokio::test]
    async fn excel_link_downloads_workbook() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;
        server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 3, "custom_label": "North wall" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("/quote/{}/export/excel", quote.id))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.header("content-disposition").to_str().unwrap(),
            format!("attachment; filename=quote_{}.xlsx", quote.id)
        );

        let bytes = response.as_bytes().to_vec();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Quote").unwrap();
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("Acme".to_string())));
        assert_eq!(
            range.get_value((7, 0)),
            Some(&Data::String("North wall".to_string()))
        );
        assert_eq!(range.get_value((7, 3)), Some(&Data::Float(120.0)));
        assert_eq!(
            range.get_value((9, 2)),
            Some(&Data::String("Grand Total".to_string()))
        );
        assert_eq!(range.get_value((9, 3)), Some(&Data::Float(120.0)));
    }

    #[tokio::test]
    async fn api_export_defaults_to_workbook() {
        let server = setup();
        let quote = create_quote(&server).await;

        let response = server
            .get(&format!("/api/v1/quotes/{}/export", quote.id))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header("content-disposition").to_str().unwrap(),
            format!("attachment; filename=quote_{}.xlsx", quote.id)
        );
    }

    #[tokio::test]
    async fn html_document_via_api() {
        let server = setup();
        let quote = create_quote(&server).await;

        let response = server
            .get(&format!("/api/v1/quotes/{}/export", quote.id))
            .add_query_param("format", "html")
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Quote for Acme"));
        assert!(body.contains("Grand Total"));
    }

    #[tokio::test]
    async fn pdf_without_converter_is_unavailable() {
        let server = setup();
        let quote = create_quote(&server).await;

        server
            .get(&format!("/quote/{}/export/pdf", quote.id))
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn missing_quote_is_not_found() {
        let server = setup();
        server
            .get(&format!("/quote/{}/export/csv", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod pages {
    use super::*;

    #[tokio::test]
    async fn new_quote_form_renders() {
        let server = setup();
        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains("name=\"client_name\""));
    }

    #[tokio::test]
    async fn submitting_quote_redirects_to_confirmation() {
        let server = setup();
        let response = server
            .post("/")
            .form(&[
                ("client_name", "Acme"),
                ("project_name", "Lobby"),
                ("project_date", "2024-03-01"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        let location = response.header("location");
        let location = location.to_str().unwrap().to_string();
        assert!(location.starts_with("/confirmation?quote_id="));

        let confirmation = server.get(&location).await;
        confirmation.assert_status_ok();
        assert!(confirmation.text().contains("Acme"));
    }

    #[tokio::test]
    async fn invalid_quote_form_keeps_submitted_values() {
        let server = setup();
        let response = server
            .post("/")
            .form(&[
                ("client_name", "Acme"),
                ("project_name", "Lobby"),
                ("project_date", "2024-13-45"),
            ])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body = response.text();
        assert!(body.contains("Invalid date format. Please use YYYY-MM-DD."));
        assert!(body.contains("value=\"Acme\""));
        assert!(body.contains("value=\"2024-13-45\""));

        let quotes = server.get("/api/v1/quotes").await.json::<Vec<QuoteSummary>>();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn adding_item_through_form() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;

        let form = server
            .get(&format!("/quote/{}/add-item", quote.id))
            .await;
        form.assert_status_ok();
        assert!(form.text().contains("Mural (40.00)"));

        let pt_id = pt.id.to_string();
        let rejected = server
            .post(&format!("/quote/{}/add-item", quote.id))
            .form(&[
                ("project_type", pt_id.as_str()),
                ("quantity", "0"),
                ("custom_label", "Lobby wall"),
            ])
            .await;
        rejected.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(rejected.text().contains("value=\"Lobby wall\""));

        let accepted = server
            .post(&format!("/quote/{}/add-item", quote.id))
            .form(&[
                ("project_type", pt_id.as_str()),
                ("quantity", "2"),
                ("custom_label", ""),
            ])
            .await;
        accepted.assert_status(StatusCode::SEE_OTHER);

        let detail = server.get(&format!("/quote/{}", quote.id)).await;
        detail.assert_status_ok();
        let body = detail.text();
        assert!(body.contains("<td>Mural</td>"));
        assert!(body.contains("80.00"));
    }

    #[tokio::test]
    async fn quote_list_shows_grand_totals() {
        let server = setup();
        let pt = create_project_type(&server).await;
        let quote = create_quote(&server).await;
        server
            .post(&format!("/api/v1/quotes/{}/items", quote.id))
            .json(&json!({ "project_type_id": pt.id, "quantity": 3 }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get("/quotes").await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Acme"));
        assert!(body.contains("120.00"));
    }

    #[tokio::test]
    async fn deleting_quote_redirects_to_list() {
        let server = setup();
        let quote = create_quote(&server).await;

        server
            .post(&format!("/quote/{}/delete", quote.id))
            .await
            .assert_status(StatusCode::SEE_OTHER);

        server
            .get(&format!("/quote/{}", quote.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod malformed_ids {
    use super::*;

    #[tokio::test]
    async fn quote_pages_are_not_found() {
        let server = setup();

        for path in ["/quote/42", "/quote/42/add-item", "/quote/42/export/csv"] {
            server.get(path).await.assert_status(StatusCode::NOT_FOUND);
        }
        server
            .post("/quote/42/delete")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unit_cost_lookup_is_not_found() {
        let server = setup();

        server
            .get("/project-type/42/unit-cost")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/api/v1/project-types/42/unit-cost")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_resources_are_not_found() {
        let server = setup();

        for path in ["/api/v1/quotes/42", "/api/v1/project-types/42", "/api/v1/resources/42"] {
            server.get(path).await.assert_status(StatusCode::NOT_FOUND);
        }

        let quote = create_quote(&server).await;
        server
            .delete(&format!("/api/v1/quotes/{}/items/42", quote.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn confirmation_tolerates_unknown_quote() {
        let server = setup();
        server.get("/confirmation?quote_id=42").await.assert_status_ok();
    }
}
