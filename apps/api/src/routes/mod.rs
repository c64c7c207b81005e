pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::state::AppState;
use crate::{auth, catalog, combine, export, generation, jobs, prompts};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/login", post(auth::handlers::handle_login))
        .route("/api/v1/auth/logout", post(auth::handlers::handle_logout))
        .route("/api/v1/auth/me", get(auth::handlers::handle_me))
        // Catalog
        .route(
            "/api/v1/items",
            get(catalog::handlers::handle_list_items).post(catalog::handlers::handle_create_item),
        )
        .route(
            "/api/v1/items/refresh",
            post(catalog::handlers::handle_refresh_items),
        )
        .route(
            "/api/v1/items/selection",
            get(catalog::handlers::handle_get_selection)
                .delete(catalog::handlers::handle_clear_selection),
        )
        .route(
            "/api/v1/items/:id",
            get(catalog::handlers::handle_get_item)
                .patch(catalog::handlers::handle_update_item)
                .delete(catalog::handlers::handle_delete_item),
        )
        .route(
            "/api/v1/items/:id/content",
            get(catalog::handlers::handle_item_content),
        )
        .route(
            "/api/v1/items/:id/select",
            post(catalog::handlers::handle_select_item),
        )
        // Generation workflows
        .route(
            "/api/v1/items/:id/photo-jobs",
            post(generation::handlers::handle_create_photo_jobs),
        )
        .route(
            "/api/v1/items/:id/photo-jobs/defaults",
            get(generation::handlers::handle_photo_defaults),
        )
        .route(
            "/api/v1/items/:id/video-jobs",
            post(generation::handlers::handle_create_video_jobs),
        )
        .route(
            "/api/v1/items/:id/story-jobs",
            post(generation::handlers::handle_create_story_job),
        )
        .route(
            "/api/v1/items/:id/export",
            post(export::handlers::handle_export_item),
        )
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handlers::handle_list_jobs).post(jobs::handlers::handle_create_job),
        )
        .route("/api/v1/jobs/refresh", post(jobs::handlers::handle_refresh_jobs))
        .route(
            "/api/v1/jobs/:id",
            patch(jobs::handlers::handle_update_job).delete(jobs::handlers::handle_delete_job),
        )
        // Prompts
        .route(
            "/api/v1/prompts",
            get(prompts::handlers::handle_list_prompts).post(prompts::handlers::handle_add_prompt),
        )
        .route(
            "/api/v1/prompts/suggest",
            post(prompts::handlers::handle_suggest_prompts),
        )
        .route(
            "/api/v1/prompts/:type",
            put(prompts::handlers::handle_update_prompt),
        )
        // Outfit batches
        .route(
            "/api/v1/combines",
            get(combine::handlers::handle_list_combines)
                .post(combine::handlers::handle_submit_batch),
        )
        .route(
            "/api/v1/combines/preview",
            post(combine::handlers::handle_preview),
        )
        .route(
            "/api/v1/combines/refresh",
            post(combine::handlers::handle_refresh_combines),
        )
        .route(
            "/api/v1/combines/:id",
            patch(combine::handlers::handle_update_combine)
                .delete(combine::handlers::handle_delete_combine),
        )
        .route(
            "/api/v1/combines/:id/items",
            get(combine::handlers::handle_combine_items),
        )
        .route(
            "/api/v1/combines/:id/results",
            get(combine::handlers::handle_combine_results),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::export::tests::MemorySink;
    use crate::store::{MemoryRowStore, Table};

    fn test_state() -> (Arc<MemoryRowStore>, AppState) {
        let config = Config::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();
        let backend = Arc::new(MemoryRowStore::new());
        let state = AppState::new(config, backend.clone()).unwrap();
        (backend, state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_item(app: &Router, name: &str, item_type: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": name, "type": item_type, "price": 25.0, "img": format!("https://cdn.example/{name}.jpg") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_, state) = test_state();
        let app = build_router(state);
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["integrations"]["webhook"], false);
    }

    #[tokio::test]
    async fn test_item_crud_and_filter() {
        let (_, state) = test_state();
        let app = build_router(state);
        let shirt = create_item(&app, "oxford", "shirt").await;
        create_item(&app, "derby", "shoes").await;

        let (_, shirts) = send(&app, Method::GET, "/api/v1/items?type=shirt", None).await;
        assert_eq!(shirts.as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/items/{shirt}");
        let (status, patched) = send(&app, Method::PATCH, &uri, Some(json!({ "price": 30.5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["price"], 30.5);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_of_unknown_ids_is_404_without_writes() {
        let (backend, state) = test_state();
        let app = build_router(state);

        let (status, body) = send(&app, Method::DELETE, "/api/v1/items/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        let (status, _) = send(&app, Method::DELETE, "/api/v1/jobs/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_selection_is_cleared_by_delete() {
        let (_, state) = test_state();
        let app = build_router(state);
        let id = create_item(&app, "beret", "hat").await;

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/items/{id}/select"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/api/v1/items/selection", None).await;
        assert_eq!(body["selected"]["id"], id);

        send(&app, Method::DELETE, &format!("/api/v1/items/{id}"), None).await;
        let (_, body) = send(&app, Method::GET, "/api/v1/items/selection", None).await;
        assert!(body["selected"].is_null());
    }

    #[tokio::test]
    async fn test_blank_batch_name_writes_nothing() {
        let (backend, state) = test_state();
        let app = build_router(state);
        let head = create_item(&app, "cap", "hat").await;
        let writes = backend.write_count();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/combines",
            Some(json!({
                "name": "  ",
                "desc": "d",
                "prompt": "p",
                "selection": { "head": [head] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(backend.write_count(), writes);
    }

    #[tokio::test]
    async fn test_batch_rejects_unknown_items_and_empty_selection() {
        let (_, state) = test_state();
        let app = build_router(state);
        let batch = |selection: Value| {
            json!({ "name": "n", "desc": "d", "prompt": "p", "selection": selection })
        };

        let (status, body) = send(&app, Method::POST, "/api/v1/combines", Some(batch(json!({ "top": [999] })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("999"));

        let (status, _) = send(&app, Method::POST, "/api/v1/combines", Some(batch(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_submit_and_results() {
        let (backend, state) = test_state();
        let app = build_router(state);
        let h1 = create_item(&app, "cap", "hat").await;
        let h2 = create_item(&app, "beanie", "hat").await;
        let top = create_item(&app, "tee", "shirt").await;
        let shoe = create_item(&app, "loafer", "shoes").await;
        let selection = json!({ "head": [h1, h2], "top": [top], "shoe": [shoe] });

        let (status, preview) = send(&app, Method::POST, "/api/v1/combines/preview", Some(selection.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["count"], 2);
        assert_eq!(backend.rows(Table::JobCombine).len(), 0);

        let (status, receipt) = send(
            &app,
            Method::POST,
            "/api/v1/combines",
            Some(json!({ "name": "Autumn", "desc": "Campaign", "prompt": "City street", "selection": selection })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["combine"]["status"], "pending");
        assert_eq!(receipt["items"].as_array().unwrap().len(), 2);
        assert_eq!(backend.rows(Table::JobCombineItems).len(), 2);

        let id = receipt["combine"]["id"].as_i64().unwrap();
        let (_, results) = send(&app, Method::GET, &format!("/api/v1/combines/{id}/results"), None).await;
        let rows = results.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["head"]["name"], "cap");
        assert!(rows[0]["bottom"].is_null());

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/combines/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(backend.rows(Table::JobCombineItems).is_empty());
    }

    #[tokio::test]
    async fn test_photo_jobs_from_defaults() {
        let (_, state) = test_state();
        let app = build_router(state);
        let id = create_item(&app, "chino", "trousers").await;

        let (status, created) = send(&app, Method::POST, &format!("/api/v1/items/{id}/photo-jobs"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.as_array().unwrap().len(), 5);
        assert_eq!(created[0]["dispatch"], "skipped");

        let (_, jobs) = send(&app, Method::GET, &format!("/api/v1/jobs?item_id={id}&type=photo"), None).await;
        assert_eq!(jobs.as_array().unwrap().len(), 5);

        let (_, content) = send(&app, Method::GET, &format!("/api/v1/items/{id}/content"), None).await;
        assert_eq!(content["photos"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_optional_integrations_report_unavailable() {
        let (_, state) = test_state();
        let app = build_router(state);
        let id = create_item(&app, "silk", "scarf").await;

        let (status, _) = send(&app, Method::POST, "/api/v1/prompts/suggest", Some(json!({ "name": "silk scarf" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/items/{id}/export"),
            Some(json!({ "targets": ["erp"] })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_export_with_sink() {
        let (_, state) = test_state();
        let sink = Arc::new(MemorySink::default());
        let app = build_router(state.with_export_sink(sink.clone()));
        let id = create_item(&app, "parka", "shirt").await;

        let (status, report) = send(
            &app,
            Method::POST,
            &format!("/api/v1/items/{id}/export"),
            Some(json!({ "targets": ["erp", "stakeholders"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["targets"].as_array().unwrap().len(), 2);
        assert!(!report["exported_at"].is_null());
        assert_eq!(sink.objects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_update_and_list() {
        let (_, state) = test_state();
        let app = build_router(state);
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/prompts/hat",
            Some(json!({ "prompt": "Hat on a wooden stand" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "hat");

        let (_, prompts) = send(&app, Method::GET, "/api/v1/prompts", None).await;
        let hat = prompts
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["type"] == "hat")
            .unwrap()
            .clone();
        assert_eq!(hat["prompt"], "Hat on a wooden stand");
    }
}
