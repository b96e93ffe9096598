pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::composer::handlers;
use crate::image::MAX_IMAGE_BYTES;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Read side
        .route("/api/v1/form", get(handlers::handle_get_form))
        .route("/api/v1/record", get(handlers::handle_get_record))
        .route("/api/v1/preview", get(handlers::handle_get_preview))
        .route("/api/v1/status", get(handlers::handle_get_status))
        .route("/api/v1/export", get(handlers::handle_export))
        // Mutation pipeline
        .route("/api/v1/fields", post(handlers::handle_edit))
        .route(
            "/api/v1/sections/:section/entries",
            post(handlers::handle_add_entry),
        )
        .route(
            "/api/v1/sections/:section/entries/:ordinal",
            delete(handlers::handle_remove_entry),
        )
        .route("/api/v1/style", put(handlers::handle_set_style))
        .route(
            "/api/v1/profile-picture",
            post(handlers::handle_profile_picture)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/api/v1/reset", post(handlers::handle_reset))
        .route("/api/v1/reload", post(handlers::handle_reload))
        // Suggestions
        .route(
            "/api/v1/suggestions",
            get(handlers::handle_list_suggestions).post(handlers::handle_request_suggestion),
        )
        .route(
            "/api/v1/suggestions/accept",
            post(handlers::handle_accept_suggestion),
        )
        .route(
            "/api/v1/suggestions/dismiss",
            post(handlers::handle_dismiss_suggestion),
        )
        .route(
            "/api/v1/suggestions/copy",
            post(handlers::handle_copy_suggestion),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use super::*;
    use crate::composer::Composer;
    use crate::config::Config;
    use crate::export::HtmlExporter;
    use crate::llm_client::{LlmError, TextImprover};
    use crate::persistence::{MemorySlot, PersistenceGateway};
    use crate::render::Style;

    struct EchoImprover;

    #[async_trait]
    impl TextImprover for EchoImprover {
        async fn improve(&self, text: &str) -> Result<String, LlmError> {
            Ok(format!("Improved: {text}"))
        }
    }

    fn app() -> (Router, Arc<MemorySlot>) {
        let slot = Arc::new(MemorySlot::default());
        let composer = Composer::open(PersistenceGateway::new(slot.clone()), Style::Professional);
        let state = AppState {
            composer: Arc::new(Mutex::new(composer)),
            improver: Arc::new(EchoImprover),
            exporter: Arc::new(HtmlExporter),
            config: Config {
                port: 0,
                rust_log: "info".into(),
                storage_dir: "./unused".into(),
                default_style: Style::Professional,
                anthropic_api_key: None,
                suggestion_timeout: Duration::from_secs(5),
            },
        };
        (build_router(state), slot)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "cv-composer");
    }

    #[tokio::test]
    async fn test_add_edit_and_preview_flow() {
        let (app, slot) = app();
        let (status, body) = send(&app, "POST", "/api/v1/sections/experience/entries", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ordinal"], 0);

        let (_, form) = send(&app, "GET", "/api/v1/form", None).await;
        let work = form["sections"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["section"] == "workExperience")
            .unwrap();
        assert_eq!(form["scalars"][4]["suggestion"]["state"], "idle");
        assert!(form["scalars"][0].get("suggestion").is_none());
        let title_control = work["groups"][0]["fields"][0]["control"].clone();
        assert_eq!(title_control["address"], "workExperience-0-title");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/fields",
            Some(json!({ "control": title_control, "value": "Engineer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        assert!(body["preview"].as_str().unwrap().contains("<strong>Engineer</strong>"));
        assert_eq!(slot.writes(), 2);
    }

    #[tokio::test]
    async fn test_unknown_section_is_rejected() {
        let (app, _) = app();
        let (status, body) = send(&app, "POST", "/api/v1/sections/hobbies/entries", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_remove_with_stale_generation_changes_nothing() {
        let (app, _) = app();
        send(&app, "POST", "/api/v1/sections/skills/entries", None).await;
        send(&app, "POST", "/api/v1/sections/skills/entries", None).await;
        let (_, form) = send(&app, "GET", "/api/v1/form", None).await;
        let generation = form["sections"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["section"] == "skills")
            .unwrap()["generation"]
            .as_u64()
            .unwrap();

        let uri = format!("/api/v1/sections/skills/entries/0?generation={generation}");
        let (_, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(body["applied"], true);
        let (_, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(body["applied"], false);

        let (_, record) = send(&app, "GET", "/api/v1/record", None).await;
        assert_eq!(record["skills"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_suggestion_accept_round_trip() {
        let (app, _) = app();
        let control = json!({ "address": "summary" });
        send(
            &app,
            "POST",
            "/api/v1/fields",
            Some(json!({ "control": control, "value": "I code" })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/suggestions",
            Some(json!({ "control": control })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "ready");
        assert_eq!(body["candidate"], "Improved: I code");

        let (status, copied) = send(
            &app,
            "POST",
            "/api/v1/suggestions/copy",
            Some(json!({ "control": control })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(copied, Value::String("Improved: I code".into()));

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/suggestions/accept",
            Some(json!({ "control": control })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, record) = send(&app, "GET", "/api/v1/record", None).await;
        assert_eq!(record["professionalSummary"], "Improved: I code");
    }

    #[tokio::test]
    async fn test_accept_without_candidate_is_not_found() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/suggestions/accept",
            Some(json!({ "control": { "address": "summary" } })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_style_switch_and_preview_override() {
        let (app, _) = app();
        let (status, body) = send(&app, "PUT", "/api/v1/style", Some(json!({ "style": "modern" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["style"], "modern");

        let (_, html) = send(&app, "GET", "/api/v1/preview?style=professional", None).await;
        assert!(html.as_str().unwrap().contains("cv professional"));
        let (_, html) = send(&app, "GET", "/api/v1/preview", None).await;
        assert!(html.as_str().unwrap().contains("cv modern"));
    }

    #[tokio::test]
    async fn test_export_is_attachment() {
        let (app, _) = app();
        let request = Request::builder()
            .uri("/api/v1/export")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"cv.html\""
        );
    }

    #[tokio::test]
    async fn test_profile_picture_upload() {
        let (app, slot) = app();
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\nPNG\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/profile-picture")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, record) = send(&app, "GET", "/api/v1/record", None).await;
        assert_eq!(
            record["personalDetails"]["profilePicture"],
            "data:image/png;base64,UE5H"
        );
        assert_eq!(slot.writes(), 1);
    }
}
