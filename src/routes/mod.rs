use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod docs;
pub mod health;
pub mod public;
pub mod session;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(public::router())
        .merge(session::router())
        .merge(admin::router(state.clone()))
        .merge(sse::router());

    api_router.merge(docs::router()).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::timer_store::memory::MemoryTimerStore,
        state::{AppState, clock::ManualClock},
    };

    const ADMIN: &str = "gm@neon.example";

    struct Harness {
        state: SharedState,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        async fn new() -> Self {
            let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
            let state = AppState::with_clock(
                &AppConfig {
                    admin_emails: vec![ADMIN.into()],
                    ..AppConfig::default()
                },
                clock.clone(),
            );
            state
                .store()
                .install(Arc::new(MemoryTimerStore::new()))
                .await;
            Self { state, clock }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            router(self.state.clone()).oneshot(request).await.unwrap()
        }

        async fn sign_in(&self) -> String {
            let response = self
                .send(
                    Request::post("/admin/session")
                        .header("x-forwarded-email", ADMIN)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["token"]
                .as_str()
                .unwrap()
                .to_string()
        }

        async fn admin(
            &self,
            method: Method,
            uri: &str,
            token: &str,
            body: Option<Value>,
        ) -> Response {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-admin-token", token);
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.send(request).await
        }

        async fn submit(&self, password: &str) -> Response {
            self.send(
                Request::post("/public/password")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "password": password }).to_string()))
                    .unwrap(),
            )
            .await
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let harness = Harness::new().await;
        let response = harness
            .send(Request::get("/healthcheck").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let harness = Harness::new().await;
        let response = harness
            .send(
                Request::get(docs::OPENAPI_JSON_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/public/password"].is_object());
    }

    #[tokio::test]
    async fn admin_routes_require_a_session() {
        let harness = Harness::new().await;
        let response = harness
            .send(
                Request::post("/admin/timer/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = harness
            .admin(Method::POST, "/admin/timer/reset", "forged", None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_in_rejects_unknown_identity() {
        let harness = Harness::new().await;
        let response = harness
            .send(
                Request::post("/admin/session")
                    .header("x-forwarded-email", "player@neon.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn full_run_through_the_http_surface() {
        let harness = Harness::new().await;
        let token = harness.sign_in().await;

        let response = harness
            .admin(
                Method::POST,
                "/admin/timer/start",
                &token,
                Some(json!({ "team_name": "Team A" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let started = body_json(response).await;
        assert_eq!(started["status"], "running");
        assert_eq!(started["remaining_seconds"], 900);

        harness.clock.advance(Duration::from_secs(300));
        let response = harness
            .send(Request::get("/public/timer").body(Body::empty()).unwrap())
            .await;
        assert_eq!(body_json(response).await["remaining_seconds"], 600);

        let response = harness.submit("nope").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = harness.submit("EscapeNeon ").await;
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        assert_eq!(record["team_name"], "Team A");
        assert_eq!(record["remaining_time"], 600);
        assert_eq!(record["elapsed_time"], 300);

        let response = harness.submit("escapeneon").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = harness
            .admin(Method::GET, "/admin/records", &token, None)
            .await;
        let records = body_json(response).await;
        assert_eq!(records["records"].as_array().unwrap().len(), 1);

        let id = record["id"].as_str().unwrap();
        let uri = format!("/admin/records/{id}");
        let response = harness.admin(Method::DELETE, &uri, &token, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = harness.admin(Method::DELETE, &uri, &token, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pause_accepts_explicit_or_derived_remaining() {
        let harness = Harness::new().await;
        let token = harness.sign_in().await;
        harness
            .admin(
                Method::POST,
                "/admin/timer/start",
                &token,
                Some(json!({ "team_name": "Team A" })),
            )
            .await;

        harness.clock.advance(Duration::from_secs(100));
        let response = harness
            .admin(Method::POST, "/admin/timer/pause", &token, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let paused = body_json(response).await;
        assert_eq!(paused["status"], "paused");
        assert_eq!(paused["remaining_seconds"], 800);

        let response = harness
            .admin(Method::POST, "/admin/timer/resume", &token, None)
            .await;
        assert_eq!(body_json(response).await["status"], "running");

        let response = harness
            .admin(
                Method::POST,
                "/admin/timer/pause",
                &token,
                Some(json!({ "remaining_seconds": 450 })),
            )
            .await;
        assert_eq!(body_json(response).await["remaining_seconds"], 450);
    }

    #[tokio::test]
    async fn blank_inputs_are_bad_requests() {
        let harness = Harness::new().await;
        let token = harness.sign_in().await;

        let response = harness
            .admin(
                Method::POST,
                "/admin/timer/start",
                &token,
                Some(json!({ "team_name": "  " })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = harness
            .admin(
                Method::PUT,
                "/admin/password",
                &token,
                Some(json!({ "password": "" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resume_from_idle_is_a_conflict() {
        let harness = Harness::new().await;
        let token = harness.sign_in().await;
        let response = harness
            .admin(Method::POST, "/admin/timer/resume", &token, None)
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn degraded_mode_returns_service_unavailable() {
        let harness = Harness::new().await;
        harness.state.store().clear().await;
        let response = harness
            .send(Request::get("/public/timer").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn signing_out_revokes_the_token() {
        let harness = Harness::new().await;
        let token = harness.sign_in().await;

        let response = harness
            .admin(Method::DELETE, "/admin/session", &token, None)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = harness
            .admin(Method::GET, "/admin/timer", &token, None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
