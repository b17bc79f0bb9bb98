use crate::infra::AppState;
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use subsidy_navigator::wizard::{wizard_router, SessionRepository, WizardService};

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
];

pub(crate) fn with_wizard_routes<R>(service: Arc<WizardService<R>>) -> Router
where
    R: SessionRepository + 'static,
{
    wizard_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(middleware::from_fn(security_headers))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(name)
            .or_insert_with(|| HeaderValue::from_static(value));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemorySessionRepository;
    use axum::body::{to_bytes, Body};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use subsidy_navigator::audit::{ProbeEndpoints, SecurityAuditor, Severity};
    use subsidy_navigator::catalog::SubsidyCatalog;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let service = Arc::new(
            WizardService::new(
                Arc::new(SubsidyCatalog::standard()),
                Arc::new(InMemorySessionRepository::default()),
            )
            .expect("standard catalog is valid"),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_wizard_routes(service).layer(Extension(state))
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(true)
            .oneshot(get_request("/health"))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let initializing = app(false)
            .oneshot(get_request("/ready"))
            .await
            .expect("route responds");
        assert_eq!(initializing.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = app(true)
            .oneshot(get_request("/ready"))
            .await
            .expect("route responds");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_use_prometheus_text_format() {
        let response = app(true)
            .oneshot(get_request("/metrics"))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn every_response_carries_security_headers() {
        let response = app(true)
            .oneshot(get_request("/api/v1/questions"))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(response.headers()[name], value, "header {name}");
        }

        let missing = app(true)
            .oneshot(get_request("/api/v1/sessions/session-999999"))
            .await
            .expect("route responds");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.headers().contains_key("x-frame-options"));
    }

    #[tokio::test]
    async fn audit_of_local_service_flags_only_missing_hsts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port");
        let addr = listener.local_addr().expect("bound address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(true)).await;
        });

        let auditor = SecurityAuditor::new(&format!("http://{addr}"), None)
            .expect("valid target")
            .with_endpoints(ProbeEndpoints {
                landing: "/health".to_string(),
                ..ProbeEndpoints::default()
            });
        let report = auditor
            .run_full_security_audit()
            .await
            .expect("audit completes");

        assert_eq!(report.checks_run.len(), 6);
        // large uploads to unrouted paths may surface as dropped connections
        let ids: Vec<&str> = report
            .findings
            .iter()
            .filter(|finding| finding.severity != Severity::Info)
            .map(|finding| finding.id.as_str())
            .collect();
        assert_eq!(ids, vec!["headers.missing.strict-transport-security"]);
    }
}
