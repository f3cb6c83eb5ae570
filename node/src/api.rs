//! # REST API
//!
//! Builds the axum router that exposes the alias service over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path              | Success                               |
//! |--------|-------------------|---------------------------------------|
//! | GET    | `/health`         | 200 `{"status":"ok"}`                 |
//! | GET    | `/status`         | 200 service name, version, public key |
//! | GET    | `/resolve/:alias` | 200 signed `ResolutionResponse`       |
//! | POST   | `/register`       | 201 `{"status":"registered",...}`     |
//! | POST   | `/attest`         | 200 `{"alias":..,"attestation":n}`    |
//!
//! `/attest` is an operator call. It needs `Authorization: Bearer <token>`
//! matching the configured admin token, answers 401 `unauthorized` on a
//! missing or wrong token, and 403 `attestation_disabled` when the node has
//! no admin token at all.
//!
//! ## Errors
//!
//! Failures carry `{"error": <message>, "kind": <tag>}` where `kind` is
//! [`AlsError::kind`]. Status codes:
//!
//! | Kind                                      | Status |
//! |-------------------------------------------|--------|
//! | `not_found`                               | 404    |
//! | `suspended`, `reserved`                   | 403    |
//! | `already_exists`                          | 409    |
//! | `invalid_record`, `invalid_body`, attestation failures | 400 |
//! | `remote_unavailable`, `remote_rejected`   | 502    |
//! | `persistence_failure`                     | 500    |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use als_protocol::config::SERVICE_NAME;
use als_protocol::{
    normalize, AliasService, AlsError, AttestationReceipt, AttestationRequest, CancelToken,
    Durability, RegistrationReceipt, RegistrationRequest,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Local engine or hybrid resolver, depending on `--remote`.
    pub service: Arc<dyn AliasService>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Bearer token for operator endpoints. `None` disables them.
    pub admin_token: Option<Arc<str>>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/resolve/:alias", get(resolve_handler))
        .route("/register", post(register_handler))
        .route("/attest", post(attest_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    /// Whether responses carry real signatures.
    pub signing: bool,
    /// Hex public key to verify `security_sig` against.
    pub public_key: Option<String>,
    /// Whether a ledger sits behind the local directory.
    pub remote: bool,
    pub timestamp: String,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// HTTP status for each error kind.
pub fn status_for(err: &AlsError) -> StatusCode {
    match err {
        AlsError::NotFound { .. } => StatusCode::NOT_FOUND,
        AlsError::Suspended { .. } | AlsError::Reserved { .. } => StatusCode::FORBIDDEN,
        AlsError::AlreadyExists { .. } => StatusCode::CONFLICT,
        AlsError::InvalidRecord { .. } | AlsError::Attestation(_) => StatusCode::BAD_REQUEST,
        AlsError::RemoteUnavailable { .. } | AlsError::RemoteRejected { .. } => {
            StatusCode::BAD_GATEWAY
        }
        AlsError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &AlsError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::warn!(kind = err.kind(), error = %err, "request failed");
    } else {
        tracing::debug!(kind = err.kind(), error = %err, "request refused");
    }
    let body = ErrorResponse {
        error: err.to_string(),
        kind: err.kind().to_string(),
    };
    (status, Json(body)).into_response()
}

fn refusal(status: StatusCode, kind: &str, error: &str) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        kind: kind.into(),
    };
    (status, Json(body)).into_response()
}

/// Check the bearer token on an operator request.
fn authorize_operator(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(refusal(
            StatusCode::FORBIDDEN,
            "attestation_disabled",
            "no admin token configured on this node",
        ));
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(token) if token.as_bytes() == expected.as_bytes() => Ok(()),
        _ => Err(refusal(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid admin token",
        )),
    }
}

fn bad_body(rejection: JsonRejection) -> Response {
    let body = ErrorResponse {
        error: rejection.body_text(),
        kind: "invalid_body".into(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the service is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: service identity and the key relying parties need.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let public_key = state.service.public_key();
    Json(StatusResponse {
        service: SERVICE_NAME.to_string(),
        version: state.version.clone(),
        signing: public_key.is_some(),
        public_key: public_key.map(|pk| pk.to_hex()),
        remote: state.service.remote_stats().is_some(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /resolve/:alias`: signed resolution.
///
/// A dropped client connection drops this future, which in turn abandons
/// any ledger call in flight.
async fn resolve_handler(Path(alias): Path<String>, State(state): State<AppState>) -> Response {
    let timer = state.metrics.resolution_latency_seconds.start_timer();
    let result = state.service.resolve(&alias, &CancelToken::never()).await;
    timer.observe_duration();

    if let Some(stats) = state.service.remote_stats() {
        state.metrics.observe_remote(&stats);
    }

    match result {
        Ok(response) => {
            state.metrics.resolutions_total.with_label_values(&["ok"]).inc();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            state
                .metrics
                .resolutions_total
                .with_label_values(&[e.kind()])
                .inc();
            error_response(&e)
        }
    }
}

/// `POST /register`: register a new alias.
async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            state
                .metrics
                .registrations_total
                .with_label_values(&["invalid_body"])
                .inc();
            return bad_body(rejection);
        }
    };

    let alias = normalize(&request.alias);
    match state
        .service
        .register(request.into_record(), &CancelToken::never())
        .await
    {
        Ok(durability) => {
            state
                .metrics
                .registrations_total
                .with_label_values(&["ok"])
                .inc();
            if let Durability::FlushFailed(e) = &durability {
                state.metrics.registration_flush_failures_total.inc();
                tracing::warn!(alias = %alias, error = %e, "registration not persisted");
            }
            let receipt = RegistrationReceipt::registered(alias, &durability);
            (StatusCode::CREATED, Json(receipt)).into_response()
        }
        Err(e) => {
            state
                .metrics
                .registrations_total
                .with_label_values(&[e.kind()])
                .inc();
            error_response(&e)
        }
    }
}

/// `POST /attest`: move an alias to another attestation level. Operator only.
async fn attest_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AttestationRequest>, JsonRejection>,
) -> Response {
    if let Err(refused) = authorize_operator(&state, &headers) {
        state
            .metrics
            .attestations_total
            .with_label_values(&["unauthorized"])
            .inc();
        return refused;
    }

    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            state
                .metrics
                .attestations_total
                .with_label_values(&["invalid_body"])
                .inc();
            return bad_body(rejection);
        }
    };

    match state
        .service
        .attest(&request.alias, request.level, &request.proof)
        .await
    {
        Ok(attested) => {
            state
                .metrics
                .attestations_total
                .with_label_values(&["ok"])
                .inc();
            (StatusCode::OK, Json(AttestationReceipt::from(&attested))).into_response()
        }
        Err(e) => {
            state
                .metrics
                .attestations_total
                .with_label_values(&[e.kind()])
                .inc();
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use als_protocol::crypto::{AlsKeypair, AlsPublicKey};
    use als_protocol::{
        AliasDirectory, AliasRecord, AliasStatus, Endpoint, HybridResolver, InMemoryLedger,
        ResolutionEngine, ResolutionResponse, TrustLayer,
    };

    fn seeded_directory() -> Arc<AliasDirectory> {
        let directory = Arc::new(AliasDirectory::in_memory());
        directory.seed(
            AliasRecord::new("koda_dev", "K**** M*******")
                .with_endpoint(Endpoint::wallet(1, "AIRTEL_MONEY", "26599..."))
                .with_verification_proof("4321"),
        );
        directory.seed(
            AliasRecord::new("quiet", "Q****")
                .with_endpoint(Endpoint::wallet(1, "TNM", "0888000111"))
                .private(),
        );
        directory.seed(
            AliasRecord::new("frozen", "F****")
                .with_endpoint(Endpoint::wallet(1, "TNM", "0888000222"))
                .with_status(AliasStatus::Suspended),
        );
        directory
    }

    const ADMIN_TOKEN: &str = "operator-secret";

    fn state_for(service: Arc<dyn AliasService>) -> AppState {
        AppState {
            version: "0.1.0-test".into(),
            service,
            metrics: Arc::new(crate::metrics::NodeMetrics::new().unwrap()),
            admin_token: Some(Arc::from(ADMIN_TOKEN)),
        }
    }

    /// Local-only service with a signing key and a few seeded aliases.
    fn test_app_state() -> AppState {
        let engine = ResolutionEngine::new(
            seeded_directory(),
            Arc::new(TrustLayer::new(AlsKeypair::generate())),
        );
        state_for(Arc::new(engine))
    }

    /// Hybrid service in front of an in-memory ledger.
    fn hybrid_app_state() -> (AppState, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = ResolutionEngine::new(
            Arc::new(AliasDirectory::in_memory()),
            Arc::new(TrustLayer::new(AlsKeypair::generate())),
        );
        let hybrid = HybridResolver::new(engine, ledger.clone());
        (state_for(Arc::new(hybrid)), ledger)
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        post_json_as(router, path, body, None).await
    }

    /// Like [`post_json`], optionally carrying a bearer token.
    async fn post_json_as(
        router: &Router,
        path: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = bearer {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let req = req
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    fn newuser() -> serde_json::Value {
        serde_json::json!({
            "alias": "@NewUser",
            "identity_mask": "N**** U***",
            "endpoints": [
                {
                    "priority": 1,
                    "provider": "AIRTEL_MONEY",
                    "type": "WALLET",
                    "destination": "0999111222"
                }
            ],
            "is_private": false
        })
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn resolve_returns_verifiable_response() {
        let router = create_router(test_app_state());

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let info = json(&body);
        assert_eq!(info["service"], "MW-ALS");
        assert_eq!(info["signing"], true);
        assert_eq!(info["remote"], false);
        let pk = AlsPublicKey::from_hex(info["public_key"].as_str().unwrap()).unwrap();

        let (status, body) = get(&router, "/resolve/@Koda_Dev").await;
        assert_eq!(status, StatusCode::OK);
        let resp: ResolutionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.alias, "@koda_dev");
        assert_eq!(resp.endpoints[0].destination, "26599...");
        assert!(TrustLayer::verify_response(&resp, &pk));
    }

    #[tokio::test]
    async fn private_alias_returns_token() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/resolve/quiet").await;
        assert_eq!(status, StatusCode::OK);
        let dest = json(&body)["endpoints"][0]["destination"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(dest.starts_with("TOKEN:"));
    }

    #[tokio::test]
    async fn resolve_error_statuses() {
        let router = create_router(test_app_state());

        let (status, body) = get(&router, "/resolve/nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["kind"], "not_found");

        let (status, body) = get(&router, "/resolve/frozen").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json(&body)["kind"], "suspended");
    }

    #[tokio::test]
    async fn register_then_conflict() {
        let router = create_router(test_app_state());

        let (status, body) = post_json(&router, "/register", newuser()).await;
        assert_eq!(status, StatusCode::CREATED);
        let receipt = json(&body);
        assert_eq!(receipt["status"], "registered");
        assert_eq!(receipt["alias"], "newuser");
        assert_eq!(receipt["durable"], false);

        let (status, body) = post_json(&router, "/register", newuser()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json(&body)["kind"], "already_exists");

        let (status, _) = get(&router, "/resolve/newuser").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn register_rejections() {
        let router = create_router(test_app_state());

        let mut reserved = newuser();
        reserved["alias"] = "@Admin".into();
        let (status, body) = post_json(&router, "/register", reserved).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json(&body)["kind"], "reserved");

        let mut empty = newuser();
        empty["endpoints"] = serde_json::json!([]);
        let (status, body) = post_json(&router, "/register", empty).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["kind"], "invalid_record");

        let (status, body) =
            post_json(&router, "/register", serde_json::json!({"identity_mask": "X"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["kind"], "invalid_body");
    }

    #[tokio::test]
    async fn attest_endpoint() {
        let router = create_router(test_app_state());

        let (status, body) = post_json_as(
            &router,
            "/attest",
            serde_json::json!({"alias": "koda_dev", "level": 2, "proof": "0000"}),
            Some(ADMIN_TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["kind"], "invalid_proof");

        let (status, body) = post_json_as(
            &router,
            "/attest",
            serde_json::json!({"alias": "@koda_dev", "level": 2, "proof": "4321"}),
            Some(ADMIN_TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["attestation"], 2);
        assert_eq!(json(&body)["alias"], "koda_dev");

        let (status, _) = post_json_as(
            &router,
            "/attest",
            serde_json::json!({"alias": "ghost", "level": 3, "proof": "NRIS-1"}),
            Some(ADMIN_TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn attest_requires_the_admin_token() {
        let router = create_router(test_app_state());
        let certify = serde_json::json!({"alias": "koda_dev", "level": 3, "proof": "NRIS-123"});

        let (status, body) = post_json(&router, "/attest", certify.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["kind"], "unauthorized");

        let (status, _) =
            post_json_as(&router, "/attest", certify.clone(), Some("guess")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(&router, "/resolve/koda_dev").await;
        assert_eq!(status, StatusCode::OK);

        let mut state = test_app_state();
        state.admin_token = None;
        let closed = create_router(state);
        let (status, body) =
            post_json_as(&closed, "/attest", certify, Some(ADMIN_TOKEN)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json(&body)["kind"], "attestation_disabled");
    }

    #[tokio::test]
    async fn hybrid_miss_is_bad_gateway() {
        let (state, ledger) = hybrid_app_state();
        let router = create_router(state);

        let (status, body) = get(&router, "/resolve/ghost").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json(&body)["kind"], "remote_unavailable");
        assert_eq!(ledger.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn hybrid_resolves_from_ledger_and_reports_stats() {
        let (state, ledger) = hybrid_app_state();
        let metrics = Arc::clone(&state.metrics);
        ledger.insert(
            AliasRecord::new("chain_user", "C****")
                .with_endpoint(Endpoint::wallet(1, "TNM", "0888555444")),
        );
        let router = create_router(state);

        let (status, _) = get(&router, "/resolve/chain_user").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(&router, "/resolve/chain_user").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ledger.resolve_calls(), 1);

        let text = metrics.encode().unwrap();
        assert!(text.contains("als_remote_hits 1"));
        assert!(text.contains("als_resolutions_total{outcome=\"ok\"} 2"));
    }

    #[tokio::test]
    async fn hybrid_register_with_offline_ledger_is_bad_gateway() {
        let (state, ledger) = hybrid_app_state();
        ledger.set_offline(true);
        let router = create_router(state);

        let (status, body) = post_json(&router, "/register", newuser()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json(&body)["kind"], "remote_rejected");
    }
}
