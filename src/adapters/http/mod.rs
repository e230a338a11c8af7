//! HTTP adapters - axum routers for the relay's inbound surface.
//!
//! - `webhooks` - `POST /webhooks/billing`, `POST /webhooks/payments`
//! - `realtime` - `GET /api/realtime/stream` (server-sent events)
//! - `entitlement` - `GET /api/entitlement`
//! - `middleware` - session auth and `require_entitlement`

pub mod entitlement;
pub mod error;
pub mod middleware;
pub mod realtime;
pub mod state;
pub mod webhooks;

pub use error::{ApiError, ErrorResponse};
pub use middleware::{auth_middleware, require_entitlement, RequireAuth};
pub use state::AppState;
pub use webhooks::WebhookAck;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;

/// Builds the complete router.
///
/// Webhook routes keep the provider's `x-request-id` untouched (it is part
/// of the signed manifest); only the API routes get generated request ids.
/// The stream route has no request timeout.
pub fn api_router(state: AppState, server: &ServerConfig) -> Router {
    let webhooks = Router::new()
        .route("/webhooks/billing", post(webhooks::billing_webhook))
        .route("/webhooks/payments", post(webhooks::payments_webhook))
        .layer(TimeoutLayer::new(server.request_timeout()));

    let entitlement = Router::new()
        .route("/api/entitlement", get(entitlement::get_entitlement))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(TimeoutLayer::new(server.request_timeout()));

    let stream = Router::new().route("/api/realtime/stream", get(realtime::realtime_stream));

    let api = entitlement
        .merge(stream)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    webhooks
        .merge(api)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wraps host routes that require an entitled tenant.
///
/// Requests are authenticated first, then checked against the gate.
pub fn gated(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(state.clone(), require_entitlement))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(realtime::LAST_EVENT_ID_HEADER),
        ])
        .allow_credentials(true)
}
