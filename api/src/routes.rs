use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::http::{HeaderValue, Request};
use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, payments, stats, users, votes, words};
use crate::state::AppState;

/// Monotonic per-process request ids; upstream ids are propagated instead.
#[derive(Clone, Copy, Default)]
struct CountingRequestId;

impl MakeRequestId for CountingRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        HeaderValue::from_str(&id.to_string()).ok().map(RequestId::new)
    }
}

/// Routes only; middleware comes in via [`apply_middleware`] so tests can
/// drive a bare router.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:id", delete(admin::delete_user))
        .route("/votes", get(admin::list_votes))
        .route(
            "/words/:id",
            put(admin::update_word)
                .patch(admin::set_word_active)
                .delete(admin::delete_word),
        )
        .route("/config", get(admin::list_config))
        .route("/config/:key", patch(admin::set_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    let api = Router::new()
        .route("/votes", post(votes::submit))
        .route("/votes/user/:wallet/today", get(votes::today))
        .route("/words", get(words::list).post(words::create))
        .route("/words/heatmap/top", get(words::heatmap))
        .route("/words/categories", get(words::categories))
        .route("/words/recalculate-ranks", post(words::recalculate_ranks))
        .route("/words/:id", get(words::get))
        .route("/stats/overview", get(stats::overview))
        .route("/stats/daily", get(stats::daily))
        .route("/stats/top-words", get(stats::top_words))
        .route("/stats/top-users", get(stats::top_users))
        .route("/payments", get(payments::list))
        .route("/payments/verify", post(payments::verify))
        .route("/users/login", post(users::login))
        .route("/users/:wallet", get(users::get))
        .route("/users/:wallet/stats", get(users::stats))
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        .with_state(state)
}

pub struct MiddlewareConfig {
    pub request_timeout: Duration,
    pub concurrency_limit: usize,
    pub allowed_origins: String,
}

pub fn apply_middleware(router: Router, config: &MiddlewareConfig) -> Router {
    let cors = if config.allowed_origins.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .split(',')
            .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
        .layer(SetRequestIdLayer::x_request_id(CountingRequestId))
}
