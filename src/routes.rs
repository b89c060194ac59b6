use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/repos/{id}/next", get(handlers::repo::next))
        .route("/repos/{id}/mirror", put(handlers::repo::mirror))
        .route("/repos/{id}/enabled", put(handlers::repo::enabled))
        .route(
            "/repos/{id}",
            get(handlers::repo::index)
                .put(handlers::repo::update)
                .delete(handlers::repo::delete),
        )
        .route("/repos/prefill", post(handlers::repo::prefill))
        .route("/repos/validate", post(handlers::repo::validate))
        .route(
            "/repos",
            get(handlers::repo::list).post(handlers::repo::create),
        )
        .route(
            "/settings/log-level",
            get(handlers::settings::log_level).put(handlers::settings::log_level_put),
        )
        .fallback(handlers::handle_404)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(middleware::map_response(crate::middleware::security_headers))
                .into_inner(),
        )
        .with_state(state)
}
