pub mod api_errors;
pub mod caller;
pub mod history;
pub mod items;
pub mod params;

use {
    crate::AppState,
    axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    },
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
};

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/api/items",
            get(items::list_items).post(items::create_item),
        )
        .route(
            "/api/items/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/api/items/{id}/history", get(history::item_history))
        .route(
            "/api/items/{id}/history/export",
            get(history::export_item_history),
        )
        .route("/api/history", get(history::list_history))
        .route("/api/history/search", get(history::search_history))
        .route("/api/history/stats", get(history::history_stats))
        .route("/api/history/{event_id}/diff", get(history::event_diff))
        .route(
            "/api/history/{event_id}/revert",
            post(history::revert_change),
        )
        .with_state(state);

    with_layers(router, request_timeout)
}

/// Request tracing plus a per-request deadline answered with 408.
fn with_layers<S>(router: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            )),
    )
}
