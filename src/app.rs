use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{dashboard, health, market};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let debug = state.settings.debug;

    let router = Router::<AppState>::new()
        .merge(dashboard::router())
        .nest("/health", health::router())
        .nest("/api/events", dashboard::events_router())
        .nest("/api", market::router())
        .layer(TraceLayer::new_for_http());

    let router = if debug {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}
