// HTTP surface: JSON API under /api, stored images under /images

pub mod extractors;
pub mod photo_router;
pub mod user_router;

use axum::{middleware, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::app_state::AppState;
use crate::infrastructure::middleware::viewer_context_middleware;

/// Every API route except registration sits behind the auth gate.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(user_router::protected_routes())
        .merge(photo_router::routes())
        .route_layer(middleware::from_fn_with_state(
            state,
            viewer_context_middleware::<AppState>,
        ));

    Router::new()
        .merge(user_router::public_routes())
        .merge(protected)
}

pub fn create_app(state: AppState) -> Router {
    let images = ServeDir::new(state.images.dir());

    Router::new()
        .nest("/api", create_api_router(state.clone()))
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
