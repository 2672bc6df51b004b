// ViewerContext middleware - validates the bearer token and injects the
// caller's identity into request extensions

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::security::{Claims, SecurityService};
use crate::infrastructure::viewer::ViewerContext;

/// Application state that can validate tokens
pub trait HasSecurityService {
    fn security(&self) -> &SecurityService;
}

/// Rejects the request with 401 unless it carries a valid bearer token.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> AppResult<Response>
where
    T: HasSecurityService + Clone + Send + Sync + 'static,
{
    let claims = {
        let token = extract_bearer_token(request.headers())?;
        app_state.security().validate_token(token)?
    };

    let viewer_context = create_viewer_context(claims);
    debug!(
        request_id = %viewer_context.request_id,
        user_id = %viewer_context.user_id,
        "Authenticated request"
    );

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// Pulls the token out of `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authorization header required".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))
}

fn create_viewer_context(claims: Claims) -> Arc<ViewerContext> {
    let request_id = format!("req-{}", Uuid::new_v4());
    Arc::new(ViewerContext::new(claims.user_id, claims.login_name, request_id))
}
