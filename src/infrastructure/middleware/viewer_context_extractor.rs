// ViewerContext extractor for handlers

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Handle on the caller's ViewerContext. Derefs to the context, and cloning
/// only clones the Arc.
///
/// ```ignore
/// async fn handler(vc: Vc, Path(id): Path<String>) -> AppResult<Json<UserProfile>> {
///     let user = state.user_service.get_profile(&vc, id.parse()?).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

// The middleware inserts the context; a handler mounted outside the auth
// layer has none.
impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Internal("ViewerContext missing from request".to_string()));

        async move { vc }
    }
}
