// /photo routes - photos, comments, likes and search

use axum::{
    extract::{Path as AxumPath, State},
    response::Json,
    routing::{get, post, put},
    Router,
};

use super::extractors::{AppJson, AppQuery};
use crate::{
    app_state::AppState,
    core::Id,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::{
        AuthoredComment, CommentAdded, CommentRequest, CommentSearchHit, LikeStatus,
        MessageResponse, PhotoView, SearchQuery,
    },
};

pub async fn photos_of_user_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<Vec<PhotoView>>> {
    let user_id: Id = user_id.parse()?;
    Ok(Json(state.photo_service.photos_of_user(&vc, user_id).await?))
}

pub async fn get_photo_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(photo_id): AxumPath<String>,
) -> AppResult<Json<PhotoView>> {
    let photo_id: Id = photo_id.parse()?;
    Ok(Json(state.photo_service.get_photo(&vc, photo_id).await?))
}

pub async fn add_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(photo_id): AxumPath<String>,
    AppJson(req): AppJson<CommentRequest>,
) -> AppResult<Json<CommentAdded>> {
    let photo_id: Id = photo_id.parse()?;
    let comment = state.photo_service.add_comment(&vc, photo_id, req).await?;
    Ok(Json(CommentAdded {
        message: "Comment added successfully".to_string(),
        comment: comment.into(),
    }))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath((photo_id, comment_id)): AxumPath<(String, String)>,
    AppJson(req): AppJson<CommentRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (photo_id, comment_id): (Id, Id) = (photo_id.parse()?, comment_id.parse()?);
    state
        .photo_service
        .update_comment(&vc, photo_id, comment_id, req)
        .await?;
    Ok(Json(MessageResponse::new("Comment updated successfully")))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath((photo_id, comment_id)): AxumPath<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    let (photo_id, comment_id): (Id, Id) = (photo_id.parse()?, comment_id.parse()?);
    state
        .photo_service
        .delete_comment(&vc, photo_id, comment_id)
        .await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

pub async fn toggle_like_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(photo_id): AxumPath<String>,
) -> AppResult<Json<LikeStatus>> {
    let photo_id: Id = photo_id.parse()?;
    Ok(Json(state.photo_service.toggle_like(&vc, photo_id).await?))
}

pub async fn delete_photo_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(photo_id): AxumPath<String>,
) -> AppResult<Json<MessageResponse>> {
    let photo_id: Id = photo_id.parse()?;
    state.photo_service.delete_photo(&vc, photo_id).await?;
    Ok(Json(MessageResponse::new("Photo deleted successfully")))
}

pub async fn comments_of_user_handler(
    State(state): State<AppState>,
    _vc: Vc,
    AxumPath(user_id): AxumPath<String>,
) -> AppResult<Json<Vec<AuthoredComment>>> {
    let user_id: Id = user_id.parse()?;
    Ok(Json(state.photo_service.comments_of_user(user_id).await?))
}

pub async fn search_photos_handler(
    State(state): State<AppState>,
    vc: Vc,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<Vec<PhotoView>>> {
    Ok(Json(
        state
            .search_service
            .search_photos(&vc, query.q.as_deref())
            .await?,
    ))
}

pub async fn search_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<Vec<CommentSearchHit>>> {
    Ok(Json(
        state
            .search_service
            .search_comments(&vc, query.q.as_deref())
            .await?,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/photo/search", get(search_photos_handler))
        .route("/photo/comments/search", get(search_comments_handler))
        .route("/photo/user/{id}", get(photos_of_user_handler))
        .route("/photo/commentsOf/{user_id}", get(comments_of_user_handler))
        .route("/photo/commentsOfPhoto/{photo_id}", post(add_comment_handler))
        .route(
            "/photo/commentsOfPhoto/{photo_id}/{comment_id}",
            put(update_comment_handler).delete(delete_comment_handler),
        )
        .route("/photo/{photo_id}/like", post(toggle_like_handler))
        .route(
            "/photo/{photo_id}",
            get(get_photo_handler).delete(delete_photo_handler),
        )
}
