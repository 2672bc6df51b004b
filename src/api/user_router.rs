// /user routes - directory, profiles and friends

use axum::{
    extract::{Path as AxumPath, State},
    response::Json,
    routing::{get, post},
    Router,
};

use super::extractors::{AppJson, AppQuery};
use crate::{
    app_state::AppState,
    core::Id,
    error::AppResult,
    infrastructure::middleware::Vc,
    models::{
        FriendSummary, FriendshipStatus, RegisterResponse, RegisterUserRequest, SearchQuery,
        UpdateProfileRequest, UpdateProfileResponse, UserListEntry, UserProfile,
    },
};

pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterUserRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let user = state.user_service.register(req).await?;
    Ok(Json(RegisterResponse {
        login_name: user.login_name,
    }))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> AppResult<Json<Vec<UserListEntry>>> {
    Ok(Json(state.user_service.list_users(&vc).await?))
}

pub async fn search_users_handler(
    State(state): State<AppState>,
    vc: Vc,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<Vec<UserListEntry>>> {
    Ok(Json(
        state
            .search_service
            .search_users(&vc, query.q.as_deref())
            .await?,
    ))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<UserProfile>> {
    let id: Id = id.parse()?;
    Ok(Json(state.user_service.get_profile(&vc, id).await?))
}

pub async fn get_friends_handler(
    State(state): State<AppState>,
    _vc: Vc,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<Vec<FriendSummary>>> {
    let id: Id = id.parse()?;
    Ok(Json(state.user_service.get_friends(id).await?))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<String>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UpdateProfileResponse>> {
    let id: Id = id.parse()?;
    let user = state.user_service.update_profile(&vc, id, req).await?;
    Ok(Json(UpdateProfileResponse { user }))
}

pub async fn add_friend_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<FriendshipStatus>> {
    let id: Id = id.parse()?;
    Ok(Json(state.friend_service.add_friend(&vc, id).await?))
}

pub async fn remove_friend_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<FriendshipStatus>> {
    let id: Id = id.parse()?;
    Ok(Json(state.friend_service.remove_friend(&vc, id).await?))
}

/// Routes reachable without a token
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/user", post(register_handler))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/user/list", get(list_users_handler))
        .route("/user/search", get(search_users_handler))
        .route("/user/{id}", get(get_user_handler).put(update_user_handler))
        .route("/user/{id}/friends", get(get_friends_handler))
        .route(
            "/user/friends/{id}",
            post(add_friend_handler).delete(remove_friend_handler),
        )
}
