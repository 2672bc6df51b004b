// UserService - registration, profiles, the user directory and its counters

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::{Id, SearchPattern};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{AssociationType, CounterKind, DatabaseInterface};
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::security::SecurityService;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::requests::required;
use crate::models::{
    FriendSummary, RegisterUserRequest, UpdateProfileRequest, UserCounters, UserListEntry,
    UserProfile, UserRecord,
};
use crate::services::user_lookup::UserLookup;

pub struct UserService {
    db: Arc<dyn DatabaseInterface>,
    security: Arc<SecurityService>,
    ids: Arc<IdGenerator>,
    lookup: Arc<UserLookup>,
}

impl UserService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        security: Arc<SecurityService>,
        ids: Arc<IdGenerator>,
        lookup: Arc<UserLookup>,
    ) -> Self {
        Self {
            db,
            security,
            ids,
            lookup,
        }
    }

    #[instrument(skip(self, request), fields(login_name = ?request.login_name))]
    pub async fn register(&self, request: RegisterUserRequest) -> AppResult<UserRecord> {
        let (Some(login_name), Some(password), Some(first_name), Some(last_name)) = (
            required(&request.login_name),
            required(&request.password),
            required(&request.first_name),
            required(&request.last_name),
        ) else {
            return Err(AppError::Validation(
                "login_name, password, first_name and last_name are required".to_string(),
            ));
        };

        if self.db.get_user_by_login(login_name).await?.is_some() {
            return Err(AppError::Validation(format!(
                "login_name {} already exists",
                login_name
            )));
        }

        let user = UserRecord {
            id: self.ids.next_id(),
            login_name: login_name.to_string(),
            password_hash: self.security.hash_password(password)?,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            location: request.location.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            occupation: request.occupation.unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.db.create_user(&user).await?;

        info!("Registered user {} ({})", user.login_name, user.id);
        Ok(user)
    }

    pub async fn require_user(&self, id: Id) -> AppResult<UserRecord> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn list_users(&self, vc: &ViewerContext) -> AppResult<Vec<UserListEntry>> {
        let users = self.db.list_users().await?;
        self.list_entries(vc, users).await
    }

    #[instrument(skip(self, vc, pattern), fields(viewer = %vc.user_id, q = pattern.term()))]
    pub async fn search_users(
        &self,
        vc: &ViewerContext,
        pattern: &SearchPattern,
    ) -> AppResult<Vec<UserListEntry>> {
        let users = self.db.search_users(pattern).await?;
        self.list_entries(vc, users).await
    }

    /// Directory entries with counters and the viewer's friendship flag,
    /// loaded in one batch per counter.
    pub async fn list_entries(
        &self,
        vc: &ViewerContext,
        users: Vec<UserRecord>,
    ) -> AppResult<Vec<UserListEntry>> {
        let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
        let (counters, friends) = futures::try_join!(
            self.counters(&ids),
            self.db
                .filter_associated(&ids, AssociationType::Friendship, vc.user_id),
        )?;

        Ok(users
            .into_iter()
            .map(|user| UserListEntry {
                counters: counters.get(&user.id).copied().unwrap_or_default(),
                is_friend: friends.contains(&user.id),
                id: user.id,
                first_name: user.first_name,
                last_name: user.last_name,
            })
            .collect())
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn get_profile(&self, vc: &ViewerContext, id: Id) -> AppResult<UserProfile> {
        let user = self.require_user(id).await?;
        let (friends, counters, is_friend) = futures::try_join!(
            self.db.get_association_targets(id, AssociationType::Friendship),
            self.counters_of(id),
            self.db
                .association_exists(id, AssociationType::Friendship, vc.user_id),
        )?;
        Ok(UserProfile::new(user, friends, counters, is_friend))
    }

    #[instrument(skip(self))]
    pub async fn get_friends(&self, id: Id) -> AppResult<Vec<FriendSummary>> {
        self.require_user(id).await?;
        let friend_ids = self
            .db
            .get_association_targets(id, AssociationType::Friendship)
            .await?;

        let mut by_id: HashMap<Id, UserRecord> = self
            .db
            .get_users(&friend_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        // Keep the order in which the friendships were made
        Ok(friend_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(FriendSummary::from)
            .collect())
    }

    #[instrument(skip(self, vc, request), fields(viewer = %vc.user_id))]
    pub async fn update_profile(
        &self,
        vc: &ViewerContext,
        id: Id,
        request: UpdateProfileRequest,
    ) -> AppResult<UserProfile> {
        if !vc.is_viewer(id) {
            return Err(AppError::Forbidden(
                "You can only update your own profile".to_string(),
            ));
        }

        let (Some(login_name), Some(first_name), Some(last_name)) = (
            required(&request.login_name),
            required(&request.first_name),
            required(&request.last_name),
        ) else {
            return Err(AppError::Validation(
                "first_name, last_name and login_name are required".to_string(),
            ));
        };

        let mut user = self.require_user(id).await?;
        if user.login_name != login_name {
            if let Some(existing) = self.db.get_user_by_login(login_name).await? {
                if existing.id != id {
                    return Err(AppError::Validation(format!(
                        "login_name {} already exists",
                        login_name
                    )));
                }
            }
        }

        user.login_name = login_name.to_string();
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        // Full replacement: omitted optional fields are cleared
        user.location = request.location.unwrap_or_default();
        user.description = request.description.unwrap_or_default();
        user.occupation = request.occupation.unwrap_or_default();

        self.db.update_user(&user).await?;
        self.lookup.invalidate(id).await;
        info!("Updated profile of {}", id);

        let (friends, counters) = futures::try_join!(
            self.db.get_association_targets(id, AssociationType::Friendship),
            self.counters_of(id),
        )?;
        Ok(UserProfile::new(user, friends, counters, false))
    }

    pub async fn counters_of(&self, id: Id) -> AppResult<UserCounters> {
        Ok(self.counters(&[id]).await?.remove(&id).unwrap_or_default())
    }

    pub async fn counters(&self, ids: &[Id]) -> AppResult<HashMap<Id, UserCounters>> {
        let (photos, comments, friends) = futures::try_join!(
            self.db.get_counts(ids, CounterKind::Photos),
            self.db.get_counts(ids, CounterKind::Comments),
            self.db.get_counts(ids, CounterKind::Friends),
        )?;

        Ok(ids
            .iter()
            .map(|id| {
                let counters = UserCounters {
                    photo_count: photos.get(id).copied().unwrap_or(0),
                    comment_count: comments.get(id).copied().unwrap_or(0),
                    friend_count: friends.get(id).copied().unwrap_or(0),
                };
                (*id, counters)
            })
            .collect())
    }
}
