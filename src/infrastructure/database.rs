// Database Interface - storage operations for users, photos, comments and
// the association/counter tables that back friendships, likes and the
// per-user aggregates.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::core::{Id, SearchPattern};
use crate::error::AppResult;
use crate::models::{CommentRecord, PhotoRecord, UserRecord, UserRef};

/// Edge types stored in the `associations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationType {
    /// user -> user, always stored in both directions
    Friendship,
    /// photo -> user who liked it
    LikedBy,
}

impl AssociationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationType::Friendship => "friendship",
            AssociationType::LikedBy => "liked_by",
        }
    }
}

/// Counters maintained in the `object_counts` table alongside the writes
/// that change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    /// photos owned by a user
    Photos,
    /// comments authored by a user, across all photos
    Comments,
    /// friend edges of a user
    Friends,
    /// likers of a photo
    Likes,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Photos => "photos",
            CounterKind::Comments => "comments",
            CounterKind::Friends => "friends",
            CounterKind::Likes => "likes",
        }
    }
}

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    // User operations
    async fn create_user(&self, user: &UserRecord) -> AppResult<()>;
    async fn get_user(&self, id: Id) -> AppResult<Option<UserRecord>>;
    async fn get_user_by_login(&self, login_name: &str) -> AppResult<Option<UserRecord>>;
    async fn get_users(&self, ids: &[Id]) -> AppResult<Vec<UserRecord>>;
    async fn get_user_refs(&self, ids: &[Id]) -> AppResult<Vec<UserRef>>;
    async fn list_users(&self) -> AppResult<Vec<UserRecord>>;
    /// Fails with `NotFound` when no row matches `user.id`.
    async fn update_user(&self, user: &UserRecord) -> AppResult<()>;
    /// Users whose first or last name, login, occupation or location match.
    async fn search_users(&self, pattern: &SearchPattern) -> AppResult<Vec<UserRecord>>;

    // Photo operations
    async fn create_photo(&self, photo: &PhotoRecord) -> AppResult<()>;
    async fn get_photo(&self, id: Id) -> AppResult<Option<PhotoRecord>>;
    async fn get_photos(&self, ids: &[Id]) -> AppResult<Vec<PhotoRecord>>;
    async fn get_photos_by_user(&self, user_id: Id) -> AppResult<Vec<PhotoRecord>>;
    /// Removes the photo together with its comments and likes, adjusting
    /// every affected counter. Returns false when the photo did not exist.
    async fn delete_photo(&self, id: Id) -> AppResult<bool>;
    /// Photos whose file name, any comment or owner matches. Newest first.
    async fn search_photos(&self, pattern: &SearchPattern) -> AppResult<Vec<PhotoRecord>>;

    // Comment operations
    async fn create_comment(&self, comment: &CommentRecord) -> AppResult<()>;
    async fn get_comment(&self, id: Id) -> AppResult<Option<CommentRecord>>;
    async fn update_comment(&self, id: Id, text: &str) -> AppResult<()>;
    async fn delete_comment(&self, id: Id) -> AppResult<bool>;
    async fn get_comments_for_photos(&self, photo_ids: &[Id]) -> AppResult<Vec<CommentRecord>>;
    async fn get_comments_by_user(&self, user_id: Id) -> AppResult<Vec<CommentRecord>>;
    /// Comments whose text or author matches.
    async fn search_comments(&self, pattern: &SearchPattern) -> AppResult<Vec<CommentRecord>>;

    // Association operations
    /// Writes both directions of the edge in one transaction. Returns true
    /// if anything changed.
    async fn add_friendship(&self, a: Id, b: Id) -> AppResult<bool>;
    /// Removes both directions of the edge in one transaction. Returns true
    /// if anything changed.
    async fn remove_friendship(&self, a: Id, b: Id) -> AppResult<bool>;
    /// Flips `user_id` in the likers of `photo_id`; returns the new state.
    async fn toggle_like(&self, photo_id: Id, user_id: Id) -> AppResult<bool>;
    async fn get_association_targets(&self, id1: Id, atype: AssociationType) -> AppResult<Vec<Id>>;
    async fn association_exists(&self, id1: Id, atype: AssociationType, id2: Id)
        -> AppResult<bool>;
    /// The subset of `id1s` that have an `atype` edge pointing at `id2`.
    async fn filter_associated(
        &self,
        id1s: &[Id],
        atype: AssociationType,
        id2: Id,
    ) -> AppResult<HashSet<Id>>;

    // Counter operations
    async fn get_counts(&self, ids: &[Id], kind: CounterKind) -> AppResult<HashMap<Id, u64>>;
    async fn get_count(&self, id: Id, kind: CounterKind) -> AppResult<u64> {
        Ok(self
            .get_counts(&[id], kind)
            .await?
            .get(&id)
            .copied()
            .unwrap_or(0))
    }
}
