use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::Id;
use crate::models::records::{CommentRecord, UserRecord, UserRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserCounters {
    pub photo_count: u64,
    pub comment_count: u64,
    pub friend_count: u64,
}

/// Entry of the user list and of user search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListEntry {
    #[serde(rename = "_id")]
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub counters: UserCounters,
    pub is_friend: bool,
}

/// Full profile of a user, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Id,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
    pub friends: Vec<Id>,
    #[serde(flatten)]
    pub counters: UserCounters,
    pub is_friend: bool,
}

impl UserProfile {
    pub fn new(user: UserRecord, friends: Vec<Id>, counters: UserCounters, is_friend: bool) -> Self {
        Self {
            id: user.id,
            login_name: user.login_name,
            first_name: user.first_name,
            last_name: user.last_name,
            location: user.location,
            description: user.description,
            occupation: user.occupation,
            friends,
            counters,
            is_friend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterResponse {
    pub login_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub login_name: String,
}

impl From<UserRecord> for FriendSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            login_name: user.login_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendshipStatus {
    pub message: String,
    pub is_friend: bool,
    pub friend_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user: Option<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub user_id: Id,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub user: Option<UserRef>,
    pub comments: Vec<CommentView>,
    pub like_count: u64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeStatus {
    pub like_count: u64,
    pub is_liked: bool,
}

/// Photo summary attached to a comment search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRef {
    #[serde(rename = "_id")]
    pub id: Id,
    pub file_name: String,
    pub user_id: Id,
    pub owner: Option<UserRef>,
    pub like_count: u64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentSearchHit {
    #[serde(rename = "_id")]
    pub id: Id,
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user: Option<UserRef>,
    pub photo: PhotoRef,
}

/// A comment listed under its author rather than its photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthoredComment {
    #[serde(rename = "_id")]
    pub id: Id,
    pub photo_id: Id,
    pub user_id: Id,
    pub comment: String,
    pub date_time: DateTime<Utc>,
}

impl From<CommentRecord> for AuthoredComment {
    fn from(comment: CommentRecord) -> Self {
        Self {
            id: comment.id,
            photo_id: comment.photo_id,
            user_id: comment.user_id,
            comment: comment.comment,
            date_time: comment.date_time,
        }
    }
}

/// Response to a new comment; carries the id so clients can edit it later.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAdded {
    pub message: String,
    pub comment: AuthoredComment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_entry_flattens_counters() {
        let entry = UserListEntry {
            id: Id(17),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            counters: UserCounters {
                photo_count: 2,
                comment_count: 5,
                friend_count: 1,
            },
            is_friend: true,
        };

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "_id": "17",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "photo_count": 2,
                "comment_count": 5,
                "friend_count": 1,
                "is_friend": true
            })
        );
    }
}
