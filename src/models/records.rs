use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::Id;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserRecord {
    pub id: Id,
    pub login_name: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
    pub created_at: DateTime<Utc>,
}

/// Display data for a user referenced from a photo or comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
}

/// A row of the `photos` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PhotoRecord {
    pub id: Id,
    pub user_id: Id,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
}

/// A row of the `comments` table. Comments belong to exactly one photo but
/// carry their own id.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CommentRecord {
    pub id: Id,
    pub photo_id: Id,
    pub user_id: Id,
    pub comment: String,
    pub date_time: DateTime<Utc>,
}
