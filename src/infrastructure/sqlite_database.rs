use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::{Id, SearchPattern};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{AssociationType, CounterKind, DatabaseInterface};
use crate::models::{CommentRecord, PhotoRecord, UserRecord, UserRef};

const SELECT_USERS: &str = "SELECT id, login_name, password_hash, first_name, last_name, location, description, occupation, created_at FROM users";
const SELECT_PHOTOS: &str = "SELECT id, user_id, file_name, date_time FROM photos";
const SELECT_COMMENTS: &str = "SELECT id, photo_id, user_id, comment, date_time FROM comments";

const USER_SEARCH_COLUMNS: [&str; 5] = ["first_name", "last_name", "login_name", "occupation", "location"];

/// Ids bound per `IN (...)` list. SQLite caps bind parameters per statement,
/// so longer id lists are queried in batches.
const ID_BATCH_SIZE: usize = 500;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        login_name TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        location TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        occupation TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS photos (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        file_name TEXT NOT NULL,
        date_time TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY,
        photo_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        comment TEXT NOT NULL,
        date_time TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS associations (
        id1 INTEGER NOT NULL,
        atype TEXT NOT NULL,
        id2 INTEGER NOT NULL,
        time_created INTEGER NOT NULL,
        PRIMARY KEY (id1, atype, id2)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS object_counts (
        id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        updated_time INTEGER NOT NULL,
        PRIMARY KEY (id, kind)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_photos_user ON photos(user_id, date_time)",
    "CREATE INDEX IF NOT EXISTS idx_comments_photo ON comments(photo_id, date_time)",
    "CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_assoc_reverse ON associations(atype, id2)",
];

fn current_time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// SQLite implementation of the database interface
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid database url {}: {}", url, e))
            })?
            .create_if_missing(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            // Each connection to an in-memory database sees its own empty
            // database, so the pool keeps exactly one that never expires.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            let filename = options.clone().get_filename();
            if let Some(parent) = filename.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        AppError::StorageError(format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e))
        })?;

        let db = Self { pool };
        db.initialize().await?;
        info!("SQLite database ready at {}", url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[Id]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    qb.push(")");
}

/// Pushes `column LIKE ? ESCAPE '\'` for every searchable user column,
/// joined with OR.
fn push_user_match(qb: &mut QueryBuilder<'_, Sqlite>, like: &str) {
    qb.push("(");
    for (i, column) in USER_SEARCH_COLUMNS.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(like.to_string())
            .push(r" ESCAPE '\'");
    }
    qb.push(")");
}

fn map_user_write_error(e: sqlx::Error, login_name: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Validation(format!("login_name {} already exists", login_name));
        }
    }
    AppError::DatabaseError(format!("Failed to write user {}: {}", login_name, e))
}

/// Adds `delta` to a counter, creating it on first use. Counters never go
/// below zero.
async fn bump_count(
    conn: &mut SqliteConnection,
    id: Id,
    kind: CounterKind,
    delta: i64,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO object_counts (id, kind, count, updated_time) VALUES (?, ?, MAX(?, 0), ?) \
         ON CONFLICT(id, kind) DO UPDATE SET count = MAX(object_counts.count + ?, 0), updated_time = excluded.updated_time",
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(delta)
    .bind(current_time_millis())
    .bind(delta)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to update {} count of {}: {}", kind.as_str(), id, e)))?;
    Ok(())
}

async fn insert_association(
    conn: &mut SqliteConnection,
    id1: Id,
    atype: AssociationType,
    id2: Id,
) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO associations (id1, atype, id2, time_created) VALUES (?, ?, ?, ?)",
    )
    .bind(id1)
    .bind(atype.as_str())
    .bind(id2)
    .bind(current_time_millis())
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to create association: {}", e)))?;
    Ok(result.rows_affected() > 0)
}

async fn delete_association(
    conn: &mut SqliteConnection,
    id1: Id,
    atype: AssociationType,
    id2: Id,
) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM associations WHERE id1 = ? AND atype = ? AND id2 = ?")
        .bind(id1)
        .bind(atype.as_str())
        .bind(id2)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete association: {}", e)))?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    async fn create_user(&self, user: &UserRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, login_name, password_hash, first_name, last_name, location, description, occupation, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.login_name)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.location)
        .bind(&user.description)
        .bind(&user.occupation)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_user_write_error(e, &user.login_name))?;
        Ok(())
    }

    async fn get_user(&self, id: Id) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USERS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get user {}: {}", id, e)))?;
        Ok(user)
    }

    async fn get_user_by_login(&self, login_name: &str) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USERS} WHERE login_name = ?"))
            .bind(login_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_users(&self, ids: &[Id]) -> AppResult<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut users = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(SELECT_USERS);
            qb.push(" WHERE id IN ");
            push_id_list(&mut qb, batch);
            users.extend(qb.build_query_as::<UserRecord>().fetch_all(&self.pool).await?);
        }
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn get_user_refs(&self, ids: &[Id]) -> AppResult<Vec<UserRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut users = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let mut qb =
                QueryBuilder::<Sqlite>::new("SELECT id, first_name, last_name FROM users WHERE id IN ");
            push_id_list(&mut qb, batch);
            users.extend(qb.build_query_as::<UserRef>().fetch_all(&self.pool).await?);
        }
        Ok(users)
    }

    async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USERS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list users: {}", e)))?;
        Ok(users)
    }

    async fn update_user(&self, user: &UserRecord) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET login_name = ?, first_name = ?, last_name = ?, location = ?, description = ?, occupation = ? \
             WHERE id = ?",
        )
        .bind(&user.login_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.location)
        .bind(&user.description)
        .bind(&user.occupation)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_user_write_error(e, &user.login_name))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn search_users(&self, pattern: &SearchPattern) -> AppResult<Vec<UserRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_USERS);
        qb.push(" WHERE ");
        push_user_match(&mut qb, pattern.like_pattern());
        qb.push(" ORDER BY id");
        Ok(qb.build_query_as::<UserRecord>().fetch_all(&self.pool).await?)
    }

    async fn create_photo(&self, photo: &PhotoRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO photos (id, user_id, file_name, date_time) VALUES (?, ?, ?, ?)")
            .bind(photo.id)
            .bind(photo.user_id)
            .bind(&photo.file_name)
            .bind(photo.date_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create photo {}: {}", photo.id, e)))?;
        bump_count(&mut tx, photo.user_id, CounterKind::Photos, 1).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_photo(&self, id: Id) -> AppResult<Option<PhotoRecord>> {
        let photo = sqlx::query_as::<_, PhotoRecord>(&format!("{SELECT_PHOTOS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get photo {}: {}", id, e)))?;
        Ok(photo)
    }

    async fn get_photos(&self, ids: &[Id]) -> AppResult<Vec<PhotoRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut photos = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(SELECT_PHOTOS);
            qb.push(" WHERE id IN ");
            push_id_list(&mut qb, batch);
            photos.extend(qb.build_query_as::<PhotoRecord>().fetch_all(&self.pool).await?);
        }
        Ok(photos)
    }

    async fn get_photos_by_user(&self, user_id: Id) -> AppResult<Vec<PhotoRecord>> {
        let photos = sqlx::query_as::<_, PhotoRecord>(&format!(
            "{SELECT_PHOTOS} WHERE user_id = ? ORDER BY date_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    async fn delete_photo(&self, id: Id) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Id> = sqlx::query_scalar("SELECT user_id FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(owner) = owner else {
            return Ok(false);
        };

        let authors: Vec<(Id, i64)> = sqlx::query_as(
            "SELECT user_id, COUNT(*) FROM comments WHERE photo_id = ? GROUP BY user_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        for (author, count) in authors {
            bump_count(&mut tx, author, CounterKind::Comments, -count).await?;
        }

        sqlx::query("DELETE FROM comments WHERE photo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM associations WHERE id1 = ? AND atype = ?")
            .bind(id)
            .bind(AssociationType::LikedBy.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM object_counts WHERE id = ? AND kind = ?")
            .bind(id)
            .bind(CounterKind::Likes.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_count(&mut tx, owner, CounterKind::Photos, -1).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete photo {}: {}", id, e)))?;
        debug!("Deleted photo {} of user {}", id, owner);
        Ok(true)
    }

    async fn search_photos(&self, pattern: &SearchPattern) -> AppResult<Vec<PhotoRecord>> {
        let like = pattern.like_pattern();
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.user_id, p.file_name, p.date_time FROM photos p WHERE p.file_name LIKE ",
        );
        qb.push_bind(like).push(r" ESCAPE '\'");
        qb.push(" OR EXISTS (SELECT 1 FROM comments c WHERE c.photo_id = p.id AND c.comment LIKE ")
            .push_bind(like)
            .push(r" ESCAPE '\')");
        qb.push(" OR p.user_id IN (SELECT id FROM users WHERE ");
        push_user_match(&mut qb, like);
        qb.push(")");
        qb.push(" ORDER BY p.date_time DESC, p.id DESC");
        Ok(qb.build_query_as::<PhotoRecord>().fetch_all(&self.pool).await?)
    }

    async fn create_comment(&self, comment: &CommentRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO comments (id, photo_id, user_id, comment, date_time) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.id)
        .bind(comment.photo_id)
        .bind(comment.user_id)
        .bind(&comment.comment)
        .bind(comment.date_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create comment: {}", e)))?;
        bump_count(&mut tx, comment.user_id, CounterKind::Comments, 1).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_comment(&self, id: Id) -> AppResult<Option<CommentRecord>> {
        let comment = sqlx::query_as::<_, CommentRecord>(&format!("{SELECT_COMMENTS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: Id, text: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE comments SET comment = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update comment {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }
        Ok(())
    }

    async fn delete_comment(&self, id: Id) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let author: Option<Id> = sqlx::query_scalar("SELECT user_id FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(author) = author else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete comment {}: {}", id, e)))?;
        bump_count(&mut tx, author, CounterKind::Comments, -1).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn get_comments_for_photos(&self, photo_ids: &[Id]) -> AppResult<Vec<CommentRecord>> {
        if photo_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut comments = Vec::new();
        for batch in photo_ids.chunks(ID_BATCH_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COMMENTS);
            qb.push(" WHERE photo_id IN ");
            push_id_list(&mut qb, batch);
            comments.extend(qb.build_query_as::<CommentRecord>().fetch_all(&self.pool).await?);
        }
        comments.sort_by(|a, b| a.date_time.cmp(&b.date_time).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn get_comments_by_user(&self, user_id: Id) -> AppResult<Vec<CommentRecord>> {
        let comments = sqlx::query_as::<_, CommentRecord>(&format!(
            "{SELECT_COMMENTS} WHERE user_id = ? ORDER BY date_time DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn search_comments(&self, pattern: &SearchPattern) -> AppResult<Vec<CommentRecord>> {
        let like = pattern.like_pattern();
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COMMENTS);
        qb.push(" WHERE comment LIKE ")
            .push_bind(like)
            .push(r" ESCAPE '\'");
        qb.push(" OR user_id IN (SELECT id FROM users WHERE ");
        push_user_match(&mut qb, like);
        qb.push(")");
        qb.push(" ORDER BY photo_id, date_time, id");
        Ok(qb.build_query_as::<CommentRecord>().fetch_all(&self.pool).await?)
    }

    async fn add_friendship(&self, a: Id, b: Id) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let forward = insert_association(&mut tx, a, AssociationType::Friendship, b).await?;
        let backward = insert_association(&mut tx, b, AssociationType::Friendship, a).await?;
        if forward {
            bump_count(&mut tx, a, CounterKind::Friends, 1).await?;
        }
        if backward {
            bump_count(&mut tx, b, CounterKind::Friends, 1).await?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to add friendship {} <-> {}: {}", a, b, e)))?;
        Ok(forward || backward)
    }

    async fn remove_friendship(&self, a: Id, b: Id) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let forward = delete_association(&mut tx, a, AssociationType::Friendship, b).await?;
        let backward = delete_association(&mut tx, b, AssociationType::Friendship, a).await?;
        if forward {
            bump_count(&mut tx, a, CounterKind::Friends, -1).await?;
        }
        if backward {
            bump_count(&mut tx, b, CounterKind::Friends, -1).await?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to remove friendship {} <-> {}: {}", a, b, e)))?;
        Ok(forward || backward)
    }

    async fn toggle_like(&self, photo_id: Id, user_id: Id) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        // The delete runs first so the transaction holds the write lock
        // before it decides which way to flip.
        let unliked = delete_association(&mut tx, photo_id, AssociationType::LikedBy, user_id).await?;
        let liked = if unliked {
            bump_count(&mut tx, photo_id, CounterKind::Likes, -1).await?;
            false
        } else {
            insert_association(&mut tx, photo_id, AssociationType::LikedBy, user_id).await?;
            bump_count(&mut tx, photo_id, CounterKind::Likes, 1).await?;
            true
        };
        tx.commit().await?;
        Ok(liked)
    }

    async fn get_association_targets(&self, id1: Id, atype: AssociationType) -> AppResult<Vec<Id>> {
        let ids = sqlx::query_scalar::<_, Id>(
            "SELECT id2 FROM associations WHERE id1 = ? AND atype = ? ORDER BY time_created, id2",
        )
        .bind(id1)
        .bind(atype.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn association_exists(
        &self,
        id1: Id,
        atype: AssociationType,
        id2: Id,
    ) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM associations WHERE id1 = ? AND atype = ? AND id2 = ?")
            .bind(id1)
            .bind(atype.as_str())
            .bind(id2)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to check association existence: {}", e))
            })?;
        Ok(row.is_some())
    }

    async fn filter_associated(
        &self,
        id1s: &[Id],
        atype: AssociationType,
        id2: Id,
    ) -> AppResult<HashSet<Id>> {
        if id1s.is_empty() {
            return Ok(HashSet::new());
        }
        let mut found = HashSet::new();
        for batch in id1s.chunks(ID_BATCH_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT id1 FROM associations WHERE atype = ");
            qb.push_bind(atype.as_str())
                .push(" AND id2 = ")
                .push_bind(id2)
                .push(" AND id1 IN ");
            push_id_list(&mut qb, batch);
            found.extend(qb.build_query_scalar::<Id>().fetch_all(&self.pool).await?);
        }
        Ok(found)
    }

    async fn get_counts(&self, ids: &[Id], kind: CounterKind) -> AppResult<HashMap<Id, u64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut counts = HashMap::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let mut qb =
                QueryBuilder::<Sqlite>::new("SELECT id, count FROM object_counts WHERE kind = ");
            qb.push_bind(kind.as_str()).push(" AND id IN ");
            push_id_list(&mut qb, batch);
            let rows = qb
                .build_query_as::<(Id, i64)>()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to get {} counts: {}", kind.as_str(), e))
                })?;
            counts.extend(rows.into_iter().map(|(id, count)| (id, count.max(0) as u64)));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(id: i64, login_name: &str, first_name: &str) -> UserRecord {
        UserRecord {
            id: Id(id),
            login_name: login_name.to_string(),
            password_hash: "hash".to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            location: String::new(),
            description: String::new(),
            occupation: String::new(),
            created_at: Utc::now(),
        }
    }

    fn photo(id: i64, user_id: i64, file_name: &str) -> PhotoRecord {
        PhotoRecord {
            id: Id(id),
            user_id: Id(user_id),
            file_name: file_name.to_string(),
            date_time: Utc::now(),
        }
    }

    fn comment(id: i64, photo_id: i64, user_id: i64, text: &str) -> CommentRecord {
        CommentRecord {
            id: Id(id),
            photo_id: Id(photo_id),
            user_id: Id(user_id),
            comment: text.to_string(),
            date_time: Utc::now(),
        }
    }

    async fn seeded() -> SqliteDatabase {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        db.create_user(&user(1, "ada", "Ada")).await.unwrap();
        db.create_user(&user(2, "bob", "Bob")).await.unwrap();
        db.create_user(&user(3, "cy", "Cy")).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_duplicate_login_is_a_validation_error() {
        let db = seeded().await;
        let err = db.create_user(&user(9, "ada", "Other")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_friendship_is_symmetric_and_idempotent() {
        let db = seeded().await;

        assert!(db.add_friendship(Id(1), Id(2)).await.unwrap());
        assert!(!db.add_friendship(Id(1), Id(2)).await.unwrap());
        assert!(!db.add_friendship(Id(2), Id(1)).await.unwrap());

        assert_eq!(
            db.get_association_targets(Id(1), AssociationType::Friendship).await.unwrap(),
            vec![Id(2)]
        );
        assert_eq!(
            db.get_association_targets(Id(2), AssociationType::Friendship).await.unwrap(),
            vec![Id(1)]
        );
        assert_eq!(db.get_count(Id(1), CounterKind::Friends).await.unwrap(), 1);
        assert_eq!(db.get_count(Id(2), CounterKind::Friends).await.unwrap(), 1);

        assert!(db.remove_friendship(Id(2), Id(1)).await.unwrap());
        assert!(!db.remove_friendship(Id(2), Id(1)).await.unwrap());
        assert_eq!(db.get_count(Id(1), CounterKind::Friends).await.unwrap(), 0);
        assert_eq!(db.get_count(Id(2), CounterKind::Friends).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_like_toggles() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "a.jpg")).await.unwrap();

        assert!(db.toggle_like(Id(10), Id(2)).await.unwrap());
        assert!(db.toggle_like(Id(10), Id(3)).await.unwrap());
        assert_eq!(db.get_count(Id(10), CounterKind::Likes).await.unwrap(), 2);

        assert!(!db.toggle_like(Id(10), Id(2)).await.unwrap());
        assert_eq!(db.get_count(Id(10), CounterKind::Likes).await.unwrap(), 1);

        let liked = db
            .filter_associated(&[Id(10)], AssociationType::LikedBy, Id(3))
            .await
            .unwrap();
        assert!(liked.contains(&Id(10)));
    }

    #[tokio::test]
    async fn test_delete_photo_cascades_and_adjusts_counters() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "a.jpg")).await.unwrap();
        db.create_photo(&photo(11, 1, "b.jpg")).await.unwrap();
        db.create_comment(&comment(20, 10, 2, "nice")).await.unwrap();
        db.create_comment(&comment(21, 10, 2, "really nice")).await.unwrap();
        db.create_comment(&comment(22, 11, 2, "other photo")).await.unwrap();
        db.toggle_like(Id(10), Id(3)).await.unwrap();

        assert_eq!(db.get_count(Id(1), CounterKind::Photos).await.unwrap(), 2);
        assert_eq!(db.get_count(Id(2), CounterKind::Comments).await.unwrap(), 3);

        assert!(db.delete_photo(Id(10)).await.unwrap());
        assert!(!db.delete_photo(Id(10)).await.unwrap());

        assert!(db.get_photo(Id(10)).await.unwrap().is_none());
        assert!(db.get_comment(Id(20)).await.unwrap().is_none());
        assert_eq!(db.get_count(Id(1), CounterKind::Photos).await.unwrap(), 1);
        assert_eq!(db.get_count(Id(2), CounterKind::Comments).await.unwrap(), 1);
        assert_eq!(db.get_count(Id(10), CounterKind::Likes).await.unwrap(), 0);
        assert!(!db
            .association_exists(Id(10), AssociationType::LikedBy, Id(3))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_comment_delete_decrements_author_count() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "a.jpg")).await.unwrap();
        db.create_comment(&comment(20, 10, 2, "first")).await.unwrap();

        assert!(db.delete_comment(Id(20)).await.unwrap());
        assert!(!db.delete_comment(Id(20)).await.unwrap());
        assert_eq!(db.get_count(Id(2), CounterKind::Comments).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_matches_literally_and_case_insensitively() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "sunset_beach.jpg")).await.unwrap();
        db.create_photo(&photo(11, 2, "sunsetXbeach.jpg")).await.unwrap();
        db.create_comment(&comment(20, 11, 3, "100% Great")).await.unwrap();

        let pattern = SearchPattern::parse(Some("SUNSET_")).unwrap();
        let photos = db.search_photos(&pattern).await.unwrap();
        assert_eq!(photos.iter().map(|p| p.id).collect::<Vec<_>>(), vec![Id(10)]);

        let pattern = SearchPattern::parse(Some("0% great")).unwrap();
        let comments = db.search_comments(&pattern).await.unwrap();
        assert_eq!(comments.len(), 1);

        let pattern = SearchPattern::parse(Some("nobody")).unwrap();
        assert!(db.search_users(&pattern).await.unwrap().is_empty());
        assert!(db.search_photos(&pattern).await.unwrap().is_empty());

        let pattern = SearchPattern::parse(Some("ADA")).unwrap();
        let users = db.search_users(&pattern).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].login_name, "ada");
    }

    #[tokio::test]
    async fn test_search_photos_by_owner_is_newest_first() {
        let db = seeded().await;
        let mut older = photo(10, 2, "one.jpg");
        older.date_time = Utc::now() - Duration::hours(1);
        db.create_photo(&older).await.unwrap();
        db.create_photo(&photo(11, 2, "two.jpg")).await.unwrap();

        let pattern = SearchPattern::parse(Some("BOB")).unwrap();
        let photos = db.search_photos(&pattern).await.unwrap();
        assert_eq!(photos.iter().map(|p| p.id).collect::<Vec<_>>(), vec![Id(11), Id(10)]);
    }

    #[tokio::test]
    async fn test_comment_search_matches_author() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "a.jpg")).await.unwrap();
        db.create_comment(&comment(20, 10, 3, "hello")).await.unwrap();
        db.create_comment(&comment(21, 10, 2, "hi")).await.unwrap();

        let pattern = SearchPattern::parse(Some("cy")).unwrap();
        let comments = db.search_comments(&pattern).await.unwrap();
        assert_eq!(comments.iter().map(|c| c.id).collect::<Vec<_>>(), vec![Id(20)]);
    }

    #[tokio::test]
    async fn test_id_lists_longer_than_the_bind_limit() {
        let db = seeded().await;
        db.create_photo(&photo(10, 1, "a.jpg")).await.unwrap();
        db.create_comment(&comment(20, 10, 2, "first")).await.unwrap();
        db.toggle_like(Id(10), Id(2)).await.unwrap();

        // 40k ids is past SQLite's 32766 bind parameters per statement
        let mut ids: Vec<Id> = (1_000..41_000).map(Id).collect();
        ids.extend([Id(1), Id(2), Id(3), Id(10)]);

        assert_eq!(db.get_users(&ids).await.unwrap().len(), 3);
        assert_eq!(db.get_user_refs(&ids).await.unwrap().len(), 3);
        assert_eq!(db.get_photos(&ids).await.unwrap().len(), 1);
        assert_eq!(db.get_comments_for_photos(&ids).await.unwrap().len(), 1);

        let liked = db
            .filter_associated(&ids, AssociationType::LikedBy, Id(2))
            .await
            .unwrap();
        assert_eq!(liked, HashSet::from([Id(10)]));

        let counts = db.get_counts(&ids, CounterKind::Photos).await.unwrap();
        assert_eq!(counts.get(&Id(1)), Some(&1));
        assert_eq!(counts.len(), 1);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("photos.db");
        let url = format!("sqlite://{}", path.display());

        let db = SqliteDatabase::connect(&url, 2).await.unwrap();
        db.create_user(&user(1, "ada", "Ada")).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }
}
