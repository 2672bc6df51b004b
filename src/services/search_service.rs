// SearchService - free-text search over users, photos and comments
//
// A query matches users on their name, login, occupation or location.
// Photos match on file name, on any comment text, or because their owner
// matched. Comments match on text or because their author matched.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::{Id, SearchPattern};
use crate::error::AppResult;
use crate::infrastructure::database::DatabaseInterface;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{CommentSearchHit, PhotoRecord, PhotoRef, PhotoView, UserListEntry};
use crate::services::photo_service::PhotoService;
use crate::services::user_lookup::UserLookup;
use crate::services::user_service::UserService;

pub struct SearchService {
    db: Arc<dyn DatabaseInterface>,
    lookup: Arc<UserLookup>,
    users: Arc<UserService>,
    photos: Arc<PhotoService>,
}

impl SearchService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        lookup: Arc<UserLookup>,
        users: Arc<UserService>,
        photos: Arc<PhotoService>,
    ) -> Self {
        Self {
            db,
            lookup,
            users,
            photos,
        }
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn search_users(
        &self,
        vc: &ViewerContext,
        query: Option<&str>,
    ) -> AppResult<Vec<UserListEntry>> {
        let Some(pattern) = SearchPattern::parse(query) else {
            return Ok(Vec::new());
        };
        self.users.search_users(vc, &pattern).await
    }

    /// Newest first.
    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn search_photos(
        &self,
        vc: &ViewerContext,
        query: Option<&str>,
    ) -> AppResult<Vec<PhotoView>> {
        let Some(pattern) = SearchPattern::parse(query) else {
            return Ok(Vec::new());
        };

        let photos = self.db.search_photos(&pattern).await?;
        debug!("Photo search {:?}: {} hits", pattern.term(), photos.len());
        self.photos.build_views(vc, photos).await
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn search_comments(
        &self,
        vc: &ViewerContext,
        query: Option<&str>,
    ) -> AppResult<Vec<CommentSearchHit>> {
        let Some(pattern) = SearchPattern::parse(query) else {
            return Ok(Vec::new());
        };

        let comments = self.db.search_comments(&pattern).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let mut photo_ids: Vec<Id> = comments.iter().map(|comment| comment.photo_id).collect();
        photo_ids.sort_unstable();
        photo_ids.dedup();

        let (photos, likes) = futures::try_join!(
            self.db.get_photos(&photo_ids),
            self.photos.like_summary(vc, &photo_ids),
        )?;
        let photos: HashMap<Id, PhotoRecord> =
            photos.into_iter().map(|photo| (photo.id, photo)).collect();

        let mut user_ids: Vec<Id> = comments.iter().map(|comment| comment.user_id).collect();
        user_ids.extend(photos.values().map(|photo| photo.user_id));
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.lookup.resolve(&user_ids).await?;

        debug!("Comment search {:?}: {} hits", pattern.term(), comments.len());
        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let photo = photos.get(&comment.photo_id)?;
                Some(CommentSearchHit {
                    id: comment.id,
                    user: users.get(&comment.user_id).cloned(),
                    comment: comment.comment,
                    date_time: comment.date_time,
                    photo: PhotoRef {
                        id: photo.id,
                        file_name: photo.file_name.clone(),
                        user_id: photo.user_id,
                        owner: users.get(&photo.user_id).cloned(),
                        like_count: likes.count(photo.id),
                        is_liked: likes.is_liked(photo.id),
                    },
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::infrastructure::id_generator::IdGenerator;
    use crate::infrastructure::image_store::ImageStore;
    use crate::infrastructure::security::SecurityService;
    use crate::infrastructure::sqlite_database::SqliteDatabase;
    use crate::models::{CommentRequest, RegisterUserRequest};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    struct Fixture {
        search: SearchService,
        users: Arc<UserService>,
        photos: Arc<PhotoService>,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let ids = Arc::new(IdGenerator::new(1));
        let lookup = Arc::new(UserLookup::new(db.clone(), 16));
        let security = Arc::new(SecurityService::new(&SecurityConfig {
            jwt_secret: "secret".to_string(),
            token_ttl_secs: 60,
        }));
        let images = Arc::new(ImageStore::open(dir.path()).await.unwrap());
        let users = Arc::new(UserService::new(db.clone(), security, ids.clone(), lookup.clone()));
        let photos = Arc::new(PhotoService::new(db.clone(), lookup.clone(), images, ids));
        Fixture {
            search: SearchService::new(db, lookup, users.clone(), photos.clone()),
            users,
            photos,
            _dir: dir,
        }
    }

    async fn register(fx: &Fixture, login_name: &str, first_name: &str) -> ViewerContext {
        let user = fx
            .users
            .register(RegisterUserRequest {
                login_name: Some(login_name.to_string()),
                password: Some("weak".to_string()),
                first_name: Some(first_name.to_string()),
                last_name: Some("Tester".to_string()),
                location: None,
                description: None,
                occupation: None,
            })
            .await
            .unwrap();
        ViewerContext::new(user.id, user.login_name, "req-test")
    }

    fn comment(text: &str) -> CommentRequest {
        CommentRequest {
            comment: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_blank_or_unmatched_queries_are_empty() {
        let fx = fixture().await;
        let ada = register(&fx, "ada", "Ada").await;
        fx.photos.create_photo(ada.user_id, "a.jpg", None).await.unwrap();

        for query in [None, Some(""), Some("   "), Some("zzz")] {
            assert!(fx.search.search_users(&ada, query).await.unwrap().is_empty());
            assert!(fx.search.search_photos(&ada, query).await.unwrap().is_empty());
            assert!(fx.search.search_comments(&ada, query).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_photo_search_matches_owner_file_and_comment() {
        let fx = fixture().await;
        let ada = register(&fx, "ada", "Ada").await;
        let bob = register(&fx, "bob", "Bob").await;

        let by_owner = fx
            .photos
            .create_photo(ada.user_id, "x.jpg", Some(Utc::now() - Duration::hours(2)))
            .await
            .unwrap();
        let by_file = fx
            .photos
            .create_photo(bob.user_id, "ada_portrait.jpg", Some(Utc::now() - Duration::hours(1)))
            .await
            .unwrap();
        let by_comment = fx.photos.create_photo(bob.user_id, "y.jpg", None).await.unwrap();
        fx.photos
            .add_comment(&bob, by_comment.id, comment("looks like ADA"))
            .await
            .unwrap();
        fx.photos.create_photo(bob.user_id, "z.jpg", None).await.unwrap();

        let hits = fx.search.search_photos(&bob, Some("ada")).await.unwrap();
        assert_eq!(
            hits.iter().map(|photo| photo.id).collect::<Vec<_>>(),
            vec![by_comment.id, by_file.id, by_owner.id]
        );
        assert_eq!(hits[2].user.as_ref().unwrap().first_name, "Ada");
    }

    #[tokio::test]
    async fn test_comment_search_matches_text_or_author() {
        let fx = fixture().await;
        let ada = register(&fx, "ada", "Ada").await;
        let bob = register(&fx, "bob", "Bob").await;
        let photo = fx.photos.create_photo(ada.user_id, "a.jpg", None).await.unwrap();
        fx.photos.add_comment(&bob, photo.id, comment("hello")).await.unwrap();
        fx.photos.add_comment(&ada, photo.id, comment("bob was here")).await.unwrap();
        fx.photos.add_comment(&ada, photo.id, comment("unrelated")).await.unwrap();
        fx.photos.toggle_like(&bob, photo.id).await.unwrap();

        let hits = fx.search.search_comments(&bob, Some("bob")).await.unwrap();
        assert_eq!(hits.len(), 2);
        for hit in &hits {
            assert_eq!(hit.photo.id, photo.id);
            assert_eq!(hit.photo.owner.as_ref().unwrap().first_name, "Ada");
            assert_eq!(hit.photo.like_count, 1);
            assert!(hit.photo.is_liked);
        }
    }

    #[tokio::test]
    async fn test_wildcards_match_literally() {
        let fx = fixture().await;
        let ada = register(&fx, "ada", "Ada").await;
        let photo = fx.photos.create_photo(ada.user_id, "a.jpg", None).await.unwrap();
        fx.photos.add_comment(&ada, photo.id, comment("100% sure")).await.unwrap();
        fx.photos.add_comment(&ada, photo.id, comment("1000 sure")).await.unwrap();

        let hits = fx.search.search_comments(&ada, Some("0%")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].comment, "100% sure");

        assert!(fx.search.search_users(&ada, Some("_")).await.unwrap().is_empty());
    }
}
