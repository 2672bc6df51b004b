// PhotoService - photos with their comments and likes, and the mutations on
// them that are gated by existence and ownership

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::core::Id;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{AssociationType, CounterKind, DatabaseInterface};
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::image_store::ImageStore;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthoredComment, CommentRecord, CommentRequest, CommentView, LikeStatus, PhotoRecord,
    PhotoView,
};
use crate::services::user_lookup::UserLookup;

/// Like counts and the viewer's own likes for a batch of photos.
#[derive(Debug, Default)]
pub struct LikeSummary {
    pub counts: HashMap<Id, u64>,
    pub liked_by_viewer: HashSet<Id>,
}

impl LikeSummary {
    pub fn count(&self, photo_id: Id) -> u64 {
        self.counts.get(&photo_id).copied().unwrap_or(0)
    }

    pub fn is_liked(&self, photo_id: Id) -> bool {
        self.liked_by_viewer.contains(&photo_id)
    }
}

pub struct PhotoService {
    db: Arc<dyn DatabaseInterface>,
    lookup: Arc<UserLookup>,
    images: Arc<ImageStore>,
    ids: Arc<IdGenerator>,
}

impl PhotoService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        lookup: Arc<UserLookup>,
        images: Arc<ImageStore>,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self {
            db,
            lookup,
            images,
            ids,
        }
    }

    /// Record a photo whose image is already in the image store.
    #[instrument(skip(self))]
    pub async fn create_photo(
        &self,
        owner: Id,
        file_name: &str,
        date_time: Option<DateTime<Utc>>,
    ) -> AppResult<PhotoRecord> {
        self.images.path_for(file_name)?;
        if self.db.get_user(owner).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let photo = PhotoRecord {
            id: self.ids.next_id(),
            user_id: owner,
            file_name: file_name.to_string(),
            date_time: date_time.unwrap_or_else(Utc::now),
        };
        self.db.create_photo(&photo).await?;
        info!("Created photo {} for {}", photo.id, owner);
        Ok(photo)
    }

    pub async fn require_photo(&self, photo_id: Id) -> AppResult<PhotoRecord> {
        self.db
            .get_photo(photo_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn photos_of_user(&self, vc: &ViewerContext, user_id: Id) -> AppResult<Vec<PhotoView>> {
        if self.db.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let photos = self.db.get_photos_by_user(user_id).await?;
        self.build_views(vc, photos).await
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn get_photo(&self, vc: &ViewerContext, photo_id: Id) -> AppResult<PhotoView> {
        let photo = self.require_photo(photo_id).await?;
        self.build_views(vc, vec![photo])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Photo {} vanished while loading", photo_id)))
    }

    /// Joins comments, user display records and like state onto `photos`,
    /// keeping their order.
    pub async fn build_views(
        &self,
        vc: &ViewerContext,
        photos: Vec<PhotoRecord>,
    ) -> AppResult<Vec<PhotoView>> {
        if photos.is_empty() {
            return Ok(Vec::new());
        }
        let photo_ids: Vec<Id> = photos.iter().map(|photo| photo.id).collect();

        let (comments, likes) = futures::try_join!(
            self.db.get_comments_for_photos(&photo_ids),
            self.like_summary(vc, &photo_ids),
        )?;

        let mut user_ids: Vec<Id> = photos.iter().map(|photo| photo.user_id).collect();
        user_ids.extend(comments.iter().map(|comment| comment.user_id));
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.lookup.resolve(&user_ids).await?;

        let mut comments_by_photo: HashMap<Id, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            comments_by_photo
                .entry(comment.photo_id)
                .or_default()
                .push(CommentView {
                    id: comment.id,
                    user: users.get(&comment.user_id).cloned(),
                    comment: comment.comment,
                    date_time: comment.date_time,
                });
        }

        debug!("Built {} photo views", photos.len());
        Ok(photos
            .into_iter()
            .map(|photo| PhotoView {
                user: users.get(&photo.user_id).cloned(),
                comments: comments_by_photo.remove(&photo.id).unwrap_or_default(),
                like_count: likes.count(photo.id),
                is_liked: likes.is_liked(photo.id),
                id: photo.id,
                user_id: photo.user_id,
                file_name: photo.file_name,
                date_time: photo.date_time,
            })
            .collect())
    }

    pub async fn like_summary(&self, vc: &ViewerContext, photo_ids: &[Id]) -> AppResult<LikeSummary> {
        let (counts, liked_by_viewer) = futures::try_join!(
            self.db.get_counts(photo_ids, CounterKind::Likes),
            self.db
                .filter_associated(photo_ids, AssociationType::LikedBy, vc.user_id),
        )?;
        Ok(LikeSummary {
            counts,
            liked_by_viewer,
        })
    }

    #[instrument(skip(self, vc, request), fields(viewer = %vc.user_id))]
    pub async fn add_comment(
        &self,
        vc: &ViewerContext,
        photo_id: Id,
        request: CommentRequest,
    ) -> AppResult<CommentRecord> {
        let text = request.text()?;
        futures::try_join!(self.require_viewer(vc), self.require_photo(photo_id))?;

        let comment = CommentRecord {
            id: self.ids.next_id(),
            photo_id,
            user_id: vc.user_id,
            comment: text,
            date_time: Utc::now(),
        };
        self.db.create_comment(&comment).await?;
        info!("Comment {} added to photo {}", comment.id, photo_id);
        Ok(comment)
    }

    #[instrument(skip(self, vc, request), fields(viewer = %vc.user_id))]
    pub async fn update_comment(
        &self,
        vc: &ViewerContext,
        photo_id: Id,
        comment_id: Id,
        request: CommentRequest,
    ) -> AppResult<()> {
        let text = request.text()?;
        let comment = self.require_comment(photo_id, comment_id).await?;
        if !vc.is_viewer(comment.user_id) {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        self.db.update_comment(comment_id, &text).await?;
        info!("Comment {} updated", comment_id);
        Ok(())
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn delete_comment(
        &self,
        vc: &ViewerContext,
        photo_id: Id,
        comment_id: Id,
    ) -> AppResult<()> {
        let comment = self.require_comment(photo_id, comment_id).await?;
        if !vc.is_viewer(comment.user_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        if !self.db.delete_comment(comment_id).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        info!("Comment {} deleted", comment_id);
        Ok(())
    }

    /// Tokens outlive the users they were issued for.
    async fn require_viewer(&self, vc: &ViewerContext) -> AppResult<()> {
        match self.db.get_user(vc.user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Current user not found".to_string())),
        }
    }

    /// The comment must exist and belong to the photo.
    async fn require_comment(&self, photo_id: Id, comment_id: Id) -> AppResult<CommentRecord> {
        self.require_photo(photo_id).await?;
        self.db
            .get_comment(comment_id)
            .await?
            .filter(|comment| comment.photo_id == photo_id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn toggle_like(&self, vc: &ViewerContext, photo_id: Id) -> AppResult<LikeStatus> {
        futures::try_join!(self.require_viewer(vc), self.require_photo(photo_id))?;
        let is_liked = self.db.toggle_like(photo_id, vc.user_id).await?;
        let like_count = self.db.get_count(photo_id, CounterKind::Likes).await?;
        debug!("Photo {} liked={} count={}", photo_id, is_liked, like_count);
        Ok(LikeStatus {
            like_count,
            is_liked,
        })
    }

    /// Owner only. Removes the photo, its comments and likes, then the image
    /// file. A file that cannot be removed is logged and left behind.
    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn delete_photo(&self, vc: &ViewerContext, photo_id: Id) -> AppResult<()> {
        let photo = self.require_photo(photo_id).await?;
        if !vc.is_viewer(photo.user_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own photos".to_string(),
            ));
        }

        if !self.db.delete_photo(photo_id).await? {
            return Err(AppError::NotFound("Photo not found".to_string()));
        }
        if let Err(e) = self.images.remove(&photo.file_name).await {
            warn!("Photo {} deleted but its image was kept: {}", photo_id, e);
        }
        info!("Photo {} deleted", photo_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn comments_of_user(&self, user_id: Id) -> AppResult<Vec<AuthoredComment>> {
        if self.db.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let comments = self.db.get_comments_by_user(user_id).await?;
        Ok(comments.into_iter().map(AuthoredComment::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;
    use crate::models::UserRecord;
    use tempfile::TempDir;

    struct Fixture {
        service: PhotoService,
        db: Arc<dyn DatabaseInterface>,
        images: Arc<ImageStore>,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        for (id, login_name) in [(1, "ada"), (2, "bob")] {
            db.create_user(&UserRecord {
                id: Id(id),
                login_name: login_name.to_string(),
                password_hash: "hash".to_string(),
                first_name: login_name.to_uppercase(),
                last_name: "Tester".to_string(),
                location: String::new(),
                description: String::new(),
                occupation: String::new(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let images = Arc::new(ImageStore::open(dir.path()).await.unwrap());
        let lookup = Arc::new(UserLookup::new(db.clone(), 16));
        let service = PhotoService::new(db.clone(), lookup, images.clone(), Arc::new(IdGenerator::new(1)));
        Fixture {
            service,
            db,
            images,
            _dir: dir,
        }
    }

    fn viewer(id: i64) -> ViewerContext {
        ViewerContext::new(Id(id), "viewer", "req-test")
    }

    fn comment(text: &str) -> CommentRequest {
        CommentRequest {
            comment: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_photo_view_joins_comments_and_likes() {
        let fx = fixture().await;
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();
        fx.service.add_comment(&viewer(2), photo.id, comment("  nice  ")).await.unwrap();
        fx.service.toggle_like(&viewer(2), photo.id).await.unwrap();

        let view = fx.service.get_photo(&viewer(2), photo.id).await.unwrap();
        assert_eq!(view.user.as_ref().unwrap().first_name, "ADA");
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].comment, "nice");
        assert_eq!(view.comments[0].user.as_ref().unwrap().id, Id(2));
        assert_eq!(view.like_count, 1);
        assert!(view.is_liked);

        let owner_view = fx.service.get_photo(&viewer(1), photo.id).await.unwrap();
        assert!(!owner_view.is_liked);
    }

    #[tokio::test]
    async fn test_like_twice_toggles_back() {
        let fx = fixture().await;
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();

        let liked = fx.service.toggle_like(&viewer(2), photo.id).await.unwrap();
        assert_eq!(liked, LikeStatus { like_count: 1, is_liked: true });

        let unliked = fx.service.toggle_like(&viewer(2), photo.id).await.unwrap();
        assert_eq!(unliked, LikeStatus { like_count: 0, is_liked: false });

        assert!(matches!(
            fx.service.toggle_like(&viewer(2), Id(404)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_edits_or_deletes_comment() {
        let fx = fixture().await;
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();
        let added = fx.service.add_comment(&viewer(2), photo.id, comment("mine")).await.unwrap();

        assert!(matches!(
            fx.service.update_comment(&viewer(1), photo.id, added.id, comment("theirs")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            fx.service.delete_comment(&viewer(1), photo.id, added.id).await,
            Err(AppError::Forbidden(_))
        ));

        fx.service
            .update_comment(&viewer(2), photo.id, added.id, comment(" edited "))
            .await
            .unwrap();
        assert_eq!(fx.db.get_comment(added.id).await.unwrap().unwrap().comment, "edited");

        fx.service.delete_comment(&viewer(2), photo.id, added.id).await.unwrap();
        assert_eq!(fx.db.get_count(Id(2), CounterKind::Comments).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_must_belong_to_photo() {
        let fx = fixture().await;
        let first = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();
        let second = fx.service.create_photo(Id(1), "b.jpg", None).await.unwrap();
        let added = fx.service.add_comment(&viewer(2), first.id, comment("hi")).await.unwrap();

        assert!(matches!(
            fx.service.delete_comment(&viewer(2), second.id, added.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.add_comment(&viewer(2), first.id, comment("   ")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_photo_removes_file_and_row() {
        let fx = fixture().await;
        fx.images.save("a.jpg", b"jpeg").await.unwrap();
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();

        assert!(matches!(
            fx.service.delete_photo(&viewer(2), photo.id).await,
            Err(AppError::Forbidden(_))
        ));

        fx.service.delete_photo(&viewer(1), photo.id).await.unwrap();
        assert!(!fx.images.exists("a.jpg").await.unwrap());
        assert!(matches!(
            fx.service.get_photo(&viewer(1), photo.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(fx.db.get_count(Id(1), CounterKind::Photos).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_viewer_cannot_comment_or_like() {
        let fx = fixture().await;
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();

        assert!(matches!(
            fx.service.add_comment(&viewer(999), photo.id, comment("boo")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.toggle_like(&viewer(999), photo.id).await,
            Err(AppError::NotFound(_))
        ));

        let view = fx.service.get_photo(&viewer(1), photo.id).await.unwrap();
        assert!(view.comments.is_empty());
        assert_eq!(view.like_count, 0);
        assert_eq!(fx.db.get_count(Id(999), CounterKind::Comments).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_photo_survives_image_removal_failure() {
        let fx = fixture().await;
        // A directory in place of the file makes the unlink fail
        tokio::fs::create_dir(fx.images.dir().join("a.jpg")).await.unwrap();
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();

        fx.service.delete_photo(&viewer(1), photo.id).await.unwrap();
        assert!(fx.db.get_photo(photo.id).await.unwrap().is_none());
        assert_eq!(fx.db.get_count(Id(1), CounterKind::Photos).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comments_of_user_newest_first() {
        let fx = fixture().await;
        let photo = fx.service.create_photo(Id(1), "a.jpg", None).await.unwrap();
        let first = fx.service.add_comment(&viewer(2), photo.id, comment("one")).await.unwrap();
        let second = fx.service.add_comment(&viewer(2), photo.id, comment("two")).await.unwrap();
        fx.service.add_comment(&viewer(1), photo.id, comment("owner")).await.unwrap();

        let comments = fx.service.comments_of_user(Id(2)).await.unwrap();
        assert_eq!(
            comments.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(comments.iter().all(|c| c.photo_id == photo.id));
    }
}
