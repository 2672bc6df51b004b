// FriendService - symmetric friend edges between the viewer and another user

use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::Id;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{CounterKind, DatabaseInterface};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::FriendshipStatus;

pub struct FriendService {
    db: Arc<dyn DatabaseInterface>,
}

impl FriendService {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Make the viewer and `target` friends. Adding an existing friend
    /// changes nothing.
    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn add_friend(&self, vc: &ViewerContext, target: Id) -> AppResult<FriendshipStatus> {
        if vc.is_viewer(target) {
            return Err(AppError::BadRequest(
                "You cannot add yourself as a friend".to_string(),
            ));
        }
        self.check_endpoints(vc, target).await?;

        let changed = self.db.add_friendship(vc.user_id, target).await?;
        let friend_count = self.db.get_count(target, CounterKind::Friends).await?;
        let message = if changed {
            info!("{} and {} are now friends", vc.user_id, target);
            "Friend added successfully"
        } else {
            "Already friends"
        };

        Ok(FriendshipStatus {
            message: message.to_string(),
            is_friend: true,
            friend_count,
        })
    }

    /// Remove the friendship in both directions. Removing a non-friend is a
    /// no-op.
    #[instrument(skip(self, vc), fields(viewer = %vc.user_id))]
    pub async fn remove_friend(
        &self,
        vc: &ViewerContext,
        target: Id,
    ) -> AppResult<FriendshipStatus> {
        if vc.is_viewer(target) {
            return Err(AppError::BadRequest(
                "You cannot remove yourself as a friend".to_string(),
            ));
        }
        self.check_endpoints(vc, target).await?;

        let changed = self.db.remove_friendship(vc.user_id, target).await?;
        let friend_count = self.db.get_count(target, CounterKind::Friends).await?;
        let message = if changed {
            info!("{} and {} are no longer friends", vc.user_id, target);
            "Friend removed successfully"
        } else {
            "Not friends"
        };

        Ok(FriendshipStatus {
            message: message.to_string(),
            is_friend: false,
            friend_count,
        })
    }

    async fn check_endpoints(&self, vc: &ViewerContext, target: Id) -> AppResult<()> {
        let (target_user, current_user) =
            futures::try_join!(self.db.get_user(target), self.db.get_user(vc.user_id))?;
        if target_user.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if current_user.is_none() {
            return Err(AppError::NotFound("Current user not found".to_string()));
        }
        Ok(())
    }
}
