// Domain models - stored records, request bodies and response views

pub mod records;
pub mod requests;
pub mod views;

pub use records::{CommentRecord, PhotoRecord, UserRecord, UserRef};
pub use requests::{CommentRequest, RegisterUserRequest, SearchQuery, UpdateProfileRequest};
pub use views::{
    AuthoredComment, CommentAdded, CommentSearchHit, CommentView, FriendSummary, FriendshipStatus, LikeStatus,
    MessageResponse, PhotoRef, PhotoView, RegisterResponse, UpdateProfileResponse, UserCounters,
    UserListEntry, UserProfile,
};
