// Services - business logic between the HTTP handlers and the store

pub mod friend_service;
pub mod photo_service;
pub mod search_service;
pub mod user_lookup;
pub mod user_service;

pub use friend_service::FriendService;
pub use photo_service::PhotoService;
pub use search_service::SearchService;
pub use user_lookup::UserLookup;
pub use user_service::UserService;
