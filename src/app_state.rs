use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        database::DatabaseInterface, id_generator::IdGenerator, image_store::ImageStore,
        middleware::HasSecurityService, security::SecurityService,
        sqlite_database::SqliteDatabase,
    },
    services::{
        friend_service::FriendService, photo_service::PhotoService,
        search_service::SearchService, user_lookup::UserLookup, user_service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseInterface>,
    pub security: Arc<SecurityService>,
    pub images: Arc<ImageStore>,
    pub user_service: Arc<UserService>,
    pub friend_service: Arc<FriendService>,
    pub photo_service: Arc<PhotoService>,
    pub search_service: Arc<SearchService>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database =
            SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
        let db: Arc<dyn DatabaseInterface> = Arc::new(database);

        let images = Arc::new(ImageStore::open(&config.images.dir).await?);
        let security = Arc::new(SecurityService::new(&config.security));
        let ids = Arc::new(IdGenerator::new(config.server.node_id));
        let lookup = Arc::new(UserLookup::new(db.clone(), config.cache.capacity));

        let user_service = Arc::new(UserService::new(
            db.clone(),
            security.clone(),
            ids.clone(),
            lookup.clone(),
        ));
        let friend_service = Arc::new(FriendService::new(db.clone()));
        let photo_service = Arc::new(PhotoService::new(
            db.clone(),
            lookup.clone(),
            images.clone(),
            ids,
        ));
        let search_service = Arc::new(SearchService::new(
            db.clone(),
            lookup,
            user_service.clone(),
            photo_service.clone(),
        ));

        info!("Application state initialized (node {})", config.server.node_id);
        Ok(Self {
            db,
            security,
            images,
            user_service,
            friend_service,
            photo_service,
            search_service,
        })
    }
}

impl HasSecurityService for AppState {
    fn security(&self) -> &SecurityService {
        &self.security
    }
}
