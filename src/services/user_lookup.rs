// Resolves user ids to display records for join enrichment, reading through
// the LRU cache.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::Id;
use crate::error::AppResult;
use crate::infrastructure::cache::UserRefCache;
use crate::infrastructure::database::DatabaseInterface;
use crate::models::UserRef;

pub struct UserLookup {
    db: Arc<dyn DatabaseInterface>,
    cache: UserRefCache,
}

impl UserLookup {
    pub fn new(db: Arc<dyn DatabaseInterface>, capacity: usize) -> Self {
        Self {
            db,
            cache: UserRefCache::new(capacity),
        }
    }

    /// Display records for `ids`. Ids of users that no longer exist are
    /// absent from the result.
    pub async fn resolve(&self, ids: &[Id]) -> AppResult<HashMap<Id, UserRef>> {
        let (mut found, misses) = self.cache.get_many(ids).await;
        if misses.is_empty() {
            return Ok(found);
        }

        let loaded = self.db.get_user_refs(&misses).await?;
        debug!("User lookup: {} cached, {} loaded", found.len(), loaded.len());
        self.cache.insert_many(loaded.iter().cloned()).await;
        found.extend(loaded.into_iter().map(|user| (user.id, user)));
        Ok(found)
    }

    pub async fn invalidate(&self, id: Id) {
        self.cache.invalidate(id).await;
    }
}
