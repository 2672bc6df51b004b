// Infrastructure modules
pub mod database;              // Database interface
pub mod sqlite_database;       // SQLite implementation
pub mod cache;                 // LRU caching
pub mod id_generator;          // Snowflake id generation
pub mod image_store;           // Stored image files
pub mod security;              // Tokens and password hashing
pub mod middleware;            // Auth gate
pub mod viewer;                // Viewer context

pub use database::{AssociationType, CounterKind, DatabaseInterface};
pub use sqlite_database::SqliteDatabase;
pub use cache::{Cache, UserRefCache};
pub use id_generator::IdGenerator;
pub use image_store::ImageStore;
pub use security::{Claims, SecurityService};
pub use viewer::ViewerContext;
