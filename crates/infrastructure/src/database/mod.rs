pub mod manager;
pub mod mapping;
pub mod postgres;
pub mod sqlite;
pub use manager::{DatabaseManager, DatabasePool, DatabaseType};
pub use postgres::PostgresTaskRepository;
pub use sqlite::SqliteTaskRepository;
