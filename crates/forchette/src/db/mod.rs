//! SQLite persistence for session snapshots.

mod error;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::{NewSessionRow, SessionRow};
pub use repository::SqliteStore;
