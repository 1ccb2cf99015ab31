//! Forchette - storage, service and HTTP layers for the restaurant-rating
//! dinner game.
//!
//! The game rules live in [`forchette_core`]. This crate persists session
//! snapshots, applies commands under optimistic concurrency and exposes the
//! result over HTTP and a CLI.
//!
//! # Architecture
//!
//! - **Store**: the [`StateStore`] capability with in-memory and SQLite backends
//! - **Service**: load, apply, compare-and-save ([`SessionService`])
//! - **Server**: axum routes over the service
//! - **Settings**: `forchette.toml` plus `FORCHETTE_*` overrides
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use forchette::{MemoryStore, SessionService};
//! use forchette_core::{CategoryScores, SessionConfig, VoteRequest};
//!
//! # fn example() -> Result<(), forchette::ServiceError> {
//! let service = SessionService::new(Arc::new(MemoryStore::new()));
//! let config = SessionConfig::new(
//!     vec!["Pizza Place".into(), "Sushi Bar".into()],
//!     vec!["Alice".into(), "Bob".into()],
//! );
//! service.create_session("DINNER", None, config)?;
//! service.start_session("DINNER")?;
//! let request = VoteRequest::new(0, 0, CategoryScores::new(8, 7, 9, 6), false);
//! let (_, vote) = service.submit_vote("DINNER", request)?;
//! assert_eq!(vote.total(), 30);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod db;
mod server;
mod service;
mod settings;
mod store;

// Crate-level exports - Persistence
pub use db::{DbError, NewSessionRow, SessionRow, SqliteStore};
pub use store::{MemoryStore, Revision, StateStore, StoreError, StoredSession};

// Crate-level exports - Service
pub use service::{
    DEFAULT_CONFLICT_RETRIES, ServiceError, SessionService, SessionUpdate, normalize_session_id,
};

// Crate-level exports - HTTP
pub use server::{
    ApiError, AppState, ConfigureRequest, CreateSessionRequest, CurrentSlotResponse, ErrorBody,
    ResetRequest, SubmitVoteRequest, VoteResponse, router, serve,
};

// Crate-level exports - Settings
pub use settings::{ENV_DB_PATH, ENV_HOST, ENV_PORT, Settings, SettingsError};
