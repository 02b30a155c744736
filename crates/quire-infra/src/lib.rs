//! # Quire Infrastructure
//!
//! Concrete implementations of the ports defined in `quire-core`.
//! This crate contains the SeaORM repositories, the in-memory fallback
//! store, and the outbound mail channels.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory storage and console mail only
//! - `postgres` - PostgreSQL storage via SeaORM
//! - `webhook-mail` - Mail delivery through an HTTP relay via reqwest

pub mod database;
pub mod mail;
pub mod memory;

// Re-exports - always available
pub use database::DatabaseConfig;
pub use mail::{ConsoleMailer, InMemoryMailer};
pub use memory::MemoryStore;

// Re-exports - Postgres
#[cfg(feature = "postgres")]
pub use database::{
    PostgresCommentRepository, PostgresPostRepository, PostgresTagRepository,
    PostgresUserRepository,
};

// Re-exports - webhook mail
#[cfg(feature = "webhook-mail")]
pub use mail::WebhookMailer;
