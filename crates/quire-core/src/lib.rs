//! # Quire Core
//!
//! The domain layer of the Quire blog.
//! Entities, ports, and the request-independent rules (pagination, form
//! validation, slugs, publish-timestamp normalization, similar-post ranking).
//! This crate has zero infrastructure dependencies.

pub mod date_range;
pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod publish;
pub mod similar;

pub use error::{DomainError, RepoError};
