//! # Quire Shared
//!
//! Wire types of the admin JSON API: request/response DTOs and the response
//! envelopes. Kept free of server dependencies so admin tooling can reuse them.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
