//! Admin authentication extractor.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the configured admin token.
///
/// Use this in handlers to require admin access:
/// ```ignore
/// async fn admin_route(_admin: AdminIdentity) -> impl Responder {
///     "welcome"
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity;

/// Constant-time comparison of equal-length tokens.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn authenticate(req: &HttpRequest) -> Result<AdminIdentity, AppError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return Err(AppError::Internal("Server configuration error".to_string()));
    };

    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::Forbidden);
    };

    // Parse "Bearer <token>"
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if tokens_match(token.trim(), expected) {
        Ok(AdminIdentity)
    } else {
        tracing::warn!("Rejected admin request with an invalid token");
        Err(AppError::Unauthorized)
    }
}

impl FromRequest for AdminIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
