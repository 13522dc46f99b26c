use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::TokenStatus;
use crate::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// Authentication middleware
/// Validates the session cookie and stores the user in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let username = match state.codec.validate(&token) {
        TokenStatus::Valid { username } => username,
        TokenStatus::Expired => {
            tracing::debug!("Session token expired");
            return Err(AppError::Unauthorized);
        }
        TokenStatus::Invalid => return Err(AppError::Unauthorized),
    };

    request.extensions_mut().insert(CurrentUser { username });

    Ok(next.run(request).await)
}
