use axum::{
    extract::{rejection::FormRejection, State},
    response::IntoResponse,
    Extension, Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::models::{CurrentUser, LoginRequest, SessionResponse};
use crate::AppState;

/// Login user
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: std::result::Result<Form<LoginRequest>, FormRejection>,
) -> Result<impl IntoResponse> {
    let Form(req) = form.map_err(|e| {
        tracing::debug!("Rejected login form: {}", e);
        AppError::Unauthorized
    })?;

    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let token = state.auth.login(&req.username, &req.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.jwt.cookie_secure)
        .path("/")
        .max_age(Duration::seconds(state.config.jwt.cookie_max_age_secs))
        .build();

    Ok((
        jar.add(cookie),
        [("HX-Redirect", "/")],
        Json(ApiResponse::success(SessionResponse {
            username: req.username.trim().to_string(),
        })),
    ))
}

/// Logout user; the token itself stays valid until it expires
/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.jwt.cookie_secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    (
        jar.add(expired),
        [("HX-Redirect", "/")],
        Json(ApiResponse::<()>::success_message("Logged out successfully")),
    )
}

/// Current session
/// GET /api/auth/status
pub async fn status(
    Extension(current_user): Extension<CurrentUser>,
) -> Json<ApiResponse<SessionResponse>> {
    Json(ApiResponse::success(SessionResponse {
        username: current_user.username,
    }))
}
