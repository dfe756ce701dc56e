use axum::{extract::State, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::{
    requests::{EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, TokenRequest},
    responses::MessageResponse,
};
use crate::domain::models::{
    auth::{AuthResponse, TokenPurpose, UserProfile},
    job::{self, Job},
    user::{normalize_email, User},
};
use crate::domain::services::auth_service::{hash_password, hash_token, verify_password};
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::{info, warn};

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }

    let user = User::new(email, name, hash_password(&payload.password)?);
    let created = state.user_repo.create(&user).await?;

    send_verification(&state, &created).await?;
    info!("User signed up: {}", created.id);

    Ok((StatusCode::CREATED, Json(profile_of(&created))))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = state.auth_service.redeem_verification_token(&payload.token, TokenPurpose::VerifyEmail).await?;
    let mut user = state.user_repo.find_by_id(&user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    if !user.email_verified {
        user.email_verified = true;
        user.updated_at = chrono::Utc::now();
        user = state.user_repo.update(&user).await?;
    }

    info!("Email verified for user: {}", user.id);
    Ok(Json(profile_of(&user)))
}

pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = state.user_repo.find_by_email(&normalize_email(&payload.email)).await? {
        if !user.email_verified && user.is_active {
            send_verification(&state, &user).await?;
        }
    }
    Ok(Json(MessageResponse::new("If the account exists and is unverified, a new link has been sent")))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = state.user_repo.find_by_email(&normalize_email(&payload.email)).await? {
        if user.is_active {
            let token = state.auth_service.issue_verification_token(&user.id, TokenPurpose::PasswordReset).await?;
            state.job_repo.create(&Job::with_token(job::PASSWORD_RESET, &user.id, token)).await?;
            info!("Password reset requested for user: {}", user.id);
        }
    }
    Ok(Json(MessageResponse::new("If the account exists, a reset link has been sent")))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash = hash_password(&payload.password)?;
    let user_id = state.auth_service.redeem_verification_token(&payload.token, TokenPurpose::PasswordReset).await?;

    let mut user = state.user_repo.find_by_id(&user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    user.password_hash = password_hash;
    user.updated_at = chrono::Utc::now();
    state.user_repo.update(&user).await?;

    state.auth_service.revoke_sessions(&user.id).await?;
    info!("Password reset for user: {}", user.id);

    Ok(Json(MessageResponse::new("Password updated, please log in again")))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_email(&normalize_email(&payload.email)).await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!("Failed login attempt for user: {}", user.id);
        return Err(AppError::Unauthorized);
    }
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }
    if !user.email_verified {
        return Err(AppError::Forbidden("Email address is not verified".into()));
    }

    let (access_jwt, refresh_token, csrf_token) = state.auth_service.login(&user).await?;

    set_cookies(&cookies, &access_jwt, &refresh_token);

    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse {
        csrf_token,
        user: profile_of(&user),
    }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let refresh_cookie = cookies.get("refresh_token").ok_or(AppError::Unauthorized)?;
    let raw_token = refresh_cookie.value().to_string();

    let record = state.auth_repo.find_refresh_token(&hash_token(&raw_token)).await?
        .ok_or(AppError::Unauthorized)?;

    let user = state.user_repo.find_by_id(&record.user_id).await?
        .filter(|u| u.is_active)
        .ok_or(AppError::Unauthorized)?;

    let (new_access, new_refresh, new_csrf) = state.auth_service.refresh(&raw_token, &user).await?;

    set_cookies(&cookies, &new_access, &new_refresh);

    info!("Token refreshed for user: {}", user.id);

    Ok(Json(AuthResponse {
        csrf_token: new_csrf,
        user: profile_of(&user),
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = cookies.get("refresh_token") {
        let _ = state.auth_service.logout(cookie.value()).await;
    }

    cookies.remove(Cookie::build(("access_token", "")).path("/").into());
    cookies.remove(Cookie::build(("refresh_token", "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::OK)
}

async fn send_verification(state: &AppState, user: &User) -> Result<(), AppError> {
    let token = state.auth_service.issue_verification_token(&user.id, TokenPurpose::VerifyEmail).await?;
    state.job_repo.create(&Job::with_token(job::VERIFY_EMAIL, &user.id, token)).await?;
    Ok(())
}

pub(crate) fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        email_verified: user.email_verified,
    }
}

fn set_cookies(cookies: &Cookies, access: &str, refresh: &str) {
    let mut access_c = Cookie::new("access_token", access.to_string());
    access_c.set_http_only(true);
    access_c.set_secure(true);
    access_c.set_same_site(SameSite::Strict);
    access_c.set_path("/");
    access_c.set_max_age(Duration::minutes(15));
    cookies.add(access_c);

    let mut refresh_c = Cookie::new("refresh_token", refresh.to_string());
    refresh_c.set_http_only(true);
    refresh_c.set_secure(true);
    refresh_c.set_same_site(SameSite::Strict);
    refresh_c.set_path("/");
    refresh_c.set_max_age(Duration::days(7));
    cookies.add(refresh_c);
}
