use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, StatusCode},
};
use crate::state::AppState;
use crate::domain::models::user::User;
use super::auth::decode_claims;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::debug;

/// Like `AuthUser`, but anonymous visitors (or stale tokens) pass through as `None`.
pub struct MaybeAuthUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let Some(cookies) = parts.extensions.get::<Cookies>() else {
            return Ok(MaybeAuthUser(None));
        };

        let access_token = match cookies.get("access_token") {
            Some(cookie) => cookie.value().to_string(),
            None => return Ok(MaybeAuthUser(None)),
        };

        let Some(claims) = decode_claims(&app_state, &access_token) else {
            debug!("MaybeAuth: invalid or expired token, treating as guest");
            return Ok(MaybeAuthUser(None));
        };

        let user = app_state.user_repo.find_by_id(&claims.sub).await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter(|u| u.is_active);

        Ok(MaybeAuthUser(user))
    }
}
