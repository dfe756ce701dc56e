use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, StatusCode},
};
use crate::state::AppState;
use crate::domain::models::auth::Claims;
use crate::domain::models::user::User;
use crate::domain::services::auth_service::AUDIENCE;
use std::sync::Arc;
use tower_cookies::Cookies;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use tracing::{warn, Span};

/// Authenticated, active account. The row is re-read on every request so
/// role changes and deactivations apply without waiting for token expiry.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let access_token = cookies.get("access_token")
            .ok_or(StatusCode::UNAUTHORIZED)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        let claims = decode_claims(&app_state, &access_token).ok_or(StatusCode::UNAUTHORIZED)?;

        let method = &parts.method;
        if method != "GET" && method != "HEAD" && method != "OPTIONS" {
            let csrf_header_val = parts.headers.get("X-CSRF-Token")
                .ok_or(StatusCode::FORBIDDEN)?
                .to_str()
                .map_err(|_| StatusCode::FORBIDDEN)?;

            if csrf_header_val != claims.csrf_token {
                return Err(StatusCode::FORBIDDEN);
            }
        }

        let user = app_state.user_repo.find_by_id(&claims.sub).await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if !user.is_active {
            warn!("Rejected request from deactivated account {}", user.id);
            return Err(StatusCode::UNAUTHORIZED);
        }

        Span::current().record("user_id", &user.id);

        Ok(AuthUser(user))
    }
}

pub(crate) fn decode_claims(state: &AppState, token: &str) -> Option<Claims> {
    let decoding_key = DecodingKey::from_ed_pem(state.config.jwt_public_key.as_bytes()).ok()?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_audience(&[AUDIENCE]);
    validation.set_issuer(&[state.config.auth_issuer.as_str()]);

    decode::<Claims>(token, &decoding_key, &validation)
        .ok()
        .map(|data| data.claims)
}
