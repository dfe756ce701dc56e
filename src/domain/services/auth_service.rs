use std::sync::Arc;
use crate::domain::{
    models::{
        auth::{Claims, RefreshTokenRecord, TokenPurpose, VerificationToken},
        random_token,
        user::User,
    },
    ports::AuthRepository,
};
use crate::error::AppError;
use crate::config::Config;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{encode, EncodingKey, Header, Algorithm};
use uuid::Uuid;
use chrono::{Utc, Duration};
use sha2::{Sha256, Digest};

pub const AUDIENCE: &str = "eventhub-frontend";
pub const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    config: Config,
    encoding_key: EncodingKey,
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>, config: Config) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_ed_pem(config.jwt_secret_key.as_bytes())
            .map_err(|e| AppError::InternalWithMsg(format!("Invalid JWT private key PEM: {}", e)))?;

        Ok(Self { repo, config, encoding_key })
    }

    pub async fn login(&self, user: &User) -> Result<(String, String, String), AppError> {
        let family_id = Uuid::new_v4();
        self.issue_token_pair(user, family_id, 1).await
    }

    pub async fn refresh(&self, raw_refresh_token: &str, user: &User) -> Result<(String, String, String), AppError> {
        let token_hash = hash_token(raw_refresh_token);

        let record = self.repo.find_refresh_token(&token_hash).await?
            .ok_or(AppError::Unauthorized)?;

        if record.expires_at < Utc::now() {
            self.repo.delete_refresh_token(&token_hash).await?;
            return Err(AppError::Unauthorized);
        }

        self.repo.delete_refresh_token(&token_hash).await?;
        self.issue_token_pair(user, record.family_id, record.generation_id + 1).await
    }

    pub async fn logout(&self, raw_refresh_token: &str) -> Result<(), AppError> {
        self.repo.delete_refresh_token(&hash_token(raw_refresh_token)).await
    }

    /// Ends every session of the user. Access tokens still expire on their own.
    pub async fn revoke_sessions(&self, user_id: &str) -> Result<(), AppError> {
        self.repo.delete_refresh_tokens_for_user(user_id).await
    }

    /// Stores a fresh single-use token and returns the raw value for the email link.
    /// Older tokens of the same purpose stop working.
    pub async fn issue_verification_token(&self, user_id: &str, purpose: TokenPurpose) -> Result<String, AppError> {
        self.repo.delete_verification_tokens(user_id, purpose).await?;

        let raw = random_token(48);
        let now = Utc::now();
        let ttl = match purpose {
            TokenPurpose::VerifyEmail => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::hours(1),
        };

        self.repo.create_verification_token(&VerificationToken {
            token_hash: hash_token(&raw),
            user_id: user_id.to_string(),
            purpose,
            expires_at: now + ttl,
            created_at: now,
        }).await?;

        Ok(raw)
    }

    /// Redeems a token, returning the user it was issued to.
    pub async fn redeem_verification_token(&self, raw_token: &str, purpose: TokenPurpose) -> Result<String, AppError> {
        let token = self.repo.consume_verification_token(&hash_token(raw_token), purpose).await?
            .ok_or_else(|| AppError::Validation("Invalid or already used token".into()))?;

        if token.expires_at < Utc::now() {
            return Err(AppError::Validation("Token has expired".into()));
        }
        Ok(token.user_id)
    }

    async fn issue_token_pair(&self, user: &User, family_id: Uuid, generation_id: i32) -> Result<(String, String, String), AppError> {
        let csrf_token = random_token(32);
        let now = Utc::now();
        let exp = (now + Duration::minutes(15)).timestamp() as usize;

        let claims = Claims {
            iss: self.config.auth_issuer.clone(),
            sub: user.id.clone(),
            aud: AUDIENCE.to_string(),
            exp,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            role: user.role,
            csrf_token: csrf_token.clone(),
        };

        let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("JWT encoding failed: {}", e);
                AppError::Internal
            })?;

        let refresh_token = random_token(64);

        let refresh_record = RefreshTokenRecord {
            token_hash: hash_token(&refresh_token),
            user_id: user.id.clone(),
            family_id,
            generation_id,
            expires_at: now + Duration::days(7),
            created_at: now,
        };

        self.repo.create_refresh_token(&refresh_record).await?;
        Ok((access_token, refresh_token, csrf_token))
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalWithMsg(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|_| AppError::Internal)?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let a = hash_token("abc");
        assert_eq!(a, hash_token("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("abd"));
    }

    #[test]
    fn passwords_round_trip_through_argon2() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(hash_password("short"), Err(AppError::Validation(_))));
    }
}
