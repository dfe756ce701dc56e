use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::UnknownVariant;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Lecturer,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Lecturer => "LECTURER",
            Role::Staff => "STAFF",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "USER" => Ok(Role::User),
            "LECTURER" => Ok(Role::Lecturer),
            "STAFF" => Ok(Role::Staff),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(&email),
            password_hash,
            name,
            role: Role::User,
            is_active: true,
            email_verified: false,
            title: None,
            institution: None,
            department: None,
            bio: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn can_create_events(&self) -> bool {
        matches!(self.role, Role::Lecturer | Role::Staff)
    }

    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => format!("{} {}", title, self.name),
            _ => self.name.clone(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// What other users may see of an account.
#[derive(Debug, Serialize, Clone)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            title: user.title.clone(),
            institution: user.institution.clone(),
            department: user.department.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_users_start_unverified_with_user_role() {
        let user = User::new("  Ada@Uni.EDU ".into(), "Ada".into(), "hash".into());
        assert_eq!(user.email, "ada@uni.edu");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert!(!user.can_create_events());
    }

    #[test]
    fn role_round_trips_through_text_column() {
        for role in [Role::User, Role::Lecturer, Role::Staff] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(Role::try_from("ADMIN".to_string()).is_err());
    }

    #[test]
    fn display_name_prefixes_title() {
        let mut user = User::new("a@b.c".into(), "Grace Hopper".into(), "h".into());
        assert_eq!(user.display_name(), "Grace Hopper");
        user.title = Some("Dr.".into());
        assert_eq!(user.display_name(), "Dr. Grace Hopper");
    }
}
