use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub birthdate: Option<String>,
    pub online: bool,
    pub is_admin: bool,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view returned by `GET /api/auth/verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub birthdate: Option<String>,
    pub online: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for UserProfile {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            name: a.name,
            email: a.email,
            avatar: a.avatar,
            bio: a.bio,
            birthdate: a.birthdate,
            online: a.online,
            is_admin: a.is_admin,
            created_at: a.created_at,
        }
    }
}
