use sqlx::FromRow;
use time::OffsetDateTime;

use super::dto::PublicUser;

/// User record as persisted. Never serialized directly: responses go
/// through `public()`, which drops the hash and lifecycle tokens.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub verified: bool,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            bio: self.bio.clone(),
            profile_picture: self.profile_picture.clone(),
            verified: self.verified,
            created_at: self.created_at,
        }
    }
}
