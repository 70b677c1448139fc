pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::events::model::Event;
use crate::users::model::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate record")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Optional profile fields applied as a single-document update.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Persisted user records with their lifecycle tokens.
///
/// Every mutation is a single-document write; callers hash passwords
/// before anything reaches the store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when username or email is taken.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Matches on username as given or on the case-normalized email.
    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<User>, StoreError>;

    async fn set_verification_token(&self, id: &str, token: &str) -> Result<(), StoreError>;

    /// Flip the verified flag and clear the stored verification token.
    async fn mark_verified(&self, id: &str) -> Result<(), StoreError>;

    async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    async fn clear_reset_token(&self, id: &str) -> Result<(), StoreError>;

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), StoreError>;

    async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when (name, starts_at, organizer)
    /// already exists.
    async fn insert(&self, event: Event) -> Result<Event, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError>;

    /// Events strictly after `now`, soonest first.
    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, StoreError>;

    async fn update(&self, event: &Event) -> Result<(), StoreError>;

    /// Returns false when the event does not exist or belongs to someone else.
    async fn delete_owned(&self, id: &str, organizer_id: &str) -> Result<bool, StoreError>;
}

/// Deny-list of session tokens invalidated before their natural expiry.
/// Entries older than the session TTL are swept on the same cadence as
/// the checks, so the list never outlives the tokens it guards.
#[async_trait]
pub trait RevokedTokenStore: Send + Sync {
    /// Idempotent: revoking an already-revoked token is not an error.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError>;
}
