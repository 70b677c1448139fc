use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use super::{EventStore, ProfilePatch, RevokedTokenStore, StoreError, UserStore};
use crate::events::model::Event;
use crate::users::model::User;

/// Mutex-guarded in-memory document store backing the test harness and
/// local development. The revocation map is swept on every access so
/// entries never outlive the session TTL it is constructed with.
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    events: Mutex<Vec<Event>>,
    revoked: Mutex<HashMap<String, OffsetDateTime>>,
    revoked_ttl: Duration,
}

impl MemoryStore {
    pub fn new(revoked_ttl: Duration) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            revoked: Mutex::new(HashMap::new()),
            revoked_ttl,
        }
    }

    fn sweep(map: &mut HashMap<String, OffsetDateTime>, ttl: Duration, now: OffsetDateTime) {
        map.retain(|_, revoked_at| now - *revoked_at < ttl);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        let taken = users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StoreError::Duplicate);
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<User>, StoreError> {
        let email = handle.to_lowercase();
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username == handle || u.email == email)
            .cloned())
    }

    async fn set_verification_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.verification_token = Some(token.to_string());
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn mark_verified(&self, id: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.verified = true;
            user.verification_token = None;
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires_at = Some(expires_at);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn clear_reset_token(&self, id: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.reset_token = None;
            user.reset_token_expires_at = None;
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.password_hash = hash.to_string();
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(bio) = patch.bio {
            user.bio = Some(bio);
        }
        if let Some(picture) = patch.profile_picture {
            user.profile_picture = Some(picture);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: Event) -> Result<Event, StoreError> {
        let mut events = self.events.lock().unwrap();
        let duplicate = events.iter().any(|e| {
            e.name == event.name
                && e.starts_at == event.starts_at
                && e.organizer_id == event.organizer_id
        });
        if duplicate {
            return Err(StoreError::Duplicate);
        }
        events.push(event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().unwrap();
        let mut upcoming: Vec<Event> = events.iter().filter(|e| e.starts_at > now).cloned().collect();
        upcoming.sort_by_key(|e| e.starts_at);
        Ok(upcoming)
    }

    async fn update(&self, event: &Event) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap();
        if let Some(existing) = events.iter_mut().find(|e| e.id == event.id) {
            *existing = event.clone();
        }
        Ok(())
    }

    async fn delete_owned(&self, id: &str, organizer_id: &str) -> Result<bool, StoreError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| !(e.id == id && e.organizer_id == organizer_id));
        Ok(events.len() < before)
    }
}

#[async_trait]
impl RevokedTokenStore for MemoryStore {
    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = self.revoked.lock().unwrap();
        Self::sweep(&mut revoked, self.revoked_ttl, now);
        revoked.entry(token.to_string()).or_insert(now);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = self.revoked.lock().unwrap();
        Self::sweep(&mut revoked, self.revoked_ttl, now);
        Ok(revoked.contains_key(token))
    }
}
