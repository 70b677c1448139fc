use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::{Duration, OffsetDateTime};

use super::{EventStore, ProfilePatch, RevokedTokenStore, StoreError, UserStore};
use crate::events::model::{Event, Location};
use crate::users::model::User;

/// Postgres-backed document store. Every trait method is a single
/// statement, so writes stay atomic without transactions.
pub struct PgStore {
    pool: PgPool,
    revoked_ttl: Duration,
}

impl PgStore {
    pub async fn connect(database_url: &str, revoked_ttl: Duration) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool, revoked_ttl })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Duplicate,
        _ => StoreError::Backend(e.into()),
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, bio, profile_picture, \
     verified, verification_token, reset_token, reset_token_expires_at, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(user.verified)
        .bind(&user.verification_token)
        .bind(&user.reset_token)
        .bind(user.reset_token_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = LOWER($1)"
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }

    async fn set_verification_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET verification_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn mark_verified(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn clear_reset_token(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                bio = COALESCE($3, bio),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.full_name)
        .bind(patch.bio)
        .bind(patch.profile_picture)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(user)
    }
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    name: String,
    starts_at: OffsetDateTime,
    time_label: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    description: Option<String>,
    max_attendees: Option<i32>,
    organizer_id: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            starts_at: row.starts_at,
            time: row.time_label,
            location: Location {
                address: row.address,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            description: row.description,
            max_attendees: row.max_attendees,
            organizer_id: row.organizer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, name, starts_at, time_label, address, latitude, longitude, \
     description, max_attendees, organizer_id, created_at, updated_at";

#[async_trait]
impl EventStore for PgStore {
    async fn insert(&self, event: Event) -> Result<Event, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events ({EVENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.starts_at)
        .bind(&event.time)
        .bind(&event.location.address)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(&event.description)
        .bind(event.max_attendees)
        .bind(&event.organizer_id)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE starts_at > $1 ORDER BY starts_at ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE events
            SET name = $2, starts_at = $3, time_label = $4, address = $5, latitude = $6,
                longitude = $7, description = $8, max_attendees = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.starts_at)
        .bind(&event.time)
        .bind(&event.location.address)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(&event.description)
        .bind(event.max_attendees)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete_owned(&self, id: &str, organizer_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND organizer_id = $2")
            .bind(id)
            .bind(organizer_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RevokedTokenStore for PgStore {
    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let cutoff = OffsetDateTime::now_utc() - self.revoked_ttl;
        sqlx::query("DELETE FROM revoked_tokens WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        sqlx::query(
            "INSERT INTO revoked_tokens (token, created_at) VALUES ($1, NOW()) \
             ON CONFLICT (token) DO NOTHING",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - self.revoked_ttl;
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM revoked_tokens WHERE token = $1 AND created_at >= $2",
        )
        .bind(token)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(count > 0)
    }
}
