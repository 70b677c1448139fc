use std::sync::Arc;

use time::Duration;

use crate::config::{AppConfig, JwtConfig, SmtpConfig};
use crate::mailer::{Mailer, MockMailer, SmtpMailer};
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;
use crate::store::{EventStore, RevokedTokenStore, UserStore};

/// Shared request state. Every collaborator is injected explicitly and
/// lives for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub revoked: Arc<dyn RevokedTokenStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        // The revocation list lives exactly as long as a session token.
        let revoked_ttl = Duration::minutes(config.jwt.session_ttl_minutes);
        let store = Arc::new(PgStore::connect(&config.database_url, revoked_ttl).await?);

        if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
            tracing::warn!(error = %e, "migrations failed to run; continuing");
        }

        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);
        Ok(Self {
            users: store.clone(),
            events: store.clone(),
            revoked: store,
            mailer,
            config,
        })
    }

    /// In-memory variant for tests and local experimentation: the same
    /// state shape, but nothing leaves the process. Returns the concrete
    /// store and mailer handles so tests can inspect and manipulate them.
    pub fn in_memory() -> (Self, Arc<MemoryStore>, Arc<MockMailer>) {
        let config = Arc::new(AppConfig {
            database_url: "postgres://localhost/unused".into(),
            public_url: "http://localhost:8080".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                session_ttl_minutes: 60,
                email_token_ttl_minutes: 60,
            },
            smtp: SmtpConfig {
                host: "localhost".into(),
                port: 2525,
                username: None,
                password: None,
                from: "Gatherly <no-reply@test.local>".into(),
            },
        });
        let store = Arc::new(MemoryStore::new(Duration::minutes(
            config.jwt.session_ttl_minutes,
        )));
        let mailer = Arc::new(MockMailer::default());
        let state = Self {
            users: store.clone(),
            events: store.clone(),
            revoked: store.clone(),
            mailer: mailer.clone(),
            config,
        };
        (state, store, mailer)
    }
}
