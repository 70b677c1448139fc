use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{config::JwtConfig, state::AppState};

/// What a token is allowed to do. Only session tokens pass the auth
/// extractor; the email-driven purposes are single-flow credentials.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    Session,
    VerifyEmail,
    ResetPassword,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub purpose: TokenPurpose,
}

/// Verification failures are split so callers can answer "expired" and
/// "invalid" differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token expired")]
    Expired,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: Duration,
    email_token_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl TokenKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            session_ttl: Duration::from_secs((config.session_ttl_minutes as u64) * 60),
            email_token_ttl: Duration::from_secs((config.email_token_ttl_minutes as u64) * 60),
        }
    }

    fn issue_with_ttl(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl_secs: i64,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl_secs);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            purpose,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, purpose = ?purpose, "token issued");
        Ok(token)
    }

    pub fn issue(&self, subject: &str, purpose: TokenPurpose) -> anyhow::Result<String> {
        let ttl = match purpose {
            TokenPurpose::Session => self.session_ttl,
            TokenPurpose::VerifyEmail | TokenPurpose::ResetPassword => self.email_token_ttl,
        };
        self.issue_with_ttl(subject, purpose, ttl.as_secs() as i64)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;
        debug!(subject = %data.claims.sub, purpose = ?data.claims.purpose, "token verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> TokenKeys {
        TokenKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            session_ttl_minutes: 60,
            email_token_ttl_minutes: 60,
        })
    }

    #[test]
    fn issue_and_verify_session_token() {
        let keys = make_keys();
        let token = keys
            .issue("0123456789abcdef01234567", TokenPurpose::Session)
            .expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "0123456789abcdef01234567");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.purpose, TokenPurpose::Session);
    }

    #[test]
    fn purposes_round_trip_in_claims() {
        let keys = make_keys();
        for purpose in [TokenPurpose::VerifyEmail, TokenPurpose::ResetPassword] {
            let token = keys.issue("subject", purpose).expect("issue");
            let claims = keys.verify(&token).expect("verify");
            assert_eq!(claims.purpose, purpose);
        }
    }

    #[test]
    fn tampered_token_is_invalid() {
        let keys = make_keys();
        let token = keys.issue("subject", TokenPurpose::Session).expect("issue");
        let mut tampered = token.clone();
        tampered.pop();
        assert_eq!(keys.verify(&tampered).unwrap_err(), TokenError::Invalid);
        assert_eq!(keys.verify("not.a.jwt").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = make_keys();
        // Past the default validation leeway.
        let token = keys
            .issue_with_ttl("subject", TokenPurpose::Session, -120)
            .expect("issue");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let keys = make_keys();
        let other = TokenKeys::from_config(&JwtConfig {
            secret: "another-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            session_ttl_minutes: 60,
            email_token_ttl_minutes: 60,
        });
        let token = keys.issue("subject", TokenPurpose::Session).expect("issue");
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Invalid);
    }
}
