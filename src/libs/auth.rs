//! Bearer session handling.
//!
//! The access token is a JWT whose payload is decoded locally, without
//! verifying the signature, only to read the `exp` claim. A session counts as
//! authenticated when a decodable token is present and it either carries no
//! expiry or has not expired yet.

use crate::api::{ApiError, ScreenTimeApi};
use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no access token")]
    MissingToken,

    #[error("access token cannot be decoded")]
    Undecodable,

    #[error("no refresh token")]
    MissingRefreshToken,

    #[error("refresh rejected: {0}")]
    RefreshRejected(#[from] ApiError),
}

/// Reads the `exp` claim of a JWT. `Ok(None)` when the token has no expiry.
pub fn decode_expiry(token: &str) -> Result<Option<DateTime<Utc>>, AuthError> {
    let payload = token.split('.').nth(1).ok_or(AuthError::Undecodable)?;
    let payload = payload.trim_end_matches('=');
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| BASE64_STANDARD_NO_PAD.decode(payload))
        .map_err(|_| AuthError::Undecodable)?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| AuthError::Undecodable)?;
    if !claims.is_object() {
        return Err(AuthError::Undecodable);
    }

    match claims.get("exp") {
        None | Some(Value::Null) => Ok(None),
        Some(exp) => {
            let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)).ok_or(AuthError::Undecodable)?;
            DateTime::from_timestamp(secs, 0).map(Some).ok_or(AuthError::Undecodable)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Owns the credential pair. Everything else only asks [`is_authenticated`](Self::is_authenticated).
#[derive(Debug, Clone)]
pub struct AuthSessionManager {
    session: Option<AuthSession>,
    /// Kept even when the access token is unusable, so an expired session can still be refreshed.
    refresh_token: Option<String>,
    refresh_lead: Duration,
}

impl AuthSessionManager {
    pub fn new(refresh_lead_secs: u64) -> Self {
        Self {
            session: None,
            refresh_token: None,
            refresh_lead: Duration::seconds(refresh_lead_secs as i64),
        }
    }

    /// Re-derives the session from a stored token pair.
    pub fn load(&mut self, access_token: Option<String>, refresh_token: Option<String>) -> Result<(), AuthError> {
        self.refresh_token = refresh_token;
        self.session = None;
        let access_token = access_token.ok_or(AuthError::MissingToken)?;
        let expires_at = decode_expiry(&access_token)?;
        self.session = Some(AuthSession {
            access_token,
            refresh_token: self.refresh_token.clone(),
            expires_at,
        });
        Ok(())
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.expires_at.map_or(true, |exp| exp > now))
    }

    /// A token is held but no longer valid, so a refresh is worth trying.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some() && !self.is_authenticated(now)
    }

    /// When the proactive refresh should fire: `refresh_lead` before expiry.
    pub fn refresh_due_at(&self) -> Option<DateTime<Utc>> {
        self.refresh_token.as_ref()?;
        let expires_at = self.session.as_ref()?.expires_at?;
        Some(expires_at - self.refresh_lead)
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// On failure both tokens are dropped and the session is gone; the caller
    /// clears the stored copies and surfaces the expiry.
    pub async fn refresh<A: ScreenTimeApi>(&mut self, api: &A) -> Result<String, AuthError> {
        let Some(refresh_token) = self.refresh_token.clone() else {
            self.clear();
            return Err(AuthError::MissingRefreshToken);
        };

        let result = match api.refresh_token(&refresh_token).await {
            Ok(token) => self.load(Some(token.clone()), Some(refresh_token)).map(|_| token),
            Err(e) => Err(AuthError::from(e)),
        };
        if result.is_err() {
            self.clear();
        }
        result
    }

    pub fn clear(&mut self) {
        self.session = None;
        self.refresh_token = None;
    }
}
