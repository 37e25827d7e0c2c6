//! JWT-bearer grant assertions.
//!
//! An assertion is a JWT signed with the service account's own key. When it
//! carries a `target_audience` claim, the OAuth token endpoint answers with an
//! OpenID Connect token for the service account, signed by Google, whose
//! `aud` claim is the `target_audience` value.
//!
//! Reference: [Using OAuth 2.0 for Server to Server Applications](https://developers.google.com/identity/protocols/oauth2/service-account#authorizingrequests)

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Token endpoints reject assertions issued in the future. Back-date `iat`
// so a clock running a few seconds ahead still produces a valid assertion.
pub const CLOCK_SKEW_FUDGE_SECS: i64 = 10;
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum Error {
    #[error("expiration time {exp} must be later than issued time {iat}")]
    Lifetime { iat: i64, exp: i64 },

    #[error("sign assertion: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Claim set of a JWT-bearer grant assertion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims asking `token_uri` for an ID token with audience `target_audience`.
    pub fn for_identity_token(
        email: &str,
        token_uri: &str,
        target_audience: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp() - CLOCK_SKEW_FUDGE_SECS;
        Self {
            iss: email.to_string(),
            aud: token_uri.to_string(),
            target_audience: Some(target_audience.to_string()),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign with RS256. `key_id` ends up as the `kid` header when non-empty.
    pub fn sign(&self, key: &EncodingKey, key_id: &str) -> Result<String, Error> {
        if self.exp <= self.iat {
            return Err(Error::Lifetime {
                iat: self.iat,
                exp: self.exp,
            });
        }

        let mut header = Header::new(Algorithm::RS256);
        if !key_id.is_empty() {
            header.kid = Some(key_id.to_string());
        }
        Ok(jsonwebtoken::encode(&header, self, key)?)
    }
}
