use crate::assertion::{self, Claims};
use crate::credentials::ServiceAccountCredentials;
use base64::prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const OAUTH_TOKEN_URI: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Grant type for exchanging a self-signed JWT, see RFC 7523.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Error, Debug)]
pub enum Error {
    #[error("assertion: {0}")]
    Assertion(#[from] assertion::Error),

    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("token endpoint returned code: {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("code: {0}, body: {1}")]
    Deserialize(u16, String),

    #[error("token endpoint response has no id_token")]
    MissingIdToken,

    #[error("identity token is not a JWT")]
    NotJwt,

    #[error("token was issued for audience {actual}, expected {expected}")]
    AudienceMismatch { expected: String, actual: String },
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// A Google-issued OpenID Connect token, bound to the audience it was
/// requested for.
#[derive(Clone)]
pub struct IdentityToken {
    value: String,
    audience: String,
    signer_email: String,
}

impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToken")
            .field("value", &"[censored]")
            .field("audience", &self.audience)
            .field("signer_email", &self.signer_email)
            .finish()
    }
}

impl IdentityToken {
    pub fn new(
        value: impl Into<String>,
        audience: impl Into<String>,
        signer_email: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            audience: audience.into(),
            signer_email: signer_email.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The audience this token was requested for.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Email of the service account that signed the assertion.
    pub fn signer_email(&self) -> &str {
        &self.signer_email
    }

    /// Decode the JWT payload without verifying the signature.
    /// Returns `None` if the token is not a JWT with a JSON payload.
    pub fn claims(&self) -> Option<Value> {
        let payload = self.value.split('.').nth(1)?;
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice::<Value>(&bytes)
            .ok()
            .filter(Value::is_object)
    }

    /// The unverified claims as pretty-printed JSON.
    pub fn claims_json(&self) -> Result<String, Error> {
        let claims = self.claims().ok_or(Error::NotJwt)?;
        serde_json::to_string_pretty(&claims).map_err(|_| Error::NotJwt)
    }

    fn check_audience(&self) -> Result<(), Error> {
        let Some(claims) = self.claims() else {
            warn!("Identity token is not a decodable JWT, skipping audience check");
            return Ok(());
        };

        let matches = match &claims["aud"] {
            Value::String(aud) => aud == &self.audience,
            Value::Array(auds) => auds.iter().any(|aud| aud == self.audience.as_str()),
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(Error::AudienceMismatch {
                expected: self.audience.clone(),
                actual: claims["aud"].to_string(),
            })
        }
    }
}

/// Get an OpenID Connect token issued by Google for the service account.
///
/// Sends a JWT signed with the service account's private key and carrying a
/// `target_audience` claim to `token_uri`. The endpoint answers with an ID
/// token, signed by Google, whose `aud` claim is `target_audience`.
///
/// Every call performs a fresh exchange.
pub async fn fetch_identity_token(
    client: &reqwest::Client,
    credentials: &ServiceAccountCredentials,
    target_audience: &str,
    token_uri: &str,
) -> Result<IdentityToken, Error> {
    debug!("Exchanging signed assertion for an identity token with audience {target_audience}");

    let jwt = Claims::for_identity_token(
        credentials.email(),
        token_uri,
        target_audience,
        chrono::Utc::now(),
    )
    .sign(credentials.signing_key(), credentials.key_id())?;

    let request = TokenRequest {
        grant_type: JWT_BEARER_GRANT_TYPE,
        assertion: &jwt,
    };

    let resp = client.post(token_uri).form(&request).send().await?;

    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).to_string(),
        });
    }

    let response: TokenResponse = match serde_json::from_slice(&bytes) {
        Ok(response) => response,
        Err(_) => {
            let body = String::from_utf8_lossy(&bytes);
            return Err(Error::Deserialize(status.as_u16(), body.to_string()));
        }
    };

    let token = response
        .id_token
        .filter(|token| !token.is_empty())
        .ok_or(Error::MissingIdToken)?;

    let token = IdentityToken::new(token, target_audience, credentials.email());
    token.check_audience()?;
    Ok(token)
}
