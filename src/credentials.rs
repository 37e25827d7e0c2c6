use jsonwebtoken::{Algorithm, EncodingKey};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// The key file could not be turned into usable credentials.
/// Nothing has been sent over the network when this is returned.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("deserialize {path}: {err}")]
    Deserialize {
        err: serde_json::Error,
        path: String,
    },

    #[error("{path}: expected credential type service_account, found {found}")]
    UnsupportedType {
        found: String,
        path: String,
    },

    #[error("{path}: field {field} is empty")]
    EmptyField {
        field: &'static str,
        path: String,
    },

    #[error("{path}: private key: {err}")]
    PrivateKey {
        err: jsonwebtoken::errors::Error,
        path: String,
    },
}

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("auth error: {0}")]
    AuthError(#[from] google_cloud_auth::error::Error),

    #[error("auth token error: {0}")]
    AuthTokenError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("credentials file: {0}")]
    CredentialsFile(#[from] serde_json::Error),
}

/// The parts of a service account JSON key file we need.
#[derive(Deserialize, Clone)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub typ: String,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: String,
    /// PEM encoded RSA private key.
    pub private_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("typ", &self.typ)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[censored]")
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// A service account key scoped for cloud platform access, ready to sign
/// assertions.
pub struct ServiceAccountCredentials {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    scopes: Vec<String>,
    /// Key file contents as read by `from_file`; refresh uses the same bytes.
    contents: Vec<u8>,
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("key", &self.key)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountCredentials {
    /// Load and validate a service account key file.
    ///
    /// The private key is parsed here, so a broken key file is reported
    /// before any token endpoint is contacted.
    pub fn from_file(path: impl AsRef<Path>, scopes: &[String]) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        debug!("Loading service account key from {display}");

        let contents = std::fs::read(path).map_err(|err| LoadError::ReadFile {
            err,
            path: display.clone(),
        })?;
        let key: ServiceAccountKey =
            serde_json::from_slice(&contents).map_err(|err| LoadError::Deserialize {
                err,
                path: display.clone(),
            })?;

        if key.typ != SERVICE_ACCOUNT_TYPE {
            return Err(LoadError::UnsupportedType {
                found: key.typ,
                path: display,
            });
        }
        if key.client_email.is_empty() {
            return Err(LoadError::EmptyField {
                field: "client_email",
                path: display,
            });
        }
        if key.private_key.is_empty() {
            return Err(LoadError::EmptyField {
                field: "private_key",
                path: display,
            });
        }

        let signing_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|err| {
                LoadError::PrivateKey {
                    err,
                    path: display.clone(),
                }
            })?;

        // from_rsa_pem only checks the PEM and DER framing; the RSA key
        // itself is first parsed when signing.
        jsonwebtoken::crypto::sign(b"", &signing_key, Algorithm::RS256).map_err(|err| {
            LoadError::PrivateKey {
                err,
                path: display.clone(),
            }
        })?;

        Ok(Self {
            key,
            signing_key,
            scopes: scopes.to_vec(),
            contents,
        })
    }

    /// Obtain an access token for the configured scopes.
    ///
    /// The token itself is thrown away; a successful refresh proves the key is
    /// accepted by its token endpoint before we ask for an identity token.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        use google_cloud_auth::{
            credentials::CredentialsFile, project::Config, token::DefaultTokenSourceProvider,
        };
        use google_cloud_token::TokenSourceProvider as _;

        debug!("Refreshing credentials for {}", self.email());

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let config = Config::default().with_scopes(&scopes);
        let credentials_file: CredentialsFile = serde_json::from_slice(&self.contents)?;
        let tsp =
            DefaultTokenSourceProvider::new_with_credentials(config, Box::new(credentials_file))
                .await?;
        let ts = tsp.token_source();
        ts.token().await?;

        info!("Credentials refreshed for {}", self.email());
        Ok(())
    }

    /// Email address of the service account; used as the assertion issuer.
    pub fn email(&self) -> &str {
        &self.key.client_email
    }

    pub fn key_id(&self) -> &str {
        &self.key.private_key_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}
