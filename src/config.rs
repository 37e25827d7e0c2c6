use crate::credentials::CLOUD_PLATFORM_SCOPE;
use crate::token::OAUTH_TOKEN_URI;
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("../default.toml");

/// Name of the configuration file picked up from the working directory
/// when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "iap-request.toml";

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("invalid url {url}: {err}")]
    InvalidUrl {
        url: String,
        err: url::ParseError,
    },
}

/// An iap-request.toml file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct File {
    pub description: Option<String>,
    #[serde(default = "Default::default")]
    pub credentials: Credentials,
    #[serde(default = "Default::default")]
    pub iap: Iap,
    #[serde(default = "Default::default")]
    pub oauth: OAuth,
}

impl Default for File {
    fn default() -> Self {
        // The default config is compiled into the program, so
        // make sure to test default() to catch panics compile-time.
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }
}

impl File {
    /// Read a user configuration file and fill in anything it leaves out
    /// from the built-in defaults.
    pub fn default_with_user_config_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::ReadFile {
            err,
            path: path.to_string(),
        })?;
        let user: File = toml::from_str(&contents)?;
        Ok(user.or(File::default()))
    }

    fn or(self, fallback: File) -> File {
        File {
            description: self.description.or(fallback.description),
            credentials: Credentials {
                key_file: self.credentials.key_file.or(fallback.credentials.key_file),
            },
            iap: Iap {
                hostname: self.iap.hostname.or(fallback.iap.hostname),
                client_id: self.iap.client_id.or(fallback.iap.client_id),
                project_id: self.iap.project_id.or(fallback.iap.project_id),
                project_number: self.iap.project_number.or(fallback.iap.project_number),
                url: self.iap.url.or(fallback.iap.url),
            },
            // Missing oauth keys are already defaulted during deserialization.
            oauth: self.oauth,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Credentials {
    /// Path to a service account JSON key file.
    pub key_file: Option<String>,
}

/// The IAP-protected application.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Iap {
    pub hostname: Option<String>,
    /// OAuth client ID of the IAP resource; used as the token audience.
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub project_number: Option<String>,
    /// Full target URL. Takes precedence over `hostname`.
    pub url: Option<String>,
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct OAuth {
    #[serde_inline_default(OAUTH_TOKEN_URI.to_string())]
    pub token_uri: String,
    #[serde_inline_default(vec![CLOUD_PLATFORM_SCOPE.to_string()])]
    pub scopes: Vec<String>,
}

impl Default for OAuth {
    fn default() -> Self {
        Self {
            token_uri: OAUTH_TOKEN_URI.to_string(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
        }
    }
}

/// Values given on the command line. Anything set here wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub key_file: Option<String>,
    pub hostname: Option<String>,
    pub client_id: Option<String>,
    pub url: Option<String>,
    pub token_uri: Option<String>,
}

/// Validated settings for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub key_file: PathBuf,
    pub url: Url,
    pub client_id: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
    pub project_id: Option<String>,
    pub project_number: Option<String>,
}

impl Config {
    pub fn new(file: &File, overrides: Overrides) -> Result<Self, Error> {
        let key_file = overrides
            .key_file
            .or_else(|| file.credentials.key_file.clone())
            .ok_or(Error::Missing("service account key file"))?;

        let client_id = overrides
            .client_id
            .or_else(|| file.iap.client_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or(Error::Missing("IAP client id"))?;

        let url = match overrides.url.or_else(|| file.iap.url.clone()) {
            Some(url) => url,
            None => {
                let hostname = overrides
                    .hostname
                    .or_else(|| file.iap.hostname.clone())
                    .ok_or(Error::Missing("IAP hostname or url"))?;
                format!("https://{hostname}/")
            }
        };
        let url = Url::parse(&url).map_err(|err| Error::InvalidUrl { url, err })?;

        Ok(Self {
            key_file: key_file.into(),
            url,
            client_id,
            token_uri: overrides.token_uri.unwrap_or_else(|| file.oauth.token_uri.clone()),
            scopes: file.oauth.scopes.clone(),
            project_id: file.iap.project_id.clone(),
            project_number: file.iap.project_number.clone(),
        })
    }

    /// Human readable name of the project hosting the IAP resource, falling
    /// back to the key file's project when none is configured.
    pub fn project(&self, key_project_id: Option<&str>) -> Option<String> {
        let project_id = self.project_id.as_deref().or(key_project_id);
        match (project_id, &self.project_number) {
            (Some(id), Some(number)) => Some(format!("{id} ({number})")),
            (Some(id), None) => Some(id.to_string()),
            (None, Some(number)) => Some(number.clone()),
            (None, None) => None,
        }
    }
}
