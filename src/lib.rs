//! Call an Identity-Aware Proxy protected application as a service account.
//!
//! 1. load a service account key ([`credentials`]),
//! 2. sign a JWT-bearer assertion asking for an ID token ([`assertion`]),
//! 3. exchange it for a Google-issued OpenID Connect token ([`token`]),
//! 4. GET the protected URL with that token as bearer credential ([`iap`]).
//!
//! [`flow`] runs these steps in order for a [`config::Config`].

use thiserror::Error;

pub mod assertion;
pub mod config;
pub mod credentials;
pub mod flow;
pub mod iap;
pub mod token;

#[cfg(test)]
mod testing;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] config::Error),

    #[error("load credentials: {0}")]
    CredentialLoad(#[from] credentials::LoadError),

    #[error("refresh credentials: {0}")]
    AuthRefresh(#[from] credentials::RefreshError),

    #[error("token exchange: {0}")]
    TokenExchange(#[from] token::Error),

    #[error(transparent)]
    Iap(#[from] iap::Error),
}
