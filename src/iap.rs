use crate::token::IdentityToken;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("service account {email} does not have permission to access the IAP-protected application")]
    PermissionDenied { email: String },

    #[error("bad response from application: {status} / {headers:?} / {body}")]
    UnexpectedResponse {
        status: u16,
        headers: HeaderMap,
        body: String,
    },

    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Fetch an IAP-protected URL, sending `token` as a bearer credential.
///
/// Only a 200 response counts as success; its body is returned.
/// A single attempt is made.
pub async fn call_protected_url(
    client: &reqwest::Client,
    url: &str,
    token: &IdentityToken,
) -> Result<String, Error> {
    debug!("GET {url}");
    let resp = client.get(url).bearer_auth(token.as_str()).send().await?;

    let status = resp.status();
    debug!("{url} responded with {status}");

    match status {
        StatusCode::OK => Ok(resp.text().await?),
        StatusCode::FORBIDDEN => Err(Error::PermissionDenied {
            email: token.signer_email().to_string(),
        }),
        _ => {
            let headers = resp.headers().clone();
            let body = resp.text().await?;
            Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                headers,
                body,
            })
        }
    }
}
