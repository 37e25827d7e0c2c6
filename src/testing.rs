//! Shared fixtures for unit tests.

use base64::prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

pub const CLIENT_EMAIL: &str = "iap-caller@gcp-project.iam.gserviceaccount.com";
pub const PRIVATE_KEY_ID: &str = "14a614b2955c";
pub const CLIENT_ID: &str = "657424576728-test.apps.googleusercontent.com";

/// PKCS#8 private key and SPKI public key, both PEM encoded.
/// Generating RSA keys is slow, so every test shares one pair.
pub static KEY_PAIR: LazyLock<(String, String)> = LazyLock::new(|| {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate a key");
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .expect("failed to encode key to PKCS#8 PEM")
        .to_string();
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("failed to encode public key to PEM");
    (private_pem, public_pem)
});

pub fn service_account_json(token_uri: &str) -> Value {
    json!({
        "type": "service_account",
        "project_id": "gcp-project",
        "private_key_id": PRIVATE_KEY_ID,
        "private_key": KEY_PAIR.0.clone(),
        "client_email": CLIENT_EMAIL,
        "client_id": "113914431658237281901",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": token_uri,
    })
}

pub fn key_file(contents: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create key file");
    file.write_all(contents.to_string().as_bytes())
        .expect("failed to write key file");
    file
}

/// An unsigned JWT carrying `claims`, good enough for code that only peeks at
/// the payload.
pub fn unsigned_jwt(claims: &Value) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(json!({"alg": "RS256", "typ": "JWT"}).to_string());
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
