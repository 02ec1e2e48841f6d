// Credential resolution. The tool piggybacks on gcloud's Application Default
// Credentials so users authenticate once with
// `gcloud auth application-default login`.

use reqwest::blocking::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No valid credentials found. Run 'gcloud auth application-default login' first.")]
    NoCredentials,

    #[error("Failed to read credentials file '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Credentials file '{}' is not valid: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "Unsupported credential type '{0}'. Run 'gcloud auth application-default login' first."
    )]
    UnsupportedType(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// How requests to Drive identify themselves.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth2 bearer token.
    Bearer(String),
    /// API key; only reaches publicly shared files.
    ApiKey(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(..)"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
        }
    }
}

/// Only the fields of an ADC file we act on.
#[derive(Deserialize, Debug)]
struct AdcFile {
    #[serde(rename = "type")]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

/// Resolve credentials with write access to Drive.
pub fn authenticate(client: &Client) -> Result<Credentials, AuthError> {
    if let Some(token) = non_empty_env("GDVC_ACCESS_TOKEN") {
        tracing::debug!("using access token from GDVC_ACCESS_TOKEN");
        return Ok(Credentials::Bearer(token));
    }

    let path = adc_path().ok_or(AuthError::NoCredentials)?;
    if !path.exists() {
        return Err(AuthError::NoCredentials);
    }
    tracing::debug!("using application default credentials at {}", path.display());
    let adc = read_adc(&path)?;
    refresh_access_token(client, &adc).map(Credentials::Bearer)
}

/// Like [`authenticate`], but falls back to `GDVC_API_KEY` for reading
/// public folders without an account.
pub fn authenticate_read_only(client: &Client) -> Result<Credentials, AuthError> {
    match authenticate(client) {
        Ok(creds) => Ok(creds),
        Err(AuthError::NoCredentials) => match non_empty_env("GDVC_API_KEY") {
            Some(key) => {
                tracing::debug!("no OAuth credentials; using GDVC_API_KEY");
                Ok(Credentials::ApiKey(key))
            }
            None => Err(AuthError::NoCredentials),
        },
        Err(e) => Err(e),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `GOOGLE_APPLICATION_CREDENTIALS`, else where gcloud writes ADC.
fn adc_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_env("GOOGLE_APPLICATION_CREDENTIALS") {
        return Some(PathBuf::from(path));
    }
    gcloud_config_dir().map(|d| d.join("application_default_credentials.json"))
}

#[cfg(windows)]
fn gcloud_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gcloud"))
}

#[cfg(not(windows))]
fn gcloud_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".config").join("gcloud"))
}

fn read_adc(path: &Path) -> Result<AdcFile, AuthError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AuthError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| AuthError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Exchange an `authorized_user` refresh token for an access token.
fn refresh_access_token(client: &Client, adc: &AdcFile) -> Result<String, AuthError> {
    if adc.kind != "authorized_user" {
        return Err(AuthError::UnsupportedType(adc.kind.clone()));
    }
    let (Some(client_id), Some(client_secret), Some(refresh_token)) =
        (&adc.client_id, &adc.client_secret, &adc.refresh_token)
    else {
        return Err(AuthError::Refresh(
            "credentials file is missing client_id, client_secret or refresh_token".into(),
        ));
    };

    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("refresh_token", refresh_token.as_str()),
        ("scope", DRIVE_SCOPE),
    ];
    let res = client.post(TOKEN_URL).form(&params).send()?;
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_default();
        return Err(AuthError::Refresh(format!("{} - {}", status, txt)));
    }
    let token: TokenResponse = res.json()?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::Bearer("ya29.secret".into());
        assert_eq!(format!("{:?}", creds), "Bearer(..)");
    }

    #[test]
    fn service_account_credentials_are_rejected() {
        let adc = AdcFile {
            kind: "service_account".into(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
        };
        let err = refresh_access_token(&Client::new(), &adc).unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedType(ref t) if t == "service_account"));
    }

    #[test]
    fn incomplete_authorized_user_is_rejected_before_any_request() {
        let adc = AdcFile {
            kind: "authorized_user".into(),
            client_id: Some("id".into()),
            client_secret: None,
            refresh_token: Some("rt".into()),
        };
        let err = refresh_access_token(&Client::new(), &adc).unwrap_err();
        assert!(matches!(err, AuthError::Refresh(_)));
    }

    #[test]
    fn malformed_credentials_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adc.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_adc(&path), Err(AuthError::Malformed { .. })));
    }
}
