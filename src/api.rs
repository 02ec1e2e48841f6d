// API client module: a small blocking HTTP client for the Google Drive v3
// REST API, plus the `Remote` trait the commands are written against so they
// can run against something other than the real service.

use anyhow::{Context, Result};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::LOCATION;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::auth::{self, Credentials};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";
const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const PAGE_SIZE: &str = "1000";

/// Drive API errors.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: credentials missing or expired")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Drive returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DriveError {
    /// Access was refused: either the caller lacks rights or the item is
    /// not shared.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, DriveError::Forbidden(_) | DriveError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::NotFound(_))
    }
}

/// A file or folder as returned by `files.list`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl RemoteItem {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    /// Docs, Sheets and friends have no raw bytes to download.
    pub fn is_google_native(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(GOOGLE_APPS_PREFIX)
    }
}

/// The Drive operations the commands need.
pub trait Remote {
    /// ID of a non-trashed folder called `name` directly under `parent`.
    fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, DriveError>;

    fn create_folder(&self, parent: &str, name: &str) -> Result<String, DriveError>;

    /// Upload the local file at `path` as `name` under `parent`.
    fn upload_file(&self, parent: &str, name: &str, path: &Path) -> Result<String, DriveError>;

    /// Grant `anyone` reader access.
    fn share_publicly(&self, id: &str) -> Result<(), DriveError>;

    /// Non-trashed direct children of `folder`.
    fn list_children(&self, folder: &str) -> Result<Vec<RemoteItem>, DriveError>;

    /// Write the content of file `id` to `dest`, replacing it.
    fn download_file(&self, id: &str, dest: &Path) -> Result<(), DriveError>;
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteItem>,
    next_page_token: Option<String>,
}

/// Blocking Drive v3 client. Holds the reqwest client, the API base URLs
/// and the credentials attached to every call.
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    api_url: String,
    upload_url: String,
    credentials: Credentials,
}

impl DriveClient {
    /// Build a client with the given credentials. Base URLs come from
    /// `GDVC_DRIVE_API_URL` / `GDVC_DRIVE_UPLOAD_URL` when set.
    pub fn new(client: Client, credentials: Credentials) -> Self {
        let api_url =
            std::env::var("GDVC_DRIVE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let upload_url =
            std::env::var("GDVC_DRIVE_UPLOAD_URL").unwrap_or_else(|_| DEFAULT_UPLOAD_URL.into());
        DriveClient {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Authenticate with write access and build a client.
    pub fn connect() -> Result<Self> {
        let client = http_client()?;
        let credentials = auth::authenticate(&client).context("Authentication failed")?;
        Ok(DriveClient::new(client, credentials))
    }

    /// Authenticate for downloads, accepting an API key when no account
    /// credentials exist.
    pub fn connect_read_only() -> Result<Self> {
        let client = http_client()?;
        let credentials = auth::authenticate_read_only(&client).context("Authentication failed")?;
        Ok(DriveClient::new(client, credentials))
    }

    /// Build a request carrying the credentials.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        let req = self.client.request(method, url);
        match &self.credentials {
            Credentials::Bearer(token) => req.bearer_auth(token),
            Credentials::ApiKey(key) => req.query(&[("key", key.as_str())]),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_url)
    }

    fn list(&self, query: &str) -> Result<Vec<RemoteItem>, DriveError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self.request(Method::GET, &self.files_url()).query(&[
                ("q", query),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let page: FileList = check(req.send()?)?.json()?;
            items.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(items)
    }
}

impl Remote for DriveClient {
    fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, DriveError> {
        let query = format!(
            "'{}' in parents and mimeType='{}' and name='{}' and trashed=false",
            escape_query(parent),
            FOLDER_MIME,
            escape_query(name)
        );
        Ok(self.list(&query)?.into_iter().next().map(|item| item.id))
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<String, DriveError> {
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent],
        });
        let res = self
            .request(Method::POST, &self.files_url())
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&metadata)
            .send()?;
        let created: CreatedFile = check(res)?.json()?;
        Ok(created.id)
    }

    fn upload_file(&self, parent: &str, name: &str, path: &Path) -> Result<String, DriveError> {
        let io_err = |source: std::io::Error| DriveError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();

        // Resumable upload: the metadata request opens a session, the file
        // body goes to the session URL in one PUT.
        let metadata = json!({ "name": name, "parents": [parent] });
        let res = self
            .request(Method::POST, &format!("{}/files", self.upload_url))
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("X-Upload-Content-Length", len.to_string())
            .json(&metadata)
            .send()?;
        let res = check(res)?;
        let session = res
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DriveError::Unexpected("upload session has no Location header".into()))?
            .to_string();

        let res = self
            .client
            .put(&session)
            .body(Body::sized(file, len))
            .send()?;
        let created: CreatedFile = check(res)?.json()?;
        Ok(created.id)
    }

    fn share_publicly(&self, id: &str) -> Result<(), DriveError> {
        let permission = json!({ "type": "anyone", "role": "reader" });
        let res = self
            .request(Method::POST, &format!("{}/{}/permissions", self.files_url(), id))
            .query(&[("supportsAllDrives", "true")])
            .json(&permission)
            .send()?;
        check(res)?;
        Ok(())
    }

    fn list_children(&self, folder: &str) -> Result<Vec<RemoteItem>, DriveError> {
        let query = format!("'{}' in parents and trashed=false", escape_query(folder));
        self.list(&query)
    }

    fn download_file(&self, id: &str, dest: &Path) -> Result<(), DriveError> {
        let res = self
            .request(Method::GET, &format!("{}/{}", self.files_url(), id))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()?;
        let mut res = check(res)?;
        let mut out = File::create(dest).map_err(|source| DriveError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        res.copy_to(&mut out)?;
        Ok(())
    }
}

/// The blocking client's default 30s timeout would cut off large uploads.
fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(None::<Duration>)
        .build()
        .context("Failed to build HTTP client")
}

/// Map non-success statuses to [`DriveError`].
fn check(res: Response) -> Result<Response, DriveError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    tracing::debug!("drive error {}: {}", status, body);
    Err(classify(status, body))
}

fn classify(status: StatusCode, body: String) -> DriveError {
    match status {
        StatusCode::UNAUTHORIZED => DriveError::Unauthorized,
        StatusCode::FORBIDDEN => DriveError::Forbidden(body),
        StatusCode::NOT_FOUND => DriveError::NotFound(body),
        _ => DriveError::Status { status, body },
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
