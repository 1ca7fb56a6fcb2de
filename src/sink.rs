use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::quiz::submit::{ResultSink, SubmissionRecord};

/// Why a sink could not store a record. Always worth a retry from the
/// player's point of view.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected the record (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bad sink credentials: {0}")]
    Credentials(String),
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

/// Keeps records in process. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSONL file sink
// ---------------------------------------------------------------------------

/// Appends one JSON object per line to a local file.
#[derive(Debug, Clone)]
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonlFileSink {
    fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        debug!("Appended record to {}", self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Google Sheets sink
// ---------------------------------------------------------------------------

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for each signed assertion.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A string that never shows up in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The relevant part of a Google service-account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PEM-encoded RSA key.
    pub private_key: Secret,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Contents of the secrets file for the Sheets sink. Either a service-account
/// key (preferred, tokens are minted and refreshed on demand) or a fixed
/// `access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsCredentials {
    pub spreadsheet_id: String,
    /// A1 range to append after, e.g. `Sheet1`.
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub service_account: Option<ServiceAccountKey>,
    #[serde(default)]
    pub access_token: Option<Secret>,
}

fn default_range() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    SHEETS_API_BASE.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl SheetsCredentials {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read secrets file {}", path.display()))?;
        let creds: SheetsCredentials =
            serde_json::from_str(&raw).context("secrets file is not valid JSON")?;
        if creds.spreadsheet_id.is_empty() {
            anyhow::bail!("secrets file needs a spreadsheet_id");
        }
        let has_token = creds
            .access_token
            .as_ref()
            .is_some_and(|t| !t.expose().is_empty());
        if creds.service_account.is_none() && !has_token {
            anyhow::bail!("secrets file needs service_account or access_token");
        }
        Ok(creds)
    }

    /// `.../spreadsheets/{id}/values/{range}:append?valueInputOption=USER_ENTERED`
    pub fn append_url(&self) -> Result<Url, SinkError> {
        let mut url =
            Url::parse(&self.api_base).map_err(|e| SinkError::Credentials(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SinkError::Credentials(format!("unusable api base: {}", self.api_base)))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}:append", self.range));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        Ok(url)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

enum TokenSource {
    Fixed(Secret),
    ServiceAccount {
        client_email: String,
        token_uri: String,
        signing_key: EncodingKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    fn from_credentials(creds: &SheetsCredentials) -> Result<Self, SinkError> {
        if let Some(key) = &creds.service_account {
            let signing_key = EncodingKey::from_rsa_pem(key.private_key.expose().as_bytes())
                .map_err(|e| SinkError::Credentials(format!("bad service-account key: {e}")))?;
            return Ok(TokenSource::ServiceAccount {
                client_email: key.client_email.clone(),
                token_uri: key.token_uri.clone(),
                signing_key,
                cached: Mutex::new(None),
            });
        }
        match &creds.access_token {
            Some(token) if !token.expose().is_empty() => Ok(TokenSource::Fixed(token.clone())),
            _ => Err(SinkError::Credentials(
                "no service_account or access_token configured".into(),
            )),
        }
    }

    /// Current bearer token, exchanging a fresh signed assertion when the
    /// cached one is missing or about to expire.
    fn bearer(&self, client: &Client) -> Result<String, SinkError> {
        let (client_email, token_uri, signing_key, cached) = match self {
            TokenSource::Fixed(token) => return Ok(token.expose().to_string()),
            TokenSource::ServiceAccount {
                client_email,
                token_uri,
                signing_key,
                cached,
            } => (client_email, token_uri, signing_key, cached),
        };

        let mut cached = cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: client_email,
            scope: SHEETS_SCOPES,
            aud: token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, signing_key)
            .map_err(|e| SinkError::Credentials(format!("failed to sign token request: {e}")))?;

        let response = client
            .post(token_uri.as_str())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SinkError::Credentials(format!(
                "token exchange failed (status {status}): {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|e| SinkError::Credentials(format!("unreadable token response: {e}")))?;

        debug!("New Sheets access token for {client_email}, valid {}s", token.expires_in);
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    fn invalidate(&self) {
        if let TokenSource::ServiceAccount { cached, .. } = self {
            *cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        }
    }
}

/// Appends each record as a spreadsheet row through the Sheets REST API.
pub struct SheetsSink {
    client: Client,
    url: Url,
    tokens: TokenSource,
}

impl SheetsSink {
    pub fn new(creds: SheetsCredentials, timeout: Duration) -> anyhow::Result<Self> {
        let url = creds.append_url()?;
        let tokens = TokenSource::from_credentials(&creds)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        info!("Sheets sink ready (spreadsheet {})", creds.spreadsheet_id);
        Ok(Self {
            client,
            url,
            tokens,
        })
    }
}

impl ResultSink for SheetsSink {
    fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        let token = self.tokens.bearer(&self.client)?;
        let body = json!({ "values": [record.as_row()] });
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(token)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate();
            }
            let body = response.text().unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Sheets append ok ({status})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(nickname: &str) -> SubmissionRecord {
        SubmissionRecord {
            timestamp: "2025-11-03 12:30:05".into(),
            nickname: nickname.into(),
            password: "pw".into(),
            result_title: "Positive".into(),
        }
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlFileSink::new(dir.path().join("results.jsonl"));

        sink.append(&record("mika")).unwrap();
        sink.append(&record("ren")).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["nickname"], "mika");
        assert_eq!(lines[1]["nickname"], "ren");
        assert_eq!(lines[1]["result_title"], "Positive");
    }

    #[test]
    fn jsonl_sink_surfaces_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlFileSink::new(dir.path().join("missing").join("results.jsonl"));
        assert!(matches!(sink.append(&record("mika")), Err(SinkError::Io(_))));
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.append(&record("a")).unwrap();
        sink.append(&record("b")).unwrap();
        let names: Vec<String> = sink.records().into_iter().map(|r| r.nickname).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn sheets_credentials_build_append_url() {
        let creds: SheetsCredentials =
            serde_json::from_str(r#"{"spreadsheet_id": "abc123", "access_token": "t"}"#).unwrap();
        assert_eq!(
            creds.append_url().unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Sheet1:append?valueInputOption=USER_ENTERED"
        );
    }

    #[test]
    fn sheets_credentials_require_a_token_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"spreadsheet_id": "abc", "access_token": ""}"#).unwrap();
        assert!(SheetsCredentials::from_file(&path).is_err());
    }

    #[test]
    fn bad_service_account_key_is_a_credentials_error() {
        let creds: SheetsCredentials = serde_json::from_str(
            r#"{
                "spreadsheet_id": "abc",
                "service_account": {"client_email": "quiz@example.iam", "private_key": "not a pem"}
            }"#,
        )
        .unwrap();
        assert!(matches!(
            TokenSource::from_credentials(&creds),
            Err(SinkError::Credentials(_))
        ));
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let creds: SheetsCredentials = serde_json::from_str(
            r#"{"spreadsheet_id": "abc", "access_token": "ya29.very-secret"}"#,
        )
        .unwrap();
        assert!(!format!("{creds:?}").contains("very-secret"));
    }
}
