//! HTTP client for the EPD REST endpoints.
//!
//! Wraps the backend JSON API (authentication, import submission and
//! progress, generic resource CRUD) using [`reqwest`]. Every request
//! carries the bearer token when one is set.

use std::time::Duration;

use epd_core::fields::ImportType;
use epd_core::import_progress::ImportProgress;
use epd_core::mapping::ColumnMapping;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::envelope::{self, DataEnvelope, RawStartImport, StartImportResponse};

/// MIME type sent with uploaded import files.
pub const CSV_MIME_TYPE: &str = "text/csv";

/// HTTP client for one EPD backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Errors from the REST client layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The request payload could not be encoded.
    #[error("Could not encode request: {0}")]
    Encode(String),
}

impl ApiError {
    /// Short message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Request(e) if e.is_timeout() => "The server did not respond in time".to_string(),
            Self::Request(_) => "Could not reach the server".to_string(),
            Self::Status { status, body } => envelope::message_from_body(body)
                .unwrap_or_else(|| format!("The server answered with status {status}")),
            Self::Rejected(msg) => msg.clone(),
            Self::Malformed(_) => "The server sent an unexpected response".to_string(),
            Self::Encode(msg) => msg.clone(),
        }
    }

    /// HTTP status code, if the error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Authenticated user returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: serde_json::Value,
    pub email: String,
    pub role: String,
}

/// Token and user returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginSession {
    pub token: String,
    pub user: AuthUser,
}

impl ApiClient {
    /// Create a client for a backend.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Build a client from configuration, applying the request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let mut api = Self::with_client(client, config.base_url.clone());
        api.token = config.token.clone();
        Ok(api)
    }

    /// Return a copy of this client that authenticates with `token`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- authentication ----

    /// Exchange credentials for a bearer token.
    ///
    /// Sends `POST /api/auth/login`. The token is returned, not stored; use
    /// [`with_token`](Self::with_token) to act as that user.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, ApiError> {
        self.post_json("/api/auth/login", &LoginRequest { email, password })
            .await
    }

    // ---- CSV import ----

    /// Submit a CSV file for server-side import.
    ///
    /// Sends a multipart `POST /api/import/{clients|therapists}` with the
    /// file, the import type and, when non-empty, the column mapping as a
    /// JSON object string.
    pub async fn start_import(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        import_type: ImportType,
        mapping: &ColumnMapping,
    ) -> Result<StartImportResponse, ApiError> {
        let file_part = reqwest::multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(CSV_MIME_TYPE)?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("importType", import_type.as_str());

        if !mapping.is_empty() {
            let json = mapping
                .to_json()
                .map_err(|e| ApiError::Encode(e.to_string()))?;
            form = form.text("columnMapping", json);
        }

        let response = self
            .request(Method::POST, &format!("/api/import/{}", import_type.as_str()))
            .multipart(form)
            .send()
            .await?;

        let raw: RawStartImport = Self::parse_response(response).await?;
        let accepted = raw.into_response()?;

        tracing::info!(
            import_id = %accepted.import_id,
            import_type = %import_type,
            mapped_columns = mapping.len(),
            "Import submitted",
        );

        Ok(accepted)
    }

    /// Fetch the current progress snapshot of an import job.
    ///
    /// Sends `GET /api/import/progress/{import_id}`.
    pub async fn get_import_progress(&self, import_id: &str) -> Result<ImportProgress, ApiError> {
        let response = self
            .request(Method::GET, &format!("/api/import/progress/{import_id}"))
            .send()
            .await?;

        let envelope: DataEnvelope<ImportProgress> = Self::parse_response(response).await?;
        envelope.into_data()
    }

    // ---- generic JSON resources ----

    /// `GET` a path and unwrap the `data` envelope.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        Self::parse_data(response).await
    }

    /// `POST` a JSON body and unwrap the `data` envelope.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::parse_data(response).await
    }

    /// `PUT` a JSON body and unwrap the `data` envelope.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::parse_data(response).await
    }

    /// `DELETE` a path, discarding the body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// `GET` a path and return the status code without interpreting the body.
    pub async fn get_status(&self, path: &str) -> Result<u16, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(response.status().as_u16())
    }

    // ---- private helpers ----

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), body = %body, "Backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        envelope::decode(&body)
    }

    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let envelope: DataEnvelope<T> = Self::parse_response(response).await?;
        envelope.into_data()
    }
}
