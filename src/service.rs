//! The conversion service seam.
//!
//! [`ConversionService`] is the only way the session talks to the outside
//! world. [`HttpConversionService`] speaks the service's HTTP API with
//! reqwest; tests substitute in-process fakes.

use crate::config::ClientConfig;
use crate::error::{ClientError, ServiceError};
use crate::model::{SelectedFile, StatusResponse, SubmitResponse, PDF_MEDIA_TYPE};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// Fixed form fields sent alongside the files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub quality: crate::config::Quality,
    pub include_notes: bool,
}

impl SubmitOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            quality: config.quality,
            include_notes: config.include_notes,
        }
    }
}

/// Submit, status and download endpoints of a conversion service.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Upload every file in one batch.
    ///
    /// A 2xx response is returned as-is, even when its `status` field
    /// reports a failure; the session decides what that means.
    async fn submit(
        &self,
        files: &[SelectedFile],
        options: SubmitOptions,
    ) -> Result<SubmitResponse, ServiceError>;

    /// Query the conversion status of one file.
    async fn status(&self, file_id: &str) -> Result<StatusResponse, ServiceError>;

    /// Where the converted bytes for `file_id` can be fetched.
    fn download_url(&self, file_id: &str) -> String;
}

/// [`ConversionService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    http: Client,
    base: Url,
}

impl HttpConversionService {
    /// Build a client for the service configured in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("HTTP client: {e}")))?;
        Self::with_client(http, &config.base_url)
    }

    /// Reuse an existing reqwest client.
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalised = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalised).map_err(|e| {
            ClientError::InvalidConfig(format!("base URL '{base_url}' is invalid: {e}"))
        })?;
        Ok(Self { http, base })
    }

    /// The underlying reqwest client, for fetching downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Url {
        // `path` is always a relative segment we built ourselves.
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    fn file_endpoint(&self, kind: &str, file_id: &str) -> Url {
        let mut url = self.endpoint(kind);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(file_id);
        }
        url
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn submit(
        &self,
        files: &[SelectedFile],
        options: SubmitOptions,
    ) -> Result<SubmitResponse, ServiceError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.content.clone())
                .file_name(file.name.clone())
                .mime_str(PDF_MEDIA_TYPE)
                .map_err(ServiceError::from)?;
            form = form.part("files", part);
        }
        form = form
            .text("quality", options.quality.as_str())
            .text("includeNotes", options.include_notes.to_string());

        let url = self.endpoint("convert");
        debug!("POST {} ({} files)", url, files.len());
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_error(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn status(&self, file_id: &str) -> Result<StatusResponse, ServiceError> {
        let url = self.file_endpoint("status", file_id);
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        response.json().await.map_err(ServiceError::from)
    }

    fn download_url(&self, file_id: &str) -> String {
        self.file_endpoint("download", file_id).to_string()
    }
}

/// Turn a non-2xx response into [`ServiceError::Http`], keeping the
/// server's `message` when the body carries one.
async fn http_error(response: reqwest::Response) -> ServiceError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));
    ServiceError::Http { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpConversionService {
        HttpConversionService::with_client(Client::new(), base).unwrap()
    }

    #[test]
    fn endpoints_resolve_under_base_path() {
        let svc = service("http://localhost:8000/api");
        assert_eq!(svc.endpoint("convert").as_str(), "http://localhost:8000/api/convert");
        assert_eq!(
            svc.file_endpoint("status", "abc").as_str(),
            "http://localhost:8000/api/status/abc"
        );
        assert_eq!(svc.download_url("abc"), "http://localhost:8000/api/download/abc");
    }

    #[test]
    fn trailing_slash_is_harmless() {
        let svc = service("http://localhost:8000/api/");
        assert_eq!(svc.download_url("x1"), "http://localhost:8000/api/download/x1");
    }

    #[test]
    fn file_id_is_percent_encoded() {
        let svc = service("http://localhost:8000");
        assert_eq!(
            svc.download_url("a b/c"),
            "http://localhost:8000/download/a%20b%2Fc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpConversionService::with_client(Client::new(), "::nope").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }

    #[test]
    fn submit_options_follow_config() {
        let config = ClientConfig::builder()
            .quality(crate::config::Quality::Low)
            .include_notes(true)
            .build()
            .unwrap();
        let opts = SubmitOptions::from_config(&config);
        assert_eq!(opts.quality.as_str(), "low");
        assert!(opts.include_notes);
    }
}
