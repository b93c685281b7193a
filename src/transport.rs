//! Multipart upload of a validated media file to the translation service.

use crate::config::Config;
use crate::validation::MediaFile;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bytes handed to the connection per body chunk
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Successful translation, copied verbatim from the service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub session_id: String,
    pub original_text: String,
    pub translated_text: String,
    pub target_language: String,
    pub audio_available: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The service answered with a non-success HTTP status
    #[error("server rejected upload (HTTP {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("translation service unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    #[error("upload timed out")]
    Timeout,

    /// HTTP succeeded but the payload did not report success
    #[error("translation failed: {message}")]
    ApplicationError { message: String },

    #[error("could not read {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

impl UploadError {
    /// Stable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::ServerRejected { .. } => "server_rejected",
            UploadError::NetworkUnreachable { .. } => "network_unreachable",
            UploadError::Timeout => "timeout",
            UploadError::ApplicationError { .. } => "application_error",
            UploadError::Unreadable { .. } => "unreadable",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            UploadError::ServerRejected { message, .. } => message.clone(),
            UploadError::NetworkUnreachable { .. } => {
                "Network error. Please check that the translation service is running.".to_string()
            }
            UploadError::Timeout => {
                "Upload timeout. File might be too large or connection is slow.".to_string()
            }
            UploadError::ApplicationError { message } => message.clone(),
            UploadError::Unreadable { name, .. } => {
                format!("Could not read {}. Please pick the file again.", name)
            }
        }
    }
}

const GENERIC_FAILURE_MESSAGE: &str = "Translation failed. Please try again.";

/// The fields every upload response may carry, success or not.
#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    status: Option<String>,
    error: Option<String>,
}

/// Turns byte counts into a de-duplicated, non-decreasing percentage feed.
pub(crate) struct ProgressTracker<F> {
    total: u64,
    sent: u64,
    last: Option<u8>,
    on_progress: F,
}

impl<F: FnMut(u8)> ProgressTracker<F> {
    pub(crate) fn new(total: u64, on_progress: F) -> Self {
        Self {
            total,
            sent: 0,
            last: None,
            on_progress,
        }
    }

    pub(crate) fn start(&mut self) {
        self.emit(0);
        if self.total == 0 {
            self.emit(100);
        }
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let percent = if self.total == 0 {
            100
        } else {
            (self.sent.saturating_mul(100) / self.total) as u8
        };
        self.emit(percent);
    }

    fn emit(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            (self.on_progress)(percent);
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl UploadTransport {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.endpoint("upload"),
            timeout: config.upload_timeout(),
        }
    }

    /// Upload `file` for translation into `target_language`.
    ///
    /// `on_progress` receives advisory upload percentages (0 to 100). It has
    /// no say in whether the upload succeeds.
    pub async fn submit<F>(
        &self,
        file: &MediaFile,
        target_language: &str,
        on_progress: F,
    ) -> Result<TranslationResult, UploadError>
    where
        F: FnMut(u8) + Send + 'static,
    {
        info!(
            "Uploading {} ({} bytes) for translation to {}",
            file.name(),
            file.byte_size(),
            target_language
        );

        let result = self.send(file, target_language, on_progress).await;
        match &result {
            Ok(translation) => info!(
                "Translation complete (session {}, audio available: {})",
                translation.session_id, translation.audio_available
            ),
            Err(e) => warn!("Upload of {} failed [{}]: {}", file.name(), e.kind(), e),
        }
        result
    }

    async fn send<F>(
        &self,
        file: &MediaFile,
        target_language: &str,
        on_progress: F,
    ) -> Result<TranslationResult, UploadError>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let payload = file
            .read_bytes()
            .await
            .map_err(|e| UploadError::Unreadable {
                name: file.name().to_string(),
                reason: e.to_string(),
            })?;

        let total = payload.len() as u64;
        let chunks: Vec<Bytes> = (0..payload.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| payload.slice(start..(start + UPLOAD_CHUNK_SIZE).min(payload.len())))
            .collect();
        drop(payload);

        let mut tracker = ProgressTracker::new(total, on_progress);
        tracker.start();
        let body_stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            tracker.advance(chunk.len() as u64);
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), total)
            .file_name(file.name().to_string());
        let form = Form::new()
            .part("file", part)
            .text("target_language", target_language.to_string());

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            // The status alone decides the outcome; an unreadable body only loses the message
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &body));
        }

        let body = response.text().await.map_err(classify_request_error)?;
        debug!("Upload response ({}): {} bytes", status, body.len());
        parse_success_body(&body)
    }
}

fn classify_request_error(error: reqwest::Error) -> UploadError {
    if error.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::NetworkUnreachable {
            reason: error.to_string(),
        }
    }
}

fn rejection(status: u16, body: &str) -> UploadError {
    UploadError::ServerRejected {
        status,
        message: error_field(body).unwrap_or_else(|| format!("Server Error: {}", status)),
    }
}

/// Pull the `error` string out of a JSON body, if there is one.
fn error_field(body: &str) -> Option<String> {
    serde_json::from_str::<UploadEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|message| !message.trim().is_empty())
}

/// Interpret the body of a 2xx upload response.
fn parse_success_body(body: &str) -> Result<TranslationResult, UploadError> {
    let envelope: UploadEnvelope =
        serde_json::from_str(body).map_err(|e| UploadError::ApplicationError {
            message: format!("Malformed response from translation service: {}", e),
        })?;

    if envelope.status.as_deref() != Some("success") {
        return Err(UploadError::ApplicationError {
            message: envelope
                .error
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
        });
    }

    serde_json::from_str(body).map_err(|e| UploadError::ApplicationError {
        message: format!("Incomplete response from translation service: {}", e),
    })
}
