//! Cloud transcription path.
//!
//! The alternate provider: audio is buffered untouched for the whole
//! session, then encoded to WAV and uploaded in one shot on finalize. No
//! thresholds, no background passes, no retries — a failed upload surfaces
//! as an error and the caller decides.

use crate::audio::encode_wav;
use crate::defaults::{CLOUD_ENDPOINT, CLOUD_MODEL};
use crate::error::{Result, VoxnoteError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The remote transcription service, behind a seam so tests never touch the
/// network.
#[async_trait]
pub trait TranscriptionEndpoint: Send + Sync {
    /// Upload a complete WAV file, return the recognized text.
    async fn transcribe(&self, wav: Vec<u8>, model: &str, api_key: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP implementation speaking the multipart upload protocol.
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new() -> Result<Self> {
        Self::with_url(CLOUD_ENDPOINT)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl TranscriptionEndpoint for HttpEndpoint {
    async fn transcribe(&self, wav: Vec<u8>, model: &str, api_key: &str) -> Result<String> {
        let audio_part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoxnoteError::CloudTranscription {
                message: format!("failed to build audio part: {e}"),
            })?;
        let form = Form::new()
            .part("file", audio_part)
            .text("model", model.to_string());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "no error detail".to_string());
            return Err(VoxnoteError::CloudTranscription {
                message: format!("endpoint returned {status}: {detail}"),
            });
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

/// Session buffer feeding the remote endpoint.
pub struct CloudTranscriptionClient {
    chunks: Vec<Vec<f32>>,
    endpoint: Arc<dyn TranscriptionEndpoint>,
}

impl CloudTranscriptionClient {
    pub fn new(endpoint: Arc<dyn TranscriptionEndpoint>) -> Self {
        Self {
            chunks: Vec::new(),
            endpoint,
        }
    }

    /// Buffer a chunk. No threshold check, no work triggered.
    pub fn append_chunk(&mut self, chunk: Vec<f32>) {
        self.chunks.push(chunk);
    }

    /// Total samples buffered so far.
    pub fn buffered_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Encode everything buffered and submit it.
    ///
    /// Returns `Ok(None)` without any network call when nothing was
    /// buffered. The buffer is cleared before the upload, so a failed
    /// submission does not replay the audio.
    pub async fn finalize(&mut self, api_key: &str) -> Result<Option<String>> {
        if self.chunks.is_empty() {
            return Ok(None);
        }
        if api_key.is_empty() {
            return Err(VoxnoteError::MissingCredential);
        }

        let samples: Vec<f32> = std::mem::take(&mut self.chunks).concat();
        debug!(samples = samples.len(), "submitting cloud transcription");

        let wav = encode_wav(&samples)?;
        let text = self.endpoint.transcribe(wav, CLOUD_MODEL, api_key).await?;
        Ok(Some(text))
    }
}
