//! HTTP transport over reqwest

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{AudioSource, HttpReply, Transport, AUDIO_FIELD};
use crate::{Error, Result};

/// Transport backed by a shared reqwest client
///
/// No client-side timeout is configured; a hung call blocks its workflow
/// step until the underlying transport gives up on its own.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn collapse(response: reqwest::Response) -> Result<HttpReply> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply> {
        let response = self.client.post(url).json(body).send().await?;
        Self::collapse(response).await
    }

    async fn post_audio(&self, url: &str, audio: &AudioSource) -> Result<HttpReply> {
        let mut part = Part::bytes(audio.bytes.clone()).file_name(audio.file_name.clone());
        if let Some(media_type) = &audio.media_type {
            part = part
                .mime_str(media_type)
                .map_err(|e| Error::Upload(format!("invalid media type: {}", e)))?;
        }

        let form = Form::new().part(AUDIO_FIELD, part);
        let response = self.client.post(url).multipart(form).send().await?;
        Self::collapse(response).await
    }
}
