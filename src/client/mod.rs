//! Resume-token client for the remote workflow engine
//!
//! The engine exposes the whole workflow through a single evolving
//! continuation URL: the start call returns the first resume URL, and
//! every later step POSTs to whichever URL the server issued last. Four
//! operations, strictly sequential, one workflow in flight at a time.
//!
//! Transport is a seam: the client speaks [`Transport`], the binary wires
//! in [`HttpTransport`], tests script replies in memory.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::record::ExtractedRecord;
use crate::{Error, Result};

/// Status sentinel the engine reports once the email has gone out
const EMAIL_SENT: &str = "Email Sent";

/// Multipart field name carrying the audio bytes
pub(crate) const AUDIO_FIELD: &str = "audio";

/// Opaque continuation pointer issued by the workflow engine
///
/// Doubles as the target URL and the authorization for the next call.
/// Only the latest token is valid; a successful call may issue a
/// replacement that supersedes it, and no history is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The URL the next call must POST to
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audio file picked for upload
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// File name as picked, extension included
    pub file_name: String,
    /// Declared media type, when one is known
    pub media_type: Option<String>,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl AudioSource {
    pub fn new(file_name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes,
        }
    }

    /// Read a file from disk, deriving the media type from the extension
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let media_type = match path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("wav") => Some("audio/wav".to_string()),
            Some("mp3") => Some("audio/mpeg".to_string()),
            _ => None,
        };

        Ok(Self::new(file_name, media_type, bytes))
    }

    /// Whether the file plausibly holds audio
    ///
    /// Accepted iff the declared media type is `audio/…` or the name ends
    /// in `.wav`/`.mp3` (case-insensitive). Checked before any network
    /// call; a rejected file never leaves the machine.
    pub fn is_audio(&self) -> bool {
        if let Some(media_type) = &self.media_type {
            if media_type.starts_with("audio/") {
                return true;
            }
        }
        let name = self.file_name.to_lowercase();
        name.ends_with(".wav") || name.ends_with(".mp3")
    }

    /// File size in megabytes, for display
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }
}

/// Collapsed HTTP response: status plus body text
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Low-level POST seam in front of the workflow engine
///
/// Implementations return `Ok` for any reply the server produced, success
/// or not; `Err` is reserved for transport failure (connect, read, TLS).
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply>;

    /// POST an audio file as multipart form data
    async fn post_audio(&self, url: &str, audio: &AudioSource) -> Result<HttpReply>;
}

#[derive(Debug, Deserialize)]
struct BeginReply {
    #[serde(rename = "resumeUrl")]
    resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractionReply {
    #[serde(rename = "resumeUrl")]
    resume_url: Option<String>,
    #[serde(flatten)]
    record: ExtractedRecord,
}

#[derive(Debug, Deserialize)]
struct GenerationReply {
    #[serde(rename = "resumeUrl")]
    resume_url: Option<String>,
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendReply {
    status: Option<String>,
}

/// Typed client for the four workflow operations
///
/// Every failure (transport, non-success status, malformed body) is
/// collapsed into the failing operation's error kind with a readable
/// message; callers never see a half-advanced step.
pub struct ResumeClient {
    transport: Box<dyn Transport>,
    start_url: String,
}

impl ResumeClient {
    pub fn new(transport: Box<dyn Transport>, start_url: impl Into<String>) -> Self {
        Self {
            transport,
            start_url: start_url.into(),
        }
    }

    /// Send the start signal to the fixed workflow endpoint
    pub async fn begin(&self) -> Result<ResumeToken> {
        debug!("Starting workflow at {}", self.start_url);

        let reply = self
            .transport
            .post_json(&self.start_url, &json!({ "action": "start" }))
            .await
            .map_err(|e| Error::Start(e.to_string()))?;

        if !reply.is_success() {
            return Err(Error::Start(format!(
                "workflow endpoint returned status {}",
                reply.status
            )));
        }

        let body: BeginReply = serde_json::from_str(&reply.body)
            .map_err(|e| Error::Start(format!("malformed start response: {}", e)))?;

        body.resume_url
            .map(ResumeToken::new)
            .ok_or_else(|| Error::Start("start response carried no resume URL".to_string()))
    }

    /// Upload the recording; on success the extraction comes back whole
    ///
    /// Replaces `token` in place when the reply issues a new resume URL.
    pub async fn submit_audio(
        &self,
        token: &mut ResumeToken,
        audio: &AudioSource,
    ) -> Result<ExtractedRecord> {
        if !audio.is_audio() {
            return Err(Error::Upload(format!(
                "{} is not an audio file",
                audio.file_name
            )));
        }

        debug!(
            "Uploading {} ({:.2} MB) to {}",
            audio.file_name,
            audio.size_mb(),
            token
        );

        let reply = self
            .transport
            .post_audio(token.url(), audio)
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        if !reply.is_success() {
            return Err(Error::Upload(format!(
                "upload returned status {}",
                reply.status
            )));
        }

        let body: ExtractionReply = serde_json::from_str(&reply.body)
            .map_err(|e| Error::Upload(format!("malformed extraction response: {}", e)))?;

        if let Some(next) = body.resume_url {
            *token = ResumeToken::new(next);
        }

        Ok(body.record)
    }

    /// Post the reviewed record; the engine renders the offer letter
    ///
    /// Replaces `token` in place when the reply issues a new resume URL.
    pub async fn submit_record(
        &self,
        token: &mut ResumeToken,
        record: &ExtractedRecord,
    ) -> Result<String> {
        let payload = serde_json::to_value(record)
            .map_err(|e| Error::Generation(e.to_string()))?;

        debug!("Submitting reviewed record to {}", token);

        let reply = self
            .transport
            .post_json(token.url(), &payload)
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !reply.is_success() {
            return Err(Error::Generation(format!(
                "generation returned status {}",
                reply.status
            )));
        }

        let body: GenerationReply = serde_json::from_str(&reply.body)
            .map_err(|e| Error::Generation(format!("malformed generation response: {}", e)))?;

        if let Some(next) = body.resume_url {
            *token = ResumeToken::new(next);
        }

        body.html
            .ok_or_else(|| Error::Generation("generation response carried no document".to_string()))
    }

    /// Approve the send; true only on the engine's "Email Sent" sentinel
    ///
    /// A reply with any other status string, or a non-success HTTP
    /// status, is a refusal (`Ok(false)`), not a hard error. `Err` means
    /// the transport itself failed.
    pub async fn confirm_send(&self, token: &ResumeToken) -> Result<bool> {
        debug!("Approving send at {}", token);

        let reply = self
            .transport
            .post_json(token.url(), &json!({ "user_response": "Approve" }))
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        if !reply.is_success() {
            warn!("Send approval returned status {}", reply.status);
            return Ok(false);
        }

        let body: SendReply = serde_json::from_str(&reply.body)
            .map_err(|e| Error::Send(format!("malformed send response: {}", e)))?;

        match body.status.as_deref() {
            Some(EMAIL_SENT) => Ok(true),
            other => {
                warn!("Send approval reported status {:?}", other);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by client and session tests

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{AudioSource, HttpReply, Transport};
    use crate::{Error, Result};

    /// Transport that pops scripted replies and counts calls
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpReply>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Result<HttpReply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
            self.calls.clone()
        }

        fn pop(&self) -> Result<HttpReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<HttpReply> {
            self.pop()
        }

        async fn post_audio(&self, _url: &str, _audio: &AudioSource) -> Result<HttpReply> {
            self.pop()
        }
    }

    pub(crate) fn ok(body: &str) -> Result<HttpReply> {
        Ok(HttpReply {
            status: 200,
            body: body.to_string(),
        })
    }

    pub(crate) fn status(code: u16) -> Result<HttpReply> {
        Ok(HttpReply {
            status: code,
            body: String::new(),
        })
    }

    pub(crate) fn down() -> Result<HttpReply> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    pub(crate) fn wav() -> AudioSource {
        AudioSource::new("meeting.wav", Some("audio/wav".to_string()), vec![0u8; 16])
    }

    pub(crate) fn extraction_body() -> String {
        serde_json::json!({
            "customerData": { "customer_name": "Ada Obi" },
            "loanData": {},
            "feesData": {},
            "bankData": {},
            "verificationData": {}
        })
        .to_string()
    }
}
