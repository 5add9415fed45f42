//! Workflow session state machine
//!
//! One wizard run: `Landing → Uploading → Reviewing → DocumentReady →
//! Confirmed`, no skipping. Each advance wraps exactly one client
//! operation; a failed call records its message and leaves the stage and
//! all stored data untouched. Operations are not reentrant: a second
//! attempt while one is outstanding is rejected at the boundary, never
//! queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::client::{AudioSource, ResumeClient, ResumeToken};
use crate::record::RecordEditor;
use crate::{Error, Result};

/// One named point in the fixed wizard sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing started yet
    Landing,
    /// Workflow started, waiting for the recording
    Uploading,
    /// Extraction received, under user review
    Reviewing,
    /// Letter generated (or generating, while a call is in flight)
    DocumentReady,
    /// Email confirmed sent
    Confirmed,
}

impl Stage {
    /// All stages in wizard order
    pub const ALL: [Stage; 5] = [
        Stage::Landing,
        Stage::Uploading,
        Stage::Reviewing,
        Stage::DocumentReady,
        Stage::Confirmed,
    ];

    /// Title shown by the progress indicator; `Landing` has no step
    pub fn step_title(&self) -> Option<&'static str> {
        match self {
            Stage::Landing => None,
            Stage::Uploading => Some("Start"),
            Stage::Reviewing => Some("Details"),
            Stage::DocumentReady => Some("Processing"),
            Stage::Confirmed => Some("Results"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Landing => "landing",
            Stage::Uploading => "uploading",
            Stage::Reviewing => "reviewing",
            Stage::DocumentReady => "document",
            Stage::Confirmed => "confirmed",
        };
        write!(f, "{}", name)
    }
}

/// Clears the in-flight flag on every exit path
struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(Error::Busy);
        }
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A single wizard run against the remote workflow engine
///
/// Owns the resume token, the extraction under review, the generated
/// document, and the busy/error flags the presentation layer renders.
/// Everything is discarded by [`WorkflowSession::restart`].
pub struct WorkflowSession {
    client: ResumeClient,
    stage: Stage,
    token: Option<ResumeToken>,
    editor: Option<RecordEditor>,
    document: Option<String>,
    in_flight: Arc<AtomicBool>,
    last_error: Option<String>,
}

impl WorkflowSession {
    pub fn new(client: ResumeClient) -> Self {
        Self {
            client,
            stage: Stage::Landing,
            token: None,
            editor: None,
            document: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_error: None,
        }
    }

    /// Currently active stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Shared busy flag, for the presentation layer
    pub fn in_flight_flag(&self) -> Arc<AtomicBool> {
        self.in_flight.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Message from the most recent failure, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Latest resume token the engine has issued
    pub fn token(&self) -> Option<&ResumeToken> {
        self.token.as_ref()
    }

    /// Editing model; present from `Reviewing` until restart
    pub fn editor(&self) -> Option<&RecordEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut RecordEditor> {
        self.editor.as_mut()
    }

    /// Generated letter HTML; present from `DocumentReady` until restart
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// `Landing → Uploading`: start the workflow and store the token
    pub async fn start(&mut self) -> Result<()> {
        self.expect_stage(Stage::Landing)?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.last_error = None;

        match self.client.begin().await {
            Ok(token) => {
                info!("Workflow started, resume URL issued");
                self.token = Some(token);
                self.stage = Stage::Uploading;
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// `Uploading → Reviewing`: upload the recording, seed the editor
    ///
    /// Non-audio files are rejected before any network call.
    pub async fn upload_audio(&mut self, audio: &AudioSource) -> Result<()> {
        self.expect_stage(Stage::Uploading)?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.last_error = None;

        let token = self
            .token
            .as_mut()
            .ok_or_else(|| Error::Workflow("no resume token held".to_string()))?;

        match self.client.submit_audio(token, audio).await {
            Ok(record) => {
                info!("Extraction received for {}", audio.file_name);
                self.editor = Some(RecordEditor::new(record));
                self.stage = Stage::Reviewing;
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// `Reviewing → DocumentReady`: submit the reviewed record
    ///
    /// Posts the editor's current snapshot; the extraction itself is
    /// never sent and never modified.
    pub async fn generate_document(&mut self) -> Result<()> {
        self.expect_stage(Stage::Reviewing)?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.last_error = None;

        let record = self
            .editor
            .as_ref()
            .ok_or_else(|| Error::Workflow("no record under review".to_string()))?
            .commit();
        let token = self
            .token
            .as_mut()
            .ok_or_else(|| Error::Workflow("no resume token held".to_string()))?;

        match self.client.submit_record(token, &record).await {
            Ok(html) => {
                info!("Offer letter generated ({} bytes)", html.len());
                self.document = Some(html);
                self.stage = Stage::DocumentReady;
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// `DocumentReady → Confirmed` when the engine confirms the send
    ///
    /// Returns `Ok(false)` and stays put when the engine refuses; `Err`
    /// only when the transport itself failed.
    pub async fn approve_send(&mut self) -> Result<bool> {
        self.expect_stage(Stage::DocumentReady)?;
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.last_error = None;

        let token = self
            .token
            .as_ref()
            .ok_or_else(|| Error::Workflow("no resume token held".to_string()))?;

        match self.client.confirm_send(token).await {
            Ok(true) => {
                info!("Email send confirmed");
                self.stage = Stage::Confirmed;
                Ok(true)
            }
            Ok(false) => {
                warn!("Engine did not confirm the send");
                self.last_error =
                    Some("The workflow engine did not confirm the email send".to_string());
                Ok(false)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Discard the session unconditionally and return to `Landing`
    ///
    /// Token, extraction, edits, and document are all dropped; callable
    /// from any stage.
    pub fn restart(&mut self) {
        info!("Restarting wizard");
        self.stage = Stage::Landing;
        self.token = None;
        self.editor = None;
        self.document = None;
        self.last_error = None;
    }

    fn expect_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(Error::Workflow(format!(
                "operation requires stage {}, currently at {}",
                expected, self.stage
            )));
        }
        Ok(())
    }

    fn record_failure(&mut self, e: Error) -> Error {
        error!("{}", e);
        self.last_error = Some(e.to_string());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::*;
    use crate::client::{HttpReply, ResumeClient};
    use crate::record::FieldKey;

    fn session(replies: Vec<Result<HttpReply>>) -> WorkflowSession {
        let client = ResumeClient::new(
            Box::new(ScriptedTransport::new(replies)),
            "https://x/start",
        );
        WorkflowSession::new(client)
    }

    fn begin_body() -> Result<HttpReply> {
        ok(r#"{"resumeUrl": "https://x/r1"}"#)
    }

    #[tokio::test]
    async fn test_start_advances_and_stores_token() {
        let mut session = session(vec![begin_body()]);

        session.start().await.unwrap();

        assert_eq!(session.stage(), Stage::Uploading);
        assert_eq!(session.token().unwrap().url(), "https://x/r1");
        assert!(!session.is_in_flight());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_start_failure_keeps_landing() {
        let mut session = session(vec![status(500)]);

        assert!(session.start().await.is_err());

        assert_eq!(session.stage(), Stage::Landing);
        assert!(session.token().is_none());
        assert!(session.last_error().is_some());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_upload_seeds_editor_with_extraction_copy() {
        let mut session = session(vec![begin_body(), ok(&extraction_body())]);
        session.start().await.unwrap();

        session.upload_audio(&wav()).await.unwrap();

        assert_eq!(session.stage(), Stage::Reviewing);
        let editor = session.editor().unwrap();
        assert_eq!(editor.edited(), editor.original());
        assert_eq!(editor.value(FieldKey::CustomerName), "Ada Obi");
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_stage_and_token() {
        let mut session = session(vec![begin_body(), status(500)]);
        session.start().await.unwrap();

        assert!(session.upload_audio(&wav()).await.is_err());

        assert_eq!(session.stage(), Stage::Uploading);
        assert_eq!(session.token().unwrap().url(), "https://x/r1");
        assert!(session.editor().is_none());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_audio_without_network() {
        let transport = ScriptedTransport::new(vec![begin_body()]);
        let calls = transport.call_counter();
        let client = ResumeClient::new(Box::new(transport), "https://x/start");
        let mut session = WorkflowSession::new(client);
        session.start().await.unwrap();

        let notes = AudioSource::new("notes.txt", None, vec![1, 2, 3]);
        assert!(session.upload_audio(&notes).await.is_err());

        assert_eq!(session.stage(), Stage::Uploading);
        // Only the start call went out
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_without_html_keeps_reviewing() {
        let mut session = session(vec![begin_body(), ok(&extraction_body()), ok("{}")]);
        session.start().await.unwrap();
        session.upload_audio(&wav()).await.unwrap();

        let result = session.generate_document().await;

        assert!(matches!(result, Err(Error::Generation(_))));
        assert_eq!(session.stage(), Stage::Reviewing);
        assert!(session.document().is_none());
        assert!(session.editor().is_some());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_send_refusal_keeps_document_ready() {
        let mut session = session(vec![
            begin_body(),
            ok(&extraction_body()),
            ok(r#"{"html": "<html>letter</html>"}"#),
            ok(r#"{"status": "Pending"}"#),
        ]);
        session.start().await.unwrap();
        session.upload_audio(&wav()).await.unwrap();
        session.generate_document().await.unwrap();

        let sent = session.approve_send().await.unwrap();

        assert!(!sent);
        assert_eq!(session.stage(), Stage::DocumentReady);
        assert_eq!(session.document(), Some("<html>letter</html>"));
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_send_transport_failure_is_error() {
        let mut session = session(vec![
            begin_body(),
            ok(&extraction_body()),
            ok(r#"{"html": "<html>letter</html>"}"#),
            down(),
        ]);
        session.start().await.unwrap();
        session.upload_audio(&wav()).await.unwrap();
        session.generate_document().await.unwrap();

        assert!(matches!(session.approve_send().await, Err(Error::Send(_))));
        assert_eq!(session.stage(), Stage::DocumentReady);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_full_happy_path_then_restart() {
        let mut session = session(vec![
            begin_body(),
            ok(&extraction_body()),
            ok(r#"{"html": "<html>letter</html>"}"#),
            ok(r#"{"status": "Email Sent"}"#),
        ]);

        session.start().await.unwrap();
        session.upload_audio(&wav()).await.unwrap();
        session
            .editor_mut()
            .unwrap()
            .set(FieldKey::CustomerName, "Ada Obi-Nwosu");
        session.generate_document().await.unwrap();
        assert!(session.approve_send().await.unwrap());
        assert_eq!(session.stage(), Stage::Confirmed);

        session.restart();

        assert_eq!(session.stage(), Stage::Landing);
        assert!(session.token().is_none());
        assert!(session.editor().is_none());
        assert!(session.document().is_none());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_restart_from_any_stage() {
        let mut session = session(vec![begin_body()]);
        session.start().await.unwrap();

        session.restart();

        assert_eq!(session.stage(), Stage::Landing);
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn test_operations_check_stage() {
        let mut session = session(vec![]);

        assert!(matches!(
            session.upload_audio(&wav()).await,
            Err(Error::Workflow(_))
        ));
        assert!(matches!(
            session.generate_document().await,
            Err(Error::Workflow(_))
        ));
        assert!(matches!(
            session.approve_send().await,
            Err(Error::Workflow(_))
        ));
    }

    #[test]
    fn test_in_flight_rejects_second_attempt() {
        let mut session = session(vec![begin_body()]);
        session
            .in_flight_flag()
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let result = tokio_test::block_on(session.start());

        assert!(matches!(result, Err(Error::Busy)));
        // The rejected attempt must not clear the flag it did not set
        assert!(session.is_in_flight());
    }

    #[test]
    fn test_stage_step_titles() {
        assert!(Stage::Landing.step_title().is_none());
        assert_eq!(Stage::Uploading.step_title(), Some("Start"));
        assert_eq!(Stage::Confirmed.step_title(), Some("Results"));
    }
}
