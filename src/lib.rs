//! Letterflow: guided offer-letter generation
//!
//! A terminal wizard that drives a remote document-generation workflow:
//! upload a meeting recording, review the extracted loan details, generate
//! the offer letter, approve the email send.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Shell (terminal)             │
//! │  stage renderer + per-stage prompts     │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          WorkflowSession                │
//! │  Landing → Uploading → Reviewing        │
//! │     → DocumentReady → Confirmed         │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ResumeClient                  │
//! │  begin / submit_audio / submit_record   │
//! │  / confirm_send against the resume URL  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The remote engine hands back a resume URL after the start call; every
//! subsequent step POSTs to the latest URL the server has issued.

pub mod client;
pub mod config;
pub mod record;
pub mod session;
pub mod shell;

// Re-exports for convenience
pub use client::{AudioSource, HttpTransport, ResumeClient, ResumeToken, Transport};
pub use config::Config;
pub use record::{ExtractedRecord, FieldKey, RecordEditor, Section};
pub use session::{Stage, WorkflowSession};
pub use shell::Shell;

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start workflow: {0}")]
    Start(String),

    #[error("Failed to upload audio: {0}")]
    Upload(String),

    #[error("Failed to generate document: {0}")]
    Generation(String),

    #[error("Failed to send email: {0}")]
    Send(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("An operation is already in flight")]
    Busy,

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
