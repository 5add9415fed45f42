//! Terminal presentation shell
//!
//! Renders the active stage with a progress indicator and error banner,
//! and exposes one advance action per stage: begin, pick a recording,
//! continue with the reviewed record, approve the send, restart. The
//! generated letter is never interpreted here; it goes byte-for-byte
//! into a preview file for the user's browser to render inside its own
//! sandbox.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::client::AudioSource;
use crate::config::Config;
use crate::record::{RecordEditor, Section};
use crate::session::{Stage, WorkflowSession};
use crate::Result;

type InputLines = Lines<BufReader<Stdin>>;

/// Interactive wizard shell over a [`WorkflowSession`]
pub struct Shell {
    session: WorkflowSession,
    preview_file: PathBuf,
    quit_flag: Arc<AtomicBool>,
}

impl Shell {
    pub fn new(session: WorkflowSession, config: &Config) -> Self {
        Self {
            session,
            preview_file: config.preview.file.clone(),
            quit_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared quit flag, set by the Ctrl+C handler
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit_flag.clone()
    }

    /// Run the wizard until completion or quit
    ///
    /// `preselected` skips the file prompt on the first pass through the
    /// upload stage.
    pub async fn run(&mut self, preselected: Option<PathBuf>) -> Result<()> {
        self.print_welcome();

        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();
        let mut preselected = preselected;

        loop {
            if self.quit_flag.load(Ordering::SeqCst) {
                println!("\nInterrupted.");
                break;
            }

            self.render_banner();

            let keep_going = match self.session.stage() {
                Stage::Landing => self.landing_step(&mut lines).await?,
                Stage::Uploading => {
                    self.upload_step(&mut lines, preselected.take()).await?
                }
                Stage::Reviewing => self.review_step(&mut lines).await?,
                Stage::DocumentReady => self.document_step(&mut lines).await?,
                Stage::Confirmed => self.confirmed_step(&mut lines).await?,
            };

            if !keep_going {
                break;
            }
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!("Offer Letter Generator");
        println!("Professional loan documentation from a meeting recording.\n");
    }

    fn render_banner(&self) {
        if let Some(line) = progress_line(self.session.stage()) {
            println!("\n{}\n", line);
        }
        if let Some(message) = self.session.last_error() {
            println!("Error: {}\n", message);
        }
    }

    async fn landing_step(&mut self, lines: &mut InputLines) -> Result<bool> {
        let Some(input) = prompt(lines, "Press Enter to begin (or 'quit'): ").await? else {
            return Ok(false);
        };
        if input == "quit" {
            return Ok(false);
        }

        println!("Starting workflow...");
        if let Err(e) = self.session.start().await {
            debug!("start failed: {}", e);
        }
        Ok(true)
    }

    async fn upload_step(
        &mut self,
        lines: &mut InputLines,
        preselected: Option<PathBuf>,
    ) -> Result<bool> {
        let path = match preselected {
            Some(path) => path,
            None => {
                let Some(input) =
                    prompt(lines, "Path to the meeting recording (or 'quit'): ").await?
                else {
                    return Ok(false);
                };
                if input == "quit" {
                    return Ok(false);
                }
                PathBuf::from(input)
            }
        };

        let audio = match AudioSource::from_path(&path).await {
            Ok(audio) => audio,
            Err(e) => {
                println!("Could not read {}: {}", path.display(), e);
                return Ok(true);
            }
        };

        if !audio.is_audio() {
            println!("Please select a valid audio file (.wav or .mp3).");
            return Ok(true);
        }

        println!("{} ({:.2} MB)", audio.file_name, audio.size_mb());
        println!("Extracting details from audio recording...");
        if let Err(e) = self.session.upload_audio(&audio).await {
            debug!("upload failed: {}", e);
        }
        Ok(true)
    }

    async fn review_step(&mut self, lines: &mut InputLines) -> Result<bool> {
        println!("Review the extracted details. Edit as needed, then continue.");
        if let Some(editor) = self.session.editor() {
            println!("\n{}", render_review(editor));
        }
        println!("Commands: edit <section.field> <value> | discard <section.field> | show | continue | quit");

        loop {
            let Some(input) = prompt(lines, "review> ").await? else {
                return Ok(false);
            };

            match input.split_once(' ').unwrap_or((input.as_str(), "")) {
                ("quit", _) => return Ok(false),
                ("continue", _) => {
                    println!("Generating offer letter...");
                    if let Err(e) = self.session.generate_document().await {
                        debug!("generation failed: {}", e);
                    }
                    return Ok(true);
                }
                ("show", _) => {
                    if let Some(editor) = self.session.editor() {
                        println!("\n{}", render_review(editor));
                    }
                }
                ("edit", rest) => match rest.split_once(' ') {
                    Some((key, value)) if !value.is_empty() => {
                        match key.parse() {
                            Ok(key) => {
                                if let Some(editor) = self.session.editor_mut() {
                                    editor.set(key, value.trim());
                                }
                            }
                            Err(e) => println!("{}", e),
                        }
                    }
                    _ => println!("Usage: edit <section.field> <value>"),
                },
                ("discard", key) if !key.is_empty() => match key.parse() {
                    Ok(key) => {
                        if let Some(editor) = self.session.editor_mut() {
                            editor.discard(key);
                        }
                    }
                    Err(e) => println!("{}", e),
                },
                _ => println!("Unknown command."),
            }
        }
    }

    async fn document_step(&mut self, lines: &mut InputLines) -> Result<bool> {
        if let Some(html) = self.session.document() {
            write_preview(&self.preview_file, html).await?;
            println!(
                "Offer letter written to {}. Open it in your browser to review.",
                self.preview_file.display()
            );
        }

        loop {
            let Some(input) = prompt(lines, "Type 'send' to email the letter (or 'quit'): ").await?
            else {
                return Ok(false);
            };
            match input.as_str() {
                "quit" => return Ok(false),
                "send" => {
                    println!("Sending offer letter via email...");
                    match self.session.approve_send().await {
                        Ok(true) => return Ok(true),
                        Ok(false) => return Ok(true),
                        Err(e) => {
                            debug!("send failed: {}", e);
                            return Ok(true);
                        }
                    }
                }
                _ => println!("Unknown command."),
            }
        }
    }

    async fn confirmed_step(&mut self, lines: &mut InputLines) -> Result<bool> {
        println!("Email sent successfully!");
        println!("The offer letter has been sent to the customer's email address.\n");

        let Some(input) =
            prompt(lines, "Type 'again' to generate another letter (or 'quit'): ").await?
        else {
            return Ok(false);
        };
        match input.as_str() {
            "again" => {
                self.session.restart();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Progress indicator for the post-landing steps; `None` on `Landing`
pub(crate) fn progress_line(stage: Stage) -> Option<String> {
    stage.step_title()?;

    let steps: Vec<Stage> = Stage::ALL
        .iter()
        .copied()
        .filter(|s| s.step_title().is_some())
        .collect();
    let current = steps.iter().position(|s| *s == stage)?;

    let parts: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let marker = if i < current {
                "✅"
            } else if i == current {
                "🔄"
            } else {
                "⬜"
            };
            format!("{} {}", marker, step.step_title().unwrap_or_default())
        })
        .collect();

    Some(parts.join("  "))
}

/// Render the record under review, grouped by section
pub(crate) fn render_review(editor: &RecordEditor) -> String {
    let mut lines = Vec::new();

    for section in Section::ALL {
        lines.push(section.title().to_string());
        for key in section.fields() {
            let value = editor.value(key);
            let shown = if value.is_empty() { "Not specified" } else { value };
            let marker = if editor.is_edited(key) { " (edited)" } else { "" };
            lines.push(format!("  {:<22} {}{}", key.label(), shown, marker));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write the generated letter verbatim for an external renderer
pub(crate) async fn write_preview(path: &Path, html: &str) -> Result<()> {
    tokio::fs::write(path, html).await?;
    Ok(())
}

async fn prompt(lines: &mut InputLines, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ExtractedRecord, FieldKey};

    #[test]
    fn test_progress_line_hidden_on_landing() {
        assert!(progress_line(Stage::Landing).is_none());
    }

    #[test]
    fn test_progress_line_marks_current_step() {
        let line = progress_line(Stage::Reviewing).unwrap();
        assert!(line.contains("✅ Start"));
        assert!(line.contains("🔄 Details"));
        assert!(line.contains("⬜ Processing"));
        assert!(line.contains("⬜ Results"));
    }

    #[test]
    fn test_render_review_shows_sections_and_placeholders() {
        let mut record = ExtractedRecord::default();
        record.customer.customer_name = "Ada Obi".to_string();
        let mut editor = RecordEditor::new(record);
        editor.set(FieldKey::BankName, "First Bank");

        let rendered = render_review(&editor);

        assert!(rendered.contains("Customer Information"));
        assert!(rendered.contains("Verification Data"));
        assert!(rendered.contains("Ada Obi"));
        assert!(rendered.contains("Not specified"));
        assert!(rendered.contains("First Bank (edited)"));
    }

    #[tokio::test]
    async fn test_write_preview_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.html");
        let html = "<html><script>alert('untrusted')</script></html>";

        write_preview(&path, html).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    }
}
