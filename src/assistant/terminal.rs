//! Line-oriented chat front end.
//!
//! Messages are printed; images are written as JPEG files under an output directory and
//! referenced by path. Actions are typed as slash commands (`/chat`, `/locate`, `/center`),
//! `/quit` ends the session, and any other line is a message for the current mode.

use crate::assistant::surface::{Attachment, ChatSurface, OutboundMessage};
use crate::assistant::turn::Assistant;
use crate::error::{HackerbotError, Result};
use async_trait::async_trait;
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

const ACTION_PREFIX: &str = "action_";

pub struct TerminalSurface {
    out: Mutex<Box<dyn Write + Send>>,
    output_dir: PathBuf,
}

impl TerminalSurface {
    pub fn new(out: Box<dyn Write + Send>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            out: Mutex::new(out),
            output_dir: output_dir.into(),
        }
    }

    pub fn stdout(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(std::io::stdout()), output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn save_image(&self, attachment: &Attachment) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f");
        let path = self
            .output_dir
            .join(format!("{}-{}.jpg", stamp, slug(&attachment.name)));
        tokio::fs::write(&path, &attachment.image.bytes).await?;

        debug!(path = %path.display(), bytes = attachment.image.bytes.len(), "Saved image");
        Ok(path)
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        let mut out = self.out.lock().map_err(|_| {
            HackerbotError::IoError(std::io::Error::other("terminal output poisoned"))
        })?;
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ChatSurface for TerminalSurface {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let mut lines = Vec::new();

        match &message.image {
            Some(attachment) => {
                let path = self.save_image(attachment).await?;
                lines.push(format!("[{}] {}", message.text, path.display()));
            }
            None => lines.push(message.text.clone()),
        }

        for action in &message.actions {
            let command = action.name.strip_prefix(ACTION_PREFIX).unwrap_or(&action.name);
            lines.push(format!("  /{:<8} {}", command, action.label));
        }

        self.write_lines(&lines)
    }
}

/// Filesystem-safe form of an image caption.
fn slug(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
        if slug.len() >= 48 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug.to_string()
    }
}

/// Drive one session from `input` until `/quit` or end of input.
///
/// A failed turn is logged and reported, and the loop keeps reading. An invalid mode is a
/// configuration mistake and ends the loop with an error.
pub async fn run_repl<R>(
    assistant: &Assistant,
    surface: &dyn ChatSurface,
    mut input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut session = assistant.new_session();
    assistant.start_session(&mut session, surface).await?;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable input line");
                surface
                    .send(OutboundMessage::text("Error: input is not valid UTF-8"))
                    .await?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if let Some(command) = line.strip_prefix('/') {
            let action = format!("{}{}", ACTION_PREFIX, command);
            match assistant.select_action(&mut session, &action, surface).await {
                Ok(_) => {}
                Err(HackerbotError::InvalidMode(_)) => {
                    surface
                        .send(OutboundMessage::text(format!("Unknown action: /{}", command)))
                        .await?;
                    assistant.offer_actions(&session, surface).await?;
                }
                Err(e) => return Err(e),
            }
            continue;
        }

        match assistant.handle_message(&mut session, line, surface).await {
            Ok(report) => debug!(
                mode = %report.mode,
                located = report.located.is_some(),
                "Turn complete"
            ),
            Err(e @ HackerbotError::InvalidMode(_)) => return Err(e),
            Err(e) => {
                error!(error = %e, "Turn failed");
                surface.send(OutboundMessage::text(format!("Error: {}", e))).await?;
            }
        }
    }

    info!(session = %session.id(), "Chat ended");
    Ok(())
}
