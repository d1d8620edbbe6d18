//! Transcript export.
//!
//! A room's user and assistant messages can be rendered as plain text, CSV
//! or a paginated PDF. The system prompt is never exported.

mod csv;
mod pdf;
mod txt;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::core::message::{Message, Role};

pub use self::csv::CsvExporter;
pub use self::pdf::PdfExporter;
pub use self::txt::TxtExporter;

/// Errors raised while rendering a transcript.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing the document failed.
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
    /// PDF assembly failed.
    #[error("pdf export failed: {0}")]
    Pdf(String),
    /// CSV encoding failed.
    #[error("csv export failed: {0}")]
    Csv(#[from] ::csv::Error),
    /// The requested format does not exist.
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Portable Document Format.
    #[default]
    Pdf,
    /// Plain text.
    Txt,
    /// Comma-separated values.
    Csv,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Csv => "csv",
        }
    }

    /// MIME type served with the download.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Txt => "text/plain",
            Self::Csv => "text/csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Counts over the exported messages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TranscriptStats {
    /// User and assistant messages.
    pub messages: usize,
    /// Whitespace-separated words.
    pub words: usize,
    /// Unicode scalar values.
    pub characters: usize,
}

/// Exportable view of one room.
#[derive(Clone, Debug)]
pub struct Transcript<'a> {
    room: &'a str,
    messages: Vec<&'a Message>,
    saved_at: DateTime<Local>,
}

impl<'a> Transcript<'a> {
    /// Keep only user and assistant messages from `messages`.
    #[must_use]
    pub fn new(room: &'a str, messages: &'a [Message], saved_at: DateTime<Local>) -> Self {
        Self {
            room,
            messages: messages
                .iter()
                .filter(|message| message.role() != Role::System)
                .collect(),
            saved_at,
        }
    }

    /// Room name.
    #[must_use]
    pub const fn room(&self) -> &str {
        self.room
    }

    /// Exported messages in order.
    #[must_use]
    pub fn messages(&self) -> &[&'a Message] {
        &self.messages
    }

    /// Save time.
    #[must_use]
    pub const fn saved_at(&self) -> DateTime<Local> {
        self.saved_at
    }

    /// Save time as `HH:MM:SS - DD/MM/YYYY`.
    #[must_use]
    pub fn saved_at_label(&self) -> String {
        self.saved_at.format("%H:%M:%S - %d/%m/%Y").to_string()
    }

    /// Message, word and character counts.
    #[must_use]
    pub fn stats(&self) -> TranscriptStats {
        self.messages
            .iter()
            .fold(TranscriptStats::default(), |mut stats, message| {
                stats.messages += 1;
                stats.words += message.content().split_whitespace().count();
                stats.characters += message.content().chars().count();
                stats
            })
    }
}

/// A rendered transcript ready for download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type.
    pub mime_type: &'static str,
    /// Document bytes.
    pub bytes: Vec<u8>,
}

/// Renders a transcript into one document format.
pub trait TranscriptExporter {
    /// Output format.
    fn format(&self) -> ExportFormat;

    /// Render the document body.
    ///
    /// # Errors
    /// Returns an error if the document cannot be encoded.
    fn render(&self, transcript: &Transcript<'_>) -> Result<Vec<u8>, ExportError>;
}

/// Download name: `Scientia-{room}-{HH-MM-SS--DD-MM-YYYY}.{ext}`.
#[must_use]
pub fn file_name(room: &str, saved_at: DateTime<Local>, format: ExportFormat) -> String {
    format!(
        "Scientia-{room}-{}.{}",
        saved_at.format("%H-%M-%S--%d-%m-%Y"),
        format.extension()
    )
}

/// Render `messages` from `room` in `format`.
///
/// # Errors
/// Returns an error if the document cannot be encoded.
pub fn export_transcript(
    messages: &[Message],
    room: &str,
    format: ExportFormat,
    saved_at: DateTime<Local>,
) -> Result<ExportedFile, ExportError> {
    let transcript = Transcript::new(room, messages, saved_at);
    let exporter: &dyn TranscriptExporter = match format {
        ExportFormat::Pdf => &PdfExporter,
        ExportFormat::Txt => &TxtExporter,
        ExportFormat::Csv => &CsvExporter,
    };
    let bytes = exporter.render(&transcript)?;
    let format = exporter.format();
    tracing::info!(room, %format, bytes = bytes.len(), "transcript exported");
    Ok(ExportedFile {
        file_name: file_name(room, saved_at, format),
        mime_type: format.mime_type(),
        bytes,
    })
}
