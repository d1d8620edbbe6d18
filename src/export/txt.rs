use super::{ExportError, ExportFormat, Transcript, TranscriptExporter};

const BANNER: &str = "‧˚₊• ══════ Scientia ══════ ‧˚₊•\n\n";
const CONVERSATION_HEADER: &str = "\n\n--- Conversation ---\n\n";

/// Plain-text transcript.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxtExporter;

impl TranscriptExporter for TxtExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Txt
    }

    fn render(&self, transcript: &Transcript<'_>) -> Result<Vec<u8>, ExportError> {
        let stats = transcript.stats();
        let mut lines = vec![
            BANNER.to_string(),
            format!("Chat Room: {}", transcript.room()),
            format!("Time Saved: {}", transcript.saved_at_label()),
            format!("Number of messages: {}", stats.messages),
            format!("Number of words: {}", stats.words),
            format!("Number of characters: {}", stats.characters),
            CONVERSATION_HEADER.to_string(),
        ];
        lines.extend(
            transcript
                .messages()
                .iter()
                .map(|message| format!("{}: {}\n", message.role().label(), message.content())),
        );
        Ok(lines.join("\n").into_bytes())
    }
}
