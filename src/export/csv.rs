use ::csv::{QuoteStyle, WriterBuilder};

use super::{ExportError, ExportFormat, Transcript, TranscriptExporter};

/// CSV transcript with one row per message.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsvExporter;

impl TranscriptExporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, transcript: &Transcript<'_>) -> Result<Vec<u8>, ExportError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer.write_record(["Sender", "Message", "Chat Room"])?;
        for message in transcript.messages() {
            writer.write_record([
                message.role().label(),
                message.content(),
                transcript.room(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }
}
