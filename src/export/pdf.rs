//! Paginated A4 transcript built directly with `lopdf`.
//!
//! Uses the standard Type1 Helvetica fonts, so only printable ASCII is
//! rendered; other characters are replaced with `?`.

use std::fmt;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use super::{ExportError, ExportFormat, Transcript, TranscriptExporter};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 42;
const TOP: i64 = PAGE_HEIGHT - MARGIN;
const BOTTOM: i64 = MARGIN;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

const TITLE: &str = "Scientia Saved Conversation";
const BODY_SIZE: i64 = 11;
const LEADING: i64 = 15;
/// Characters per wrapped line at `BODY_SIZE` across the printable width.
const WRAP_WIDTH: usize = 90;

/// PDF transcript.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfExporter;

impl TranscriptExporter for PdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, transcript: &Transcript<'_>) -> Result<Vec<u8>, ExportError> {
        let pages = layout(transcript);
        assemble(pages)
    }
}

/// Page-by-page operation lists with a vertical cursor.
struct Layout {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn ensure(&mut self, height: i64) {
        if self.y - height < BOTTOM {
            self.pages.push(Vec::new());
            self.y = TOP;
        }
    }

    fn push(&mut self, operation: Operation) {
        if let Some(page) = self.pages.last_mut() {
            page.push(operation);
        }
    }

    fn text(&mut self, font: &str, size: i64, x: i64, text: &str) {
        self.ensure(size + 4);
        self.y -= size + 4;
        let y = self.y;
        self.push(Operation::new("BT", vec![]));
        self.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), size.into()],
        ));
        self.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.push(Operation::new(
            "Tj",
            vec![Object::string_literal(sanitize(text))],
        ));
        self.push(Operation::new("ET", vec![]));
    }

    fn rule(&mut self) {
        self.y -= 6;
        let y = self.y;
        self.push(Operation::new("w", vec![1.into()]));
        self.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
        self.push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
        self.push(Operation::new("S", vec![]));
    }

    fn gap(&mut self, height: i64) {
        self.y -= height;
    }
}

fn layout(transcript: &Transcript<'_>) -> Vec<Vec<Operation>> {
    let stats = transcript.stats();
    let mut page = Layout::new();

    page.text(
        REGULAR,
        8,
        MARGIN,
        &format!("Saving Time: {}", transcript.saved_at_label()),
    );
    page.rule();
    page.gap(10);
    page.text(BOLD, 16, centered_x(TITLE, 16), TITLE);
    page.gap(14);

    for line in [
        format!("Chat Room: {}", transcript.room()),
        format!("Number of messages: {}", stats.messages),
        format!("Number of words: {}", stats.words),
        format!("Number of characters: {}", stats.characters),
    ] {
        page.text(REGULAR, BODY_SIZE, MARGIN, &line);
    }
    page.gap(LEADING);

    for message in transcript.messages() {
        page.text(
            BOLD,
            BODY_SIZE + 1,
            MARGIN,
            &format!("{}:", message.role().label()),
        );
        for line in wrap(message.content(), WRAP_WIDTH) {
            page.text(REGULAR, BODY_SIZE, MARGIN, &line);
        }
        page.gap(LEADING / 2);
    }

    page.pages
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular,
            BOLD => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let encoded = Content { operations }.encode().map_err(pdf_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).map_err(pdf_error)?;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}

fn pdf_error(err: impl fmt::Display) -> ExportError {
    ExportError::Pdf(err.to_string())
}

/// Approximate left offset centering `text` at `size` (Helvetica averages
/// about half an em per glyph).
fn centered_x(text: &str, size: i64) -> i64 {
    let glyphs = i64::try_from(text.chars().count()).unwrap_or(0);
    ((PAGE_WIDTH - glyphs * size / 2) / 2).max(MARGIN)
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(width) {
                let chunk: String = chunk.iter().collect();
                let current_len = current.chars().count();
                if current_len > 0 && current_len + 1 + chunk.chars().count() > width {
                    lines.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&chunk);
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
