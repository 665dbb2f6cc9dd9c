//! Document generation plumbing: placeholder substitution over template
//! text, the annual letterhead, and the outbound gateway ports (template
//! storage, mail transport, PDF assembly).
//!
//! Placeholder markers match the ones embedded in the office's existing
//! template files, so those files keep working unmodified.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::{Resolution, StoredFile};

use super::domain::{Form, FormKind};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn pdf_content_type() -> &'static str {
    mime::APPLICATION_PDF.as_ref()
}

/// Text model of an office template: body paragraphs, table cells, and the
/// header band carrying the letterhead slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub paragraphs: Vec<String>,
    pub tables: Vec<Vec<Vec<String>>>,
    pub header: Vec<String>,
}

/// Yearly letterhead: the logo image and the header phrase for that year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letterhead {
    pub year: i32,
    pub logo: Vec<u8>,
    pub phrase: String,
}

/// Replace every `(marker, value)` pair across body paragraphs and table
/// cells, leaving the header band alone.
pub fn substitute(document: &mut TemplateDocument, replacements: &[(&str, String)]) {
    for paragraph in &mut document.paragraphs {
        for (marker, value) in replacements {
            if paragraph.contains(marker) {
                *paragraph = paragraph.replace(marker, value);
            }
        }
    }

    for table in &mut document.tables {
        for row in table {
            for cell in row {
                for (marker, value) in replacements {
                    if cell.contains(marker) {
                        *cell = cell.replace(marker, value);
                    }
                }
            }
        }
    }
}

/// Fill the header band: the phrase slot takes the year's phrase, the logo
/// slot is cleared (the image itself travels to the renderer separately).
/// Returns whether a logo slot was present.
pub fn apply_letterhead(document: &mut TemplateDocument, letterhead: &Letterhead) -> bool {
    let mut logo_slot = false;
    for paragraph in &mut document.header {
        if paragraph.contains("[LOGO_ANUAL]") {
            paragraph.clear();
            logo_slot = true;
        }
        if paragraph.contains("[FRASE_ANUAL]") {
            *paragraph = paragraph.replace("[FRASE_ANUAL]", &letterhead.phrase);
        }
    }
    logo_slot
}

/// Values substituted into a personalized checklist form.
#[derive(Debug, Clone)]
pub struct FormDocumentContext {
    pub faculty_name: String,
    pub course: String,
    pub rank: String,
    pub dedication: String,
    pub year: i32,
    pub generated_on: NaiveDate,
}

impl FormDocumentContext {
    pub fn replacements(&self) -> Vec<(&'static str, String)> {
        vec![
            ("[DOCENTE_NOMBRE]", self.faculty_name.clone()),
            ("[ASIGNATURA]", self.course.clone()),
            ("[CARGO]", self.rank.clone()),
            ("[ANIO_LECTIVO]", self.year.to_string()),
            (
                "[FECHA_GENERACION]",
                self.generated_on.format("%d/%m/%Y").to_string(),
            ),
            ("[DEDICACION]", self.dedication.clone()),
            // Left as a fill-in-by-hand slot on the printed copy.
            ("[COMISIONES]", "....................".to_string()),
        ]
    }
}

/// Suggested filename for a generated form document.
pub fn form_document_filename(kind: FormKind, year: i32, faculty_name: &str) -> String {
    format!("{}_{}_{}.docx", kind.code(), year, slug(faculty_name))
}

/// Lowercase, alphanumeric-and-hyphen rendering of a display name for use in
/// filenames and storage paths.
pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_hyphen = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Error raised by the template storage gateway.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template storage unavailable: {0}")]
    Storage(String),
    #[error("could not render document: {0}")]
    Render(String),
}

/// Name of the course evaluation sheet template used by the equivalence
/// workflow.
pub const EVALUATION_SHEET_TEMPLATE: &str = "EVALUATION_SHEET";

/// Gateway to the office's template and letterhead library. Templates are
/// keyed by name; checklist kinds use their `FormKind::code`.
pub trait TemplateStore: Send + Sync {
    /// Editable text model of the named master template, if one exists.
    fn template(&self, name: &str) -> Result<Option<TemplateDocument>, DocumentError>;
    /// Raw master file for templates distributed as-is (e.g. F02).
    fn file(&self, name: &str) -> Result<Option<StoredFile>, DocumentError>;
    fn letterhead(&self, year: i32) -> Result<Option<Letterhead>, DocumentError>;
    /// Serialize a document model (plus an optional header logo) to bytes.
    fn render(
        &self,
        document: &TemplateDocument,
        logo: Option<&[u8]>,
    ) -> Result<Vec<u8>, DocumentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html: bool,
    pub attachments: Vec<MailAttachment>,
}

/// Mail dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Outbound mail gateway.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// One document of a consolidation bundle, with the date used for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPart {
    pub label: String,
    pub ordering: NaiveDate,
    pub bytes: Vec<u8>,
}

/// Assembled bundle plus the labels of parts the merger had to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPdf {
    pub bytes: Vec<u8>,
    pub skipped: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PdfMergeError {
    #[error("could not assemble bundle: {0}")]
    Assemble(String),
}

/// PDF concatenation gateway. Implementations report unreadable parts in
/// `MergedPdf::skipped` instead of failing the whole bundle.
pub trait PdfMerger: Send + Sync {
    fn merge(&self, parts: &[PdfPart]) -> Result<MergedPdf, PdfMergeError>;
}

/// Collect every stored file of the dossier in chronological order: forms by
/// submission date (falling back to Jan 1 of their year, then of the dossier
/// start year), resolutions by Jan 1 of their year.
pub fn bundle_parts(
    forms: &[Form],
    resolutions: &[Resolution],
    dossier_start: NaiveDate,
) -> Vec<PdfPart> {
    let mut parts = Vec::new();

    for form in forms {
        let Some(file) = &form.file else { continue };
        let ordering = form.submitted_on.unwrap_or_else(|| {
            let year = form.year.unwrap_or_else(|| dossier_start.year());
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(dossier_start)
        });
        parts.push(PdfPart {
            label: file.filename.clone(),
            ordering,
            bytes: file.bytes.clone(),
        });
    }

    for resolution in resolutions {
        let Some(file) = &resolution.file else { continue };
        let ordering =
            NaiveDate::from_ymd_opt(resolution.year, 1, 1).unwrap_or(dossier_start);
        parts.push(PdfPart {
            label: file.filename.clone(),
            ordering,
            bytes: file.bytes.clone(),
        });
    }

    parts.sort_by(|a, b| a.ordering.cmp(&b.ordering).then(a.label.cmp(&b.label)));
    parts
}
