//! Tenure-track dossier workflow: lifecycle, checklist, evaluation rounds,
//! committees, and the document/mail side effects.

pub mod checklist;
pub mod committee;
pub mod documents;
pub mod domain;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use committee::{
    Attendance, Committee, CommitteeMember, CommitteeViolation, Constituency, ExternalMember,
    Observer,
};
pub use documents::{
    DocumentError, Letterhead, MailAttachment, MailError, MailMessage, MailTransport, MergedPdf,
    PdfMergeError, PdfMerger, PdfPart, TemplateDocument, TemplateStore,
    EVALUATION_SHEET_TEMPLATE,
};
pub use domain::{
    Dossier, DossierId, DossierStatus, Evaluation, EvaluationId, EvaluationStatus, Form, FormId,
    FormKind, FormStatus,
};
pub use report::{DashboardQuery, DossierBoard, DossierDetail, DossierSummary};
pub use repository::DossierStore;
pub use router::dossier_router;
pub use service::{
    CommitteeIntake, CommitteeNotification, DossierBundle, DossierService, DossierServiceError,
    GeneratedDocument, OpenDossier, ReminderOutcome, ResolutionIntake, ResolutionOutcome,
};
pub use validation::RuleViolation;
