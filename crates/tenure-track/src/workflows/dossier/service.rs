use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NotificationsConfig;
use crate::workflows::directory::{
    Course, DirectoryService, DirectoryServiceError, DirectoryStore, Faculty, FacultyId,
    NewPosition, NewResolution, Position, PositionId, RepositoryError, Resolution,
    ResolutionAuthority, ResolutionPurpose, StoredFile,
};

use super::checklist;
use super::committee::{
    ensure_observer_seats, Attendance, Committee, CommitteeMember, CommitteeViolation,
    ExternalMember, Observer,
};
use super::documents::{
    apply_letterhead, bundle_parts, form_document_filename, pdf_content_type, slug, substitute,
    DocumentError, FormDocumentContext, MailAttachment, MailError, MailMessage, MailTransport,
    PdfMergeError, PdfMerger, TemplateDocument, TemplateStore, DOCX_CONTENT_TYPE,
};
use super::domain::{
    Dossier, DossierId, DossierStatus, Evaluation, EvaluationId, EvaluationStatus, Form, FormId,
    FormKind, FormStatus,
};
use super::report::{
    partition_forms, DashboardQuery, DossierBoard, DossierDetail, DossierSummary, EvaluationView,
};
use super::repository::DossierStore;
use super::validation::{
    ensure_docket_format, ensure_dossier_can_open, ensure_evaluation_years,
    ensure_form_consistent, RuleViolation,
};

static DOSSIER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static FORM_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_dossier_id() -> DossierId {
    DossierId(DOSSIER_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_form_id() -> FormId {
    FormId(FORM_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_evaluation_id() -> EvaluationId {
    EvaluationId(EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Intake payload to open a dossier on an existing position.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenDossier {
    pub position: PositionId,
    #[serde(default)]
    pub docket: Option<String>,
}

/// Intake payload for a resolution registered through a dossier.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionIntake {
    pub number: u32,
    pub year: i32,
    pub purpose: ResolutionPurpose,
    pub authority: ResolutionAuthority,
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default)]
    pub extension_days: Option<i64>,
    #[serde(default)]
    pub leave_start: Option<NaiveDate>,
    #[serde(default)]
    pub leave_end: Option<NaiveDate>,
    #[serde(default)]
    pub extends_dossier: bool,
}

/// What registering a resolution did to the dossier.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOutcome {
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_as: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_days_applied: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<DossierStatus>,
}

/// Membership payload for the committee upsert.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitteeIntake {
    #[serde(default)]
    pub internal_titular: Option<FacultyId>,
    #[serde(default)]
    pub internal_alternate: Option<FacultyId>,
    #[serde(default)]
    pub external_titulars: Vec<ExternalMember>,
    #[serde(default)]
    pub external_alternates: Vec<ExternalMember>,
    #[serde(default)]
    pub student_titular: Option<Observer>,
    #[serde(default)]
    pub student_alternate: Option<Observer>,
    #[serde(default)]
    pub graduate_titular: Option<Observer>,
    #[serde(default)]
    pub graduate_alternate: Option<Observer>,
    #[serde(default)]
    pub attendance: std::collections::BTreeMap<String, Attendance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderOutcome {
    pub recipient: String,
    pub attachments: usize,
    pub listed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitteeNotification {
    pub sent: usize,
    pub errors: Vec<String>,
}

/// A rendered file ready for download.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DossierBundle {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub skipped: Vec<String>,
}

/// Error raised by the dossier workflow service.
#[derive(Debug, thiserror::Error)]
pub enum DossierServiceError {
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error(transparent)]
    Committee(#[from] CommitteeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryServiceError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Pdf(#[from] PdfMergeError),
    #[error("dossier not found")]
    DossierNotFound,
    #[error("form not found")]
    FormNotFound,
    #[error("evaluation not found")]
    EvaluationNotFound,
    #[error("position not found")]
    PositionNotFound,
    #[error("{0} has no primary mail address")]
    MissingPrimaryEmail(String),
    #[error("no committee has been assigned to this dossier")]
    MissingCommittee,
    #[error("{0}")]
    NothingToSend(String),
}

/// Service composing the directory, the dossier store, and the outbound
/// gateways into the dossier workflow operations.
pub struct DossierService<D, S, M> {
    directory: Arc<DirectoryService<D>>,
    store: Arc<S>,
    mail: Arc<M>,
    templates: Box<dyn TemplateStore>,
    pdf: Box<dyn PdfMerger>,
    notifications: NotificationsConfig,
}

impl<D, S, M> DossierService<D, S, M>
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(
        directory: Arc<DirectoryService<D>>,
        store: Arc<S>,
        mail: Arc<M>,
        templates: Box<dyn TemplateStore>,
        pdf: Box<dyn PdfMerger>,
        notifications: NotificationsConfig,
    ) -> Self {
        Self {
            directory,
            store,
            mail,
            templates,
            pdf,
            notifications,
        }
    }

    pub fn directory(&self) -> Arc<DirectoryService<D>> {
        self.directory.clone()
    }

    /// Open a dossier on an existing position, seeding its form checklist.
    pub fn open_dossier(&self, intake: OpenDossier) -> Result<Dossier, DossierServiceError> {
        let position = self.position(intake.position)?;
        let start = position.start;
        let original_expiry = position
            .expiry
            .ok_or(RuleViolation::MissingPositionExpiry)?;

        let existing = self.store.dossier_for_position(position.id)?;
        ensure_dossier_can_open(&position, existing.as_ref(), start, original_expiry)?;

        if let Some(docket) = &intake.docket {
            self.ensure_docket_free(docket)?;
        }

        let dossier = Dossier {
            id: next_dossier_id(),
            position: position.id,
            docket: intake.docket,
            start,
            original_expiry,
            current_expiry: original_expiry,
            status: DossierStatus::Active,
            designation_resolution: None,
            commissioning_resolution: None,
            closed_at: None,
        };
        let dossier = self.store.insert_dossier(dossier)?;

        for (kind, year) in checklist::seeded_kinds(start, original_expiry, position.dedication) {
            let form = Form {
                id: next_form_id(),
                dossier: dossier.id,
                kind,
                status: FormStatus::Pending,
                submitted_on: None,
                file: None,
                year,
                evaluation: None,
            };
            ensure_form_consistent(&form, &dossier)?;
            self.store.insert_form(form)?;
        }

        info!(dossier = dossier.id.0, position = position.id.0, "dossier opened");
        Ok(dossier)
    }

    /// Register a brand-new position and open its dossier in one step.
    pub fn open_with_new_position(
        &self,
        position: NewPosition,
        docket: Option<String>,
    ) -> Result<Dossier, DossierServiceError> {
        let position = self.directory.register_position(position)?;
        self.open_dossier(OpenDossier {
            position: position.id,
            docket,
        })
    }

    pub fn assign_docket(
        &self,
        dossier_id: DossierId,
        docket: &str,
    ) -> Result<Dossier, DossierServiceError> {
        let mut dossier = self.dossier(dossier_id)?;
        let docket = docket.trim();
        self.ensure_docket_free(docket)?;
        dossier.docket = Some(docket.to_string());
        self.store.update_dossier(dossier.clone())?;
        Ok(dossier)
    }

    /// File a resolution and apply its side effects on the dossier: linkage,
    /// expiry extensions, and leave transitions.
    pub fn register_resolution(
        &self,
        dossier_id: DossierId,
        intake: ResolutionIntake,
    ) -> Result<ResolutionOutcome, DossierServiceError> {
        let mut dossier = self.dossier(dossier_id)?;

        let resolution = self.directory.record_resolution(NewResolution {
            position: dossier.position,
            number: intake.number,
            year: intake.year,
            purpose: intake.purpose,
            authority: intake.authority,
            file: intake.file,
            leave_start: intake.leave_start,
            leave_end: intake.leave_end,
            extends_dossier: intake.extends_dossier,
        })?;

        let mut outcome = ResolutionOutcome {
            resolution: resolution.clone(),
            linked_as: None,
            extension_days_applied: None,
            new_status: None,
        };

        match resolution.purpose {
            ResolutionPurpose::Appointment | ResolutionPurpose::Designation => {
                dossier.designation_resolution = Some(resolution.id);
                outcome.linked_as = Some("designation");
            }
            ResolutionPurpose::Commissioning => {
                dossier.commissioning_resolution = Some(resolution.id);
                outcome.linked_as = Some("commissioning");
            }
            ResolutionPurpose::DossierExtension => {
                let days = intake.extension_days.unwrap_or(0);
                if days > 0 {
                    dossier.current_expiry += chrono::Duration::days(days);
                    outcome.extension_days_applied = Some(days);
                }
            }
            ResolutionPurpose::LeaveStart => {
                dossier.status = DossierStatus::OnLeave;
                outcome.new_status = Some(DossierStatus::OnLeave);
            }
            ResolutionPurpose::LeaveEnd => {
                dossier.status = DossierStatus::Active;
                outcome.new_status = Some(DossierStatus::Active);

                // Credit the leave back onto the term when the matching leave
                // start was filed as extending the dossier.
                if let Some(days) = self.leave_credit_days(dossier.position, &resolution)? {
                    dossier.current_expiry += chrono::Duration::days(days);
                    outcome.extension_days_applied = Some(days);
                }
            }
            ResolutionPurpose::Termination => {}
        }

        self.store.update_dossier(dossier)?;
        info!(
            dossier = dossier_id.0,
            resolution = %resolution.reference(),
            "resolution registered"
        );
        Ok(outcome)
    }

    fn leave_credit_days(
        &self,
        position: PositionId,
        leave_end: &Resolution,
    ) -> Result<Option<i64>, DossierServiceError> {
        let mut starts: Vec<Resolution> = self
            .directory
            .resolutions_of(position)?
            .into_iter()
            .filter(|resolution| resolution.purpose == ResolutionPurpose::LeaveStart)
            .collect();
        starts.sort_by_key(|resolution| resolution.leave_start);

        let Some(latest_start) = starts.pop() else {
            warn!(position = position.0, "leave end filed without a leave start");
            return Ok(None);
        };

        if !latest_start.extends_dossier {
            return Ok(None);
        }

        match (latest_start.leave_start, leave_end.leave_end) {
            (Some(started), Some(ended)) if ended > started => {
                Ok(Some((ended - started).num_days()))
            }
            _ => {
                warn!(position = position.0, "leave resolutions are missing dates");
                Ok(None)
            }
        }
    }

    /// Start an evaluation round over a subset of the pending years, seeding
    /// the committee form set.
    pub fn start_evaluation(
        &self,
        dossier_id: DossierId,
        mut years: Vec<i32>,
        today: NaiveDate,
    ) -> Result<Evaluation, DossierServiceError> {
        let dossier = self.dossier(dossier_id)?;
        let siblings = self.store.evaluations_of(dossier_id)?;
        ensure_evaluation_years(&dossier, &siblings, &years, today)?;

        years.sort_unstable();
        years.dedup();

        let number = siblings
            .iter()
            .map(|evaluation| evaluation.number)
            .max()
            .unwrap_or(0)
            + 1;

        let evaluation = self.store.insert_evaluation(Evaluation {
            id: next_evaluation_id(),
            dossier: dossier_id,
            number,
            opened_on: today,
            years,
            scheduled_at: None,
            status: EvaluationStatus::Scheduled,
        })?;

        for kind in FormKind::evaluation_set() {
            self.store.insert_form(Form {
                id: next_form_id(),
                dossier: dossier_id,
                kind,
                status: FormStatus::Pending,
                submitted_on: None,
                file: None,
                year: None,
                evaluation: Some(evaluation.id),
            })?;
        }

        info!(
            dossier = dossier_id.0,
            number = evaluation.number,
            "evaluation round opened"
        );
        Ok(evaluation)
    }

    /// Set or clear the session date of an evaluation round.
    pub fn schedule_evaluation(
        &self,
        evaluation_id: EvaluationId,
        at: Option<NaiveDateTime>,
    ) -> Result<Evaluation, DossierServiceError> {
        let mut evaluation = self.evaluation(evaluation_id)?;
        evaluation.scheduled_at = at;
        self.store.update_evaluation(evaluation.clone())?;
        Ok(evaluation)
    }

    /// Attach an uploaded file to a checklist form, marking it submitted.
    pub fn submit_form(
        &self,
        form_id: FormId,
        file: StoredFile,
        today: NaiveDate,
    ) -> Result<Form, DossierServiceError> {
        let mut form = self.form(form_id)?;
        let dossier = self.dossier(form.dossier)?;

        form.status = FormStatus::Submitted;
        form.submitted_on = Some(today);
        form.file = Some(file);
        ensure_form_consistent(&form, &dossier)?;

        self.store.update_form(form.clone())?;
        Ok(form)
    }

    /// Flag a submitted form as observed by the office.
    pub fn observe_form(&self, form_id: FormId) -> Result<Form, DossierServiceError> {
        let mut form = self.form(form_id)?;
        form.status = FormStatus::Observed;
        self.store.update_form(form.clone())?;
        Ok(form)
    }

    pub fn close_dossier(
        &self,
        dossier_id: DossierId,
        now: NaiveDateTime,
    ) -> Result<Dossier, DossierServiceError> {
        let mut dossier = self.dossier(dossier_id)?;
        dossier.status = DossierStatus::Closed;
        dossier.closed_at = Some(now);
        self.store.update_dossier(dossier.clone())?;
        info!(dossier = dossier_id.0, "dossier closed");
        Ok(dossier)
    }

    /// Flip open dossiers whose current expiry has passed to `Expired`.
    /// Returns how many changed.
    pub fn expire_overdue(&self, today: NaiveDate) -> Result<usize, DossierServiceError> {
        let mut flipped = 0;
        for mut dossier in self.store.list_dossiers()? {
            if dossier.status.open() && dossier.current_expiry < today {
                dossier.status = DossierStatus::Expired;
                self.store.update_dossier(dossier)?;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    pub fn dashboard(
        &self,
        query: &DashboardQuery,
        today: NaiveDate,
    ) -> Result<DossierBoard, DossierServiceError> {
        let needle = query
            .search
            .as_ref()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let mut rows = Vec::new();
        for dossier in self.store.list_dossiers()? {
            let (position, faculty, course) = self.context(&dossier)?;

            if let Some(status) = query.status {
                if dossier.status != status {
                    continue;
                }
            }
            if let Some(needle) = &needle {
                if !faculty.given_name.contains(needle) && !faculty.surname.contains(needle) {
                    continue;
                }
            }

            let forms = self.store.forms_of(dossier.id)?;
            let due: Vec<&Form> = forms
                .iter()
                .filter(|form| checklist::is_due(form, today))
                .collect();
            let submitted = due
                .iter()
                .filter(|form| form.status == FormStatus::Submitted)
                .count();

            rows.push(DossierSummary {
                dossier: dossier.id,
                docket: dossier.docket.clone(),
                faculty: position.faculty,
                faculty_name: faculty.display_name(),
                course: course.display_name(),
                status: dossier.status,
                status_label: dossier.status.label(),
                start: dossier.start,
                current_expiry: dossier.current_expiry,
                due_forms_total: due.len(),
                due_forms_submitted: submitted,
            });
        }

        Ok(DossierBoard::build(rows, today))
    }

    pub fn detail(
        &self,
        dossier_id: DossierId,
        today: NaiveDate,
    ) -> Result<DossierDetail, DossierServiceError> {
        let dossier = self.dossier(dossier_id)?;
        let (_, faculty, course) = self.context(&dossier)?;

        let forms = self.store.forms_of(dossier_id)?;
        let (cv, one_time, annual, evaluation_forms) = partition_forms(&forms, today);

        let evaluations = self.store.evaluations_of(dossier_id)?;
        let pending_years = checklist::pending_years(dossier.start, today, &evaluations);

        let has_remindable_pending = forms.iter().any(|form| {
            form.status == FormStatus::Pending && FormKind::reminded().contains(&form.kind)
        });

        Ok(DossierDetail {
            dossier: dossier.id,
            docket: dossier.docket.clone(),
            faculty_name: faculty.display_name(),
            course: course.display_name(),
            status: dossier.status,
            status_label: dossier.status.label(),
            start: dossier.start,
            original_expiry: dossier.original_expiry,
            current_expiry: dossier.current_expiry,
            cv,
            one_time_forms: one_time,
            annual_forms: annual,
            evaluation_forms,
            evaluations: evaluations.iter().map(EvaluationView::from_evaluation).collect(),
            pending_years,
            has_remindable_pending,
            committee: self.store.committee_of(dossier_id)?,
        })
    }

    /// Replace the committee membership of a dossier.
    pub fn upsert_committee(
        &self,
        dossier_id: DossierId,
        intake: CommitteeIntake,
    ) -> Result<Committee, DossierServiceError> {
        self.dossier(dossier_id)?;

        let committee = Committee {
            dossier: dossier_id,
            internal_titular: intake.internal_titular,
            internal_alternate: intake.internal_alternate,
            external_titulars: intake.external_titulars,
            external_alternates: intake.external_alternates,
            student_titular: intake.student_titular,
            student_alternate: intake.student_alternate,
            graduate_titular: intake.graduate_titular,
            graduate_alternate: intake.graduate_alternate,
            attendance: intake.attendance,
        };

        ensure_observer_seats(&committee)?;
        for member in [committee.internal_titular, committee.internal_alternate]
            .into_iter()
            .flatten()
        {
            let eligible = self
                .directory
                .store()
                .positions_of(member)?
                .iter()
                .any(|position| position.tenure.tenure_track());
            if !eligible {
                return Err(CommitteeViolation::IneligibleInternalMember.into());
            }
        }

        self.store.upsert_committee(committee.clone())?;
        Ok(committee)
    }

    /// Mail the faculty member the templates for their pending F02/F04/F05
    /// forms, generating the personalized ones on the fly.
    pub fn remind_pending(
        &self,
        dossier_id: DossierId,
        today: NaiveDate,
    ) -> Result<ReminderOutcome, DossierServiceError> {
        let dossier = self.dossier(dossier_id)?;
        let (position, faculty, course) = self.context(&dossier)?;

        let recipient = self
            .directory
            .primary_email(position.faculty)?
            .ok_or_else(|| DossierServiceError::MissingPrimaryEmail(faculty.display_name()))?;

        let pending: Vec<Form> = self
            .store
            .forms_of(dossier_id)?
            .into_iter()
            .filter(|form| {
                form.status == FormStatus::Pending && FormKind::reminded().contains(&form.kind)
            })
            .collect();
        if pending.is_empty() {
            return Err(DossierServiceError::NothingToSend(
                "no pending F02/F04/F05 forms to remind about".to_string(),
            ));
        }

        let rank_info = format!(
            "{} in the course {}",
            position.rank_line(),
            course.display_name()
        );
        let mut body_lines = vec![
            "Dear Faculty Member,".to_string(),
            String::new(),
            format!(
                "This is a reminder that documentation is still pending on your tenure-track dossier for your appointment as {rank_info}."
            ),
            "The templates for the following forms are attached:".to_string(),
            String::new(),
            "- Curriculum Vitae (CONEAU format).".to_string(),
        ];

        let mut attachments = Vec::new();
        for form in &pending {
            if form.kind.generated() {
                let year = form.year.unwrap_or_else(|| today.year());
                match self.generate_form_document(form.kind, year, &position, &faculty, &course, today)? {
                    Some((filename, bytes)) => {
                        body_lines.push(format!(
                            "- {} for {} (personalized)",
                            form.kind.code(),
                            year
                        ));
                        attachments.push(MailAttachment {
                            filename,
                            content_type: DOCX_CONTENT_TYPE.to_string(),
                            bytes,
                        });
                    }
                    None => {
                        body_lines.push(format!(
                            "- {} for {} - could not be generated (check the master template and the year's letterhead)",
                            form.kind.code(),
                            year
                        ));
                    }
                }
            } else if form.kind == FormKind::F02 {
                match self.templates.file(FormKind::F02.code())? {
                    Some(file) => {
                        body_lines.push("- Form F02".to_string());
                        attachments.push(MailAttachment {
                            filename: file.filename,
                            content_type: file.content_type,
                            bytes: file.bytes,
                        });
                    }
                    None => {
                        body_lines.push("- Form F02 - master template not found".to_string());
                    }
                }
            }
        }

        body_lines.push(String::new());
        body_lines.push("Kind regards,".to_string());
        body_lines.push(self.notifications.department.clone());

        let attachment_count = attachments.len();
        self.mail.send(MailMessage {
            to: recipient.clone(),
            subject: "Pending Documentation Reminder - Tenure-Track Dossier".to_string(),
            body: body_lines.join("\n"),
            html: false,
            attachments,
        })?;

        info!(
            dossier = dossier_id.0,
            attachments = attachment_count,
            "pending-forms reminder sent"
        );
        Ok(ReminderOutcome {
            recipient,
            attachments: attachment_count,
            listed: body_lines,
        })
    }

    /// Build the downloadable template for a form: generated kinds are
    /// personalized on the fly, the rest serve their master file.
    pub fn form_template(
        &self,
        form_id: FormId,
        today: NaiveDate,
    ) -> Result<GeneratedDocument, DossierServiceError> {
        let form = self.form(form_id)?;
        let dossier = self.dossier(form.dossier)?;
        let (position, faculty, course) = self.context(&dossier)?;

        if form.kind.generated() {
            let year = form.year.unwrap_or_else(|| today.year());
            let (filename, bytes) = self
                .generate_form_document(form.kind, year, &position, &faculty, &course, today)?
                .ok_or_else(|| {
                    DossierServiceError::NothingToSend(format!(
                        "could not generate {}: master template or letterhead for {} missing",
                        form.kind.code(),
                        year
                    ))
                })?;
            return Ok(GeneratedDocument {
                filename,
                content_type: DOCX_CONTENT_TYPE.to_string(),
                bytes,
            });
        }

        let file = self
            .templates
            .file(form.kind.code())?
            .ok_or_else(|| {
                DossierServiceError::NothingToSend(format!(
                    "no master template found for {}",
                    form.kind.code()
                ))
            })?;
        Ok(GeneratedDocument {
            filename: file.filename,
            content_type: file.content_type,
            bytes: file.bytes,
        })
    }

    fn generate_form_document(
        &self,
        kind: FormKind,
        year: i32,
        position: &Position,
        faculty: &Faculty,
        course: &Course,
        today: NaiveDate,
    ) -> Result<Option<(String, Vec<u8>)>, DossierServiceError> {
        let Some(mut document) = self.templates.template(kind.code())? else {
            return Ok(None);
        };
        let Some(letterhead) = self.templates.letterhead(year)? else {
            return Ok(None);
        };

        let context = FormDocumentContext {
            faculty_name: faculty.display_name(),
            course: course.display_name(),
            rank: position.rank_line(),
            dedication: position.dedication.label().to_string(),
            year,
            generated_on: today,
        };
        substitute(&mut document, &context.replacements());
        let logo_slot = apply_letterhead(&mut document, &letterhead);

        let logo = logo_slot.then_some(letterhead.logo.as_slice());
        let bytes = self.templates.render(&document, logo)?;
        let filename = form_document_filename(kind, year, &faculty.display_name());
        Ok(Some((filename, bytes)))
    }

    /// Convoke the active committee members for an evaluation, attaching the
    /// submitted documentation the round covers.
    pub fn notify_committee(
        &self,
        evaluation_id: EvaluationId,
    ) -> Result<CommitteeNotification, DossierServiceError> {
        let evaluation = self.evaluation(evaluation_id)?;
        let dossier = self.dossier(evaluation.dossier)?;
        let (_, faculty, _) = self.context(&dossier)?;

        let committee = self
            .store
            .committee_of(dossier.id)?
            .ok_or(DossierServiceError::MissingCommittee)?;
        let members = committee.active_members();
        if members.is_empty() {
            return Err(DossierServiceError::NothingToSend(
                "the committee has no active members to notify".to_string(),
            ));
        }

        let attachments: Vec<MailAttachment> = self
            .store
            .forms_of(dossier.id)?
            .into_iter()
            .filter(|form| form.status == FormStatus::Submitted)
            .filter(|form| match form.year {
                None => true,
                Some(year) => evaluation.years.contains(&year),
            })
            .filter_map(|form| {
                form.file.map(|file| MailAttachment {
                    filename: file.filename,
                    content_type: file.content_type,
                    bytes: file.bytes,
                })
            })
            .collect();
        if attachments.is_empty() {
            return Err(DossierServiceError::NothingToSend(
                "no submitted documents to share with the committee".to_string(),
            ));
        }

        let session = evaluation
            .scheduled_at
            .map(|at| at.format("%d/%m/%Y at %H:%M").to_string())
            .unwrap_or_else(|| "to be confirmed".to_string());
        let subject = format!(
            "Convocation and Documentation for the Evaluation Committee - {}",
            faculty.display_name()
        );
        let body = format!(
            "Dear Committee Member,\n\n\
             You are convoked to the evaluation session for the tenure-track dossier of {}. \
             The session is scheduled for {}.\n\n\
             The relevant dossier documentation is attached for your review.\n\n\
             Kind regards,\n{}",
            faculty.display_name(),
            session,
            self.notifications.department
        );

        let mut sent = 0;
        let mut errors = Vec::new();
        for member in members {
            let (address, who) = match &member {
                CommitteeMember::Internal(id) => {
                    let display = self
                        .directory
                        .store()
                        .fetch_faculty(*id)?
                        .map(|faculty| faculty.display_name())
                        .unwrap_or_else(|| format!("faculty #{}", id.0));
                    (self.directory.primary_email(*id)?, display)
                }
                CommitteeMember::External(external) => {
                    (Some(external.email.clone()), external.full_name.clone())
                }
                CommitteeMember::Observer(observer) => {
                    (observer.email.clone(), observer.full_name.clone())
                }
            };

            let Some(address) = address else {
                errors.push(format!("no mail address on file for {who}"));
                continue;
            };

            match self.mail.send(MailMessage {
                to: address,
                subject: subject.clone(),
                body: body.clone(),
                html: false,
                attachments: attachments.clone(),
            }) {
                Ok(()) => sent += 1,
                Err(err) => errors.push(format!("could not mail {who}: {err}")),
            }
        }

        info!(
            evaluation = evaluation_id.0,
            sent,
            errors = errors.len(),
            "committee convocation dispatched"
        );
        Ok(CommitteeNotification { sent, errors })
    }

    /// Concatenate every stored file of the dossier, oldest first, into a
    /// single download.
    pub fn bundle(&self, dossier_id: DossierId) -> Result<DossierBundle, DossierServiceError> {
        let dossier = self.dossier(dossier_id)?;
        let (_, faculty, _) = self.context(&dossier)?;

        let forms = self.store.forms_of(dossier_id)?;
        let resolutions = self.directory.resolutions_of(dossier.position)?;
        let parts = bundle_parts(&forms, &resolutions, dossier.start);
        if parts.is_empty() {
            return Err(DossierServiceError::NothingToSend(
                "the dossier has no stored files to consolidate".to_string(),
            ));
        }

        let merged = self.pdf.merge(&parts)?;
        for label in &merged.skipped {
            warn!(dossier = dossier_id.0, file = %label, "bundle part skipped");
        }

        Ok(DossierBundle {
            filename: format!("dossier_{}.pdf", slug(&faculty.display_name())),
            content_type: pdf_content_type().to_string(),
            bytes: merged.bytes,
            skipped: merged.skipped,
        })
    }

    /// Render the jury proposal sheet for the dossier's committee.
    pub fn jury_sheet(&self, dossier_id: DossierId) -> Result<GeneratedDocument, DossierServiceError> {
        let dossier = self.dossier(dossier_id)?;
        let (_, faculty, course) = self.context(&dossier)?;
        let committee = self
            .store
            .committee_of(dossier_id)?
            .ok_or(DossierServiceError::MissingCommittee)?;

        let titulars = self.jury_rows(
            committee.internal_titular,
            &committee.external_titulars,
        )?;
        let alternates = self.jury_rows(
            committee.internal_alternate,
            &committee.external_alternates,
        )?;

        let document = TemplateDocument {
            paragraphs: vec![
                format!("Jury proposal - dossier of {}", faculty.display_name()),
                format!("Course: {}", course.display_name()),
                dossier
                    .docket
                    .as_ref()
                    .map(|docket| format!("Docket {docket}"))
                    .unwrap_or_else(|| "Docket pending assignment".to_string()),
                "Titular members".to_string(),
                "Alternate members".to_string(),
            ],
            tables: vec![titulars, alternates],
            header: Vec::new(),
        };

        let bytes = self.templates.render(&document, None)?;
        Ok(GeneratedDocument {
            filename: format!("jury_proposal_{}.pdf", slug(&faculty.display_name())),
            content_type: pdf_content_type().to_string(),
            bytes,
        })
    }

    fn jury_rows(
        &self,
        internal: Option<FacultyId>,
        externals: &[ExternalMember],
    ) -> Result<Vec<Vec<String>>, DossierServiceError> {
        let mut rows = Vec::new();

        if let Some(id) = internal {
            let store = self.directory.store();
            if let Some(member) = store.fetch_faculty(id)? {
                let rank = store
                    .positions_of(id)?
                    .first()
                    .map(|position| position.category.label().to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                let email = self
                    .directory
                    .primary_email(id)?
                    .unwrap_or_else(|| "N/A".to_string());
                rows.push(vec![
                    member.display_name(),
                    self.notifications.institution.clone(),
                    rank,
                    email,
                ]);
            }
        }

        for external in externals {
            rows.push(vec![
                external.full_name.clone(),
                external.home_university.clone(),
                external.rank_info.clone(),
                external.email.clone(),
            ]);
        }

        Ok(rows)
    }

    fn ensure_docket_free(&self, docket: &str) -> Result<(), DossierServiceError> {
        ensure_docket_format(docket)?;
        if self.store.find_by_docket(docket)?.is_some() {
            return Err(RuleViolation::DocketTaken {
                value: docket.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn context(
        &self,
        dossier: &Dossier,
    ) -> Result<(Position, Faculty, Course), DossierServiceError> {
        let position = self.position(dossier.position)?;
        let store = self.directory.store();
        let faculty = store
            .fetch_faculty(position.faculty)?
            .ok_or(RepositoryError::NotFound)?;
        let course = store
            .fetch_course(position.course)?
            .ok_or(RepositoryError::NotFound)?;
        Ok((position, faculty, course))
    }

    fn position(&self, id: PositionId) -> Result<Position, DossierServiceError> {
        self.directory
            .store()
            .fetch_position(id)?
            .ok_or(DossierServiceError::PositionNotFound)
    }

    fn dossier(&self, id: DossierId) -> Result<Dossier, DossierServiceError> {
        self.store
            .fetch_dossier(id)?
            .ok_or(DossierServiceError::DossierNotFound)
    }

    fn form(&self, id: FormId) -> Result<Form, DossierServiceError> {
        self.store
            .fetch_form(id)?
            .ok_or(DossierServiceError::FormNotFound)
    }

    fn evaluation(&self, id: EvaluationId) -> Result<Evaluation, DossierServiceError> {
        self.store
            .fetch_evaluation(id)?
            .ok_or(DossierServiceError::EvaluationNotFound)
    }
}
