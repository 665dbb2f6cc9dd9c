use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NotificationsConfig;
use crate::workflows::directory::{
    CourseId, DirectoryService, DirectoryServiceError, DirectoryStore, FacultyId,
    RepositoryError, StoredFile,
};
use crate::workflows::dossier::documents::{
    substitute, DocumentError, MailAttachment, MailError, MailMessage, MailTransport,
    TemplateStore, DOCX_CONTENT_TYPE, EVALUATION_SHEET_TEMPLATE,
};

use super::domain::{
    progress, EquivalenceRequest, ItemId, ItemStatus, RequestId, RequestItem, RequestStatus,
    RosterEntry, Student, StudentId,
};
use super::repository::EquivalenceStore;
use super::stats::{self, EquivalenceStatistics};

static STUDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ITEM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_student_id() -> StudentId {
    StudentId(STUDENT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_request_id() -> RequestId {
    RequestId(REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_item_id() -> ItemId {
    ItemId(ITEM_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// The evaluation sheet fills a Spanish-language template, so its date slot
/// keeps the long Spanish form.
const SPANISH_MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

fn long_date(date: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        SPANISH_MONTHS[date.month0() as usize],
        date.year()
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub full_name: String,
    pub identity_document: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Intake payload to open a request: an existing student or a new one, the
/// courses to evaluate, and the supporting documentation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub student: Option<StudentId>,
    #[serde(default)]
    pub new_student: Option<NewStudent>,
    pub courses: Vec<CourseId>,
    #[serde(default)]
    pub attachments: Vec<StoredFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub request: RequestId,
    pub items_created: usize,
    pub dispatched: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulingIntake {
    pub status: ItemStatus,
    #[serde(default)]
    pub supplement_topics: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub request: RequestId,
    pub student: String,
    pub opened_at: NaiveDateTime,
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub progress: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub course: CourseId,
    pub course_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    pub status: ItemStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplement_topics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruled_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    pub request: RequestId,
    pub student: String,
    pub identity_document: String,
    pub opened_at: NaiveDateTime,
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub progress: String,
    pub items: Vec<ItemView>,
    /// Every item carries a final ruling.
    pub complete: bool,
    pub has_signed_act: bool,
}

/// Error raised by the equivalence workflow service.
#[derive(Debug, thiserror::Error)]
pub enum EquivalenceServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryServiceError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("student not found")]
    StudentNotFound,
    #[error("request not found")]
    RequestNotFound,
    #[error("request item not found")]
    ItemNotFound,
    #[error("course not found")]
    CourseNotFound,
    #[error("select an existing student or provide a new one")]
    MissingStudent,
    #[error("no courses were selected")]
    NoCoursesSelected,
    #[error("no responsible faculty assigned for {0}")]
    NoResponsible(String),
    #[error("{0} has no primary mail address")]
    MissingPrimaryEmail(String),
    #[error("only regular or ordinary faculty can answer for a course")]
    IneligibleResponsible,
    #[error("{0}")]
    NothingToSend(String),
}

/// Service orchestrating equivalence requests: intake, per-course dispatch,
/// rulings, and the signed-act closeout.
pub struct EquivalenceService<E, D, M> {
    store: Arc<E>,
    directory: Arc<DirectoryService<D>>,
    mail: Arc<M>,
    templates: Box<dyn TemplateStore>,
    notifications: NotificationsConfig,
}

impl<E, D, M> EquivalenceService<E, D, M>
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(
        store: Arc<E>,
        directory: Arc<DirectoryService<D>>,
        mail: Arc<M>,
        templates: Box<dyn TemplateStore>,
        notifications: NotificationsConfig,
    ) -> Self {
        Self {
            store,
            directory,
            mail,
            templates,
            notifications,
        }
    }

    /// Point a course at the faculty member who answers for it. Only
    /// tenure-track faculty qualify.
    pub fn assign_responsible(
        &self,
        course: CourseId,
        responsible: FacultyId,
    ) -> Result<RosterEntry, EquivalenceServiceError> {
        self.directory
            .store()
            .fetch_course(course)?
            .ok_or(EquivalenceServiceError::CourseNotFound)?;
        let eligible = self
            .directory
            .store()
            .positions_of(responsible)?
            .iter()
            .any(|position| position.tenure.tenure_track());
        if !eligible {
            return Err(EquivalenceServiceError::IneligibleResponsible);
        }

        let entry = RosterEntry {
            course,
            responsible: Some(responsible),
        };
        self.store.upsert_roster_entry(entry)?;
        Ok(entry)
    }

    /// Open a request and dispatch one evaluation mail per selected course.
    /// Dispatch failures are collected per item, never fatal.
    pub fn create_request(
        &self,
        intake: CreateRequest,
        now: NaiveDateTime,
    ) -> Result<DispatchOutcome, EquivalenceServiceError> {
        if intake.courses.is_empty() {
            return Err(EquivalenceServiceError::NoCoursesSelected);
        }

        let student = match (intake.student, intake.new_student) {
            (Some(id), _) => self
                .store
                .fetch_student(id)?
                .ok_or(EquivalenceServiceError::StudentNotFound)?,
            (None, Some(new_student)) => self.get_or_create_student(new_student)?,
            (None, None) => return Err(EquivalenceServiceError::MissingStudent),
        };

        let request = self.store.insert_request(EquivalenceRequest {
            id: next_request_id(),
            student: student.id,
            opened_at: now,
            status: RequestStatus::InProgress,
            attachments: intake.attachments,
            signed_act: None,
            completed_at: None,
        })?;

        let mut outcome = DispatchOutcome {
            request: request.id,
            items_created: 0,
            dispatched: 0,
            errors: Vec::new(),
        };

        for course in intake.courses {
            let item = self.store.insert_item(RequestItem {
                id: next_item_id(),
                request: request.id,
                course,
                status: ItemStatus::AwaitingDispatch,
                supplement_topics: None,
                ruled_at: None,
            })?;
            outcome.items_created += 1;

            match self.dispatch_item(&request, &student, &item, now.date()) {
                Ok(()) => {
                    let mut sent = item;
                    sent.status = ItemStatus::SentToFaculty;
                    self.store.update_item(sent)?;
                    outcome.dispatched += 1;
                }
                Err(err) => {
                    warn!(request = request.id.0, course = course.0, %err, "dispatch failed");
                    outcome.errors.push(err.to_string());
                }
            }
        }

        info!(
            request = request.id.0,
            items = outcome.items_created,
            dispatched = outcome.dispatched,
            "equivalence request opened"
        );
        Ok(outcome)
    }

    fn get_or_create_student(
        &self,
        intake: NewStudent,
    ) -> Result<Student, EquivalenceServiceError> {
        let identity = intake.identity_document.trim().to_string();
        if let Some(existing) = self.store.find_student_by_identity(&identity)? {
            return Ok(existing);
        }
        Ok(self.store.insert_student(Student {
            id: next_student_id(),
            full_name: intake.full_name.trim().to_string(),
            email: intake.email.map(|address| address.trim().to_lowercase()),
            identity_document: identity,
        })?)
    }

    /// Generate the evaluation sheet and mail the course's responsible
    /// faculty the full documentation set.
    fn dispatch_item(
        &self,
        request: &EquivalenceRequest,
        student: &Student,
        item: &RequestItem,
        today: NaiveDate,
    ) -> Result<(), EquivalenceServiceError> {
        let course = self
            .directory
            .store()
            .fetch_course(item.course)?
            .ok_or(EquivalenceServiceError::CourseNotFound)?;

        let responsible = self
            .store
            .roster_entry(item.course)?
            .and_then(|entry| entry.responsible)
            .ok_or_else(|| EquivalenceServiceError::NoResponsible(course.display_name()))?;
        let faculty = self
            .directory
            .store()
            .fetch_faculty(responsible)?
            .ok_or(RepositoryError::NotFound)?;
        let recipient = self
            .directory
            .primary_email(responsible)?
            .ok_or_else(|| {
                EquivalenceServiceError::MissingPrimaryEmail(faculty.display_name())
            })?;

        let mut sheet = self
            .templates
            .template(EVALUATION_SHEET_TEMPLATE)?
            .ok_or_else(|| {
                DocumentError::Storage("evaluation sheet template missing".to_string())
            })?;
        substitute(
            &mut sheet,
            &[
                ("[fecha]", long_date(today)),
                ("[alumno]", student.full_name.clone()),
                ("[asignatura]", course.display_name()),
            ],
        );
        let sheet_bytes = self.templates.render(&sheet, None)?;

        let mut attachments: Vec<MailAttachment> = request
            .attachments
            .iter()
            .map(|file| MailAttachment {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            })
            .collect();
        attachments.push(MailAttachment {
            filename: format!(
                "Sheet_{}_{}.docx",
                student.identity_document,
                course.display_name().replace(' ', "_")
            ),
            content_type: DOCX_CONTENT_TYPE.to_string(),
            bytes: sheet_bytes,
        });

        let body = format!(
            "<p>Dear Professor,</p>\
             <p>Please find attached the documentation to evaluate, if appropriate, the credit \
             equivalence for <strong>{course}</strong> requested by the incoming student \
             <strong>{student}</strong>.</p>\
             <p>Kindly reply to this same message with your ruling. There is no need to return \
             the attached files.</p>\
             <p>{department}<br>{institution}</p>",
            course = course.display_name(),
            student = student.full_name,
            department = self.notifications.department,
            institution = self.notifications.institution,
        );

        self.mail.send(MailMessage {
            to: recipient,
            subject: format!("Credit Equivalence Request - {}", student.full_name),
            body,
            html: true,
            attachments,
        })?;
        Ok(())
    }

    /// Record a ruling on one item. Supplement topics survive only the
    /// `RequiresSupplement` state; non-final states clear the ruling stamp.
    pub fn record_ruling(
        &self,
        item_id: ItemId,
        intake: RulingIntake,
        now: NaiveDateTime,
    ) -> Result<RequestItem, EquivalenceServiceError> {
        let mut item = self.item(item_id)?;

        item.status = intake.status;
        item.supplement_topics = match intake.status {
            ItemStatus::RequiresSupplement => intake.supplement_topics,
            _ => None,
        };
        item.ruled_at = intake.status.is_final().then_some(now);

        self.store.update_item(item.clone())?;
        Ok(item)
    }

    /// Redispatch a single item to its responsible faculty.
    pub fn resend_item(&self, item_id: ItemId) -> Result<(), EquivalenceServiceError> {
        let item = self.item(item_id)?;
        let request = self.request(item.request)?;
        let student = self
            .store
            .fetch_student(request.student)?
            .ok_or(EquivalenceServiceError::StudentNotFound)?;
        self.dispatch_item(&request, &student, &item, chrono::Local::now().date_naive())
    }

    /// Redispatch every item still waiting on a faculty answer.
    pub fn resend_pending(
        &self,
        request_id: RequestId,
    ) -> Result<DispatchOutcome, EquivalenceServiceError> {
        let request = self.request(request_id)?;
        let student = self
            .store
            .fetch_student(request.student)?
            .ok_or(EquivalenceServiceError::StudentNotFound)?;

        let pending: Vec<RequestItem> = self
            .store
            .items_of(request_id)?
            .into_iter()
            .filter(|item| item.status == ItemStatus::SentToFaculty)
            .collect();
        if pending.is_empty() {
            return Err(EquivalenceServiceError::NothingToSend(
                "no items are waiting on a faculty answer".to_string(),
            ));
        }

        let mut outcome = DispatchOutcome {
            request: request_id,
            items_created: 0,
            dispatched: 0,
            errors: Vec::new(),
        };
        for item in pending {
            match self.dispatch_item(&request, &student, &item, chrono::Local::now().date_naive())
            {
                Ok(()) => outcome.dispatched += 1,
                Err(err) => outcome.errors.push(err.to_string()),
            }
        }
        Ok(outcome)
    }

    /// Close out the request: store the signed act, forward it to the
    /// registrar, and archive the request as completed.
    pub fn finalize(
        &self,
        request_id: RequestId,
        signed_act: StoredFile,
        now: NaiveDateTime,
    ) -> Result<EquivalenceRequest, EquivalenceServiceError> {
        let mut request = self.request(request_id)?;
        let student = self
            .store
            .fetch_student(request.student)?
            .ok_or(EquivalenceServiceError::StudentNotFound)?;

        self.mail.send(MailMessage {
            to: self.notifications.registrar_email.clone(),
            subject: format!("Equivalence Ruling - {}", student.full_name),
            body: "Attached is the final equivalence act for filing in the student's record."
                .to_string(),
            html: false,
            attachments: vec![MailAttachment {
                filename: signed_act.filename.clone(),
                content_type: signed_act.content_type.clone(),
                bytes: signed_act.bytes.clone(),
            }],
        })?;

        request.signed_act = Some(signed_act);
        request.status = RequestStatus::Completed;
        request.completed_at = Some(now);
        self.store.update_request(request.clone())?;

        info!(request = request_id.0, "equivalence request completed");
        Ok(request)
    }

    /// Dashboard rows: optional student-name filter, completed requests
    /// sorted after the in-progress ones, then by opening date.
    pub fn dashboard(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<RequestSummary>, EquivalenceServiceError> {
        let needle = search
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let mut rows = Vec::new();
        for request in self.store.list_requests()? {
            let student = self
                .store
                .fetch_student(request.student)?
                .ok_or(RepositoryError::NotFound)?;
            if let Some(needle) = &needle {
                if !student.full_name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            let items = self.store.items_of(request.id)?;
            rows.push(RequestSummary {
                request: request.id,
                student: student.full_name,
                opened_at: request.opened_at,
                status: request.status,
                status_label: request.status.label(),
                progress: progress(&items),
            });
        }

        rows.sort_by(|a, b| {
            let rank = |status: RequestStatus| matches!(status, RequestStatus::Completed) as u8;
            rank(a.status)
                .cmp(&rank(b.status))
                .then(a.opened_at.cmp(&b.opened_at))
        });
        Ok(rows)
    }

    pub fn detail(&self, request_id: RequestId) -> Result<RequestDetail, EquivalenceServiceError> {
        let request = self.request(request_id)?;
        let student = self
            .store
            .fetch_student(request.student)?
            .ok_or(EquivalenceServiceError::StudentNotFound)?;
        let items = self.store.items_of(request_id)?;

        let mut views = Vec::with_capacity(items.len());
        for item in &items {
            let course = self
                .directory
                .store()
                .fetch_course(item.course)?
                .ok_or(RepositoryError::NotFound)?;
            let responsible = match self
                .store
                .roster_entry(item.course)?
                .and_then(|entry| entry.responsible)
            {
                Some(id) => self
                    .directory
                    .store()
                    .fetch_faculty(id)?
                    .map(|faculty| faculty.display_name()),
                None => None,
            };
            views.push(ItemView {
                id: item.id,
                course: item.course,
                course_name: course.display_name(),
                responsible,
                status: item.status,
                status_label: item.status.label(),
                supplement_topics: item.supplement_topics.clone(),
                ruled_at: item.ruled_at,
            });
        }

        let complete = !items.is_empty() && items.iter().all(|item| item.status.is_final());
        Ok(RequestDetail {
            request: request.id,
            student: student.full_name,
            identity_document: student.identity_document,
            opened_at: request.opened_at,
            status: request.status,
            status_label: request.status.label(),
            progress: progress(&items),
            items: views,
            complete,
            has_signed_act: request.signed_act.is_some(),
        })
    }

    /// Aggregate statistics, either for one year or averaged across history.
    pub fn statistics(
        &self,
        year: Option<i32>,
    ) -> Result<EquivalenceStatistics, EquivalenceServiceError> {
        let requests = self.store.list_requests()?;
        let items = self.store.list_items()?;

        let mut course_names = std::collections::HashMap::new();
        for course in self.directory.store().list_courses()? {
            course_names.insert(course.id, course.display_name());
        }

        Ok(stats::compute(&requests, &items, &course_names, year))
    }

    fn request(&self, id: RequestId) -> Result<EquivalenceRequest, EquivalenceServiceError> {
        self.store
            .fetch_request(id)?
            .ok_or(EquivalenceServiceError::RequestNotFound)
    }

    fn item(&self, id: ItemId) -> Result<RequestItem, EquivalenceServiceError> {
        self.store
            .fetch_item(id)?
            .ok_or(EquivalenceServiceError::ItemNotFound)
    }
}
