//! In-memory adapters wiring the workflow services to the HTTP runtime:
//! repositories, the mail log, the built-in template library, and the PDF
//! concatenator.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Datelike;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use tenure_track::workflows::directory::{
    Course, CourseId, DirectoryStore, EmailContact, Faculty, FacultyId, Position, PositionId,
    RepositoryError, Resolution, ResolutionId, StoredFile,
};
use tenure_track::workflows::dossier::{
    Committee, DocumentError, Dossier, DossierId, DossierStore, Evaluation, EvaluationId, Form,
    FormId, FormKind, Letterhead, MailError, MailMessage, MailTransport, MergedPdf, PdfMergeError,
    PdfMerger, PdfPart, TemplateDocument, TemplateStore, EVALUATION_SHEET_TEMPLATE,
};
use tenure_track::workflows::equivalence::{
    EquivalenceRequest, EquivalenceStore, ItemId, RequestId, RequestItem, RosterEntry, Student,
    StudentId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDirectoryStore {
    faculty: Arc<Mutex<HashMap<FacultyId, Faculty>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    positions: Arc<Mutex<HashMap<PositionId, Position>>>,
    emails: Arc<Mutex<Vec<EmailContact>>>,
    resolutions: Arc<Mutex<HashMap<ResolutionId, Resolution>>>,
}

impl DirectoryStore for InMemoryDirectoryStore {
    fn insert_faculty(&self, faculty: Faculty) -> Result<Faculty, RepositoryError> {
        let mut guard = self.faculty.lock().expect("directory mutex poisoned");
        if guard.contains_key(&faculty.id)
            || guard
                .values()
                .any(|existing| existing.national_id == faculty.national_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(faculty.id, faculty.clone());
        Ok(faculty)
    }

    fn fetch_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError> {
        Ok(self
            .faculty
            .lock()
            .expect("directory mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list_faculty(&self) -> Result<Vec<Faculty>, RepositoryError> {
        Ok(self
            .faculty
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        let mut guard = self.courses.lock().expect("directory mutex poisoned");
        if guard.contains_key(&course.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(course.id, course.clone());
        Ok(course)
    }

    fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self
            .courses
            .lock()
            .expect("directory mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
        Ok(self
            .courses
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_position(&self, position: Position) -> Result<Position, RepositoryError> {
        let mut guard = self.positions.lock().expect("directory mutex poisoned");
        if guard.contains_key(&position.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(position.id, position.clone());
        Ok(position)
    }

    fn update_position(&self, position: Position) -> Result<(), RepositoryError> {
        let mut guard = self.positions.lock().expect("directory mutex poisoned");
        if !guard.contains_key(&position.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(position.id, position);
        Ok(())
    }

    fn fetch_position(&self, id: PositionId) -> Result<Option<Position>, RepositoryError> {
        Ok(self
            .positions
            .lock()
            .expect("directory mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn positions_of(&self, faculty: FacultyId) -> Result<Vec<Position>, RepositoryError> {
        Ok(self
            .positions
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .filter(|position| position.faculty == faculty)
            .cloned()
            .collect())
    }

    fn list_positions(&self) -> Result<Vec<Position>, RepositoryError> {
        Ok(self
            .positions
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn upsert_email(&self, contact: EmailContact) -> Result<(), RepositoryError> {
        let mut guard = self.emails.lock().expect("directory mutex poisoned");
        if let Some(existing) = guard
            .iter_mut()
            .find(|entry| entry.faculty == contact.faculty && entry.address == contact.address)
        {
            *existing = contact;
        } else {
            guard.push(contact);
        }
        Ok(())
    }

    fn emails_of(&self, faculty: FacultyId) -> Result<Vec<EmailContact>, RepositoryError> {
        Ok(self
            .emails
            .lock()
            .expect("directory mutex poisoned")
            .iter()
            .filter(|entry| entry.faculty == faculty)
            .cloned()
            .collect())
    }

    fn insert_resolution(&self, resolution: Resolution) -> Result<Resolution, RepositoryError> {
        let mut guard = self.resolutions.lock().expect("directory mutex poisoned");
        if guard.contains_key(&resolution.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(resolution.id, resolution.clone());
        Ok(resolution)
    }

    fn fetch_resolution(
        &self,
        id: ResolutionId,
    ) -> Result<Option<Resolution>, RepositoryError> {
        Ok(self
            .resolutions
            .lock()
            .expect("directory mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn resolutions_of(&self, position: PositionId) -> Result<Vec<Resolution>, RepositoryError> {
        Ok(self
            .resolutions
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .filter(|resolution| resolution.position == position)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDossierStore {
    dossiers: Arc<Mutex<HashMap<DossierId, Dossier>>>,
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
    evaluations: Arc<Mutex<HashMap<EvaluationId, Evaluation>>>,
    committees: Arc<Mutex<HashMap<DossierId, Committee>>>,
}

impl DossierStore for InMemoryDossierStore {
    fn insert_dossier(&self, dossier: Dossier) -> Result<Dossier, RepositoryError> {
        let mut guard = self.dossiers.lock().expect("dossier mutex poisoned");
        if guard.contains_key(&dossier.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(dossier.id, dossier.clone());
        Ok(dossier)
    }

    fn update_dossier(&self, dossier: Dossier) -> Result<(), RepositoryError> {
        let mut guard = self.dossiers.lock().expect("dossier mutex poisoned");
        if !guard.contains_key(&dossier.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(dossier.id, dossier);
        Ok(())
    }

    fn fetch_dossier(&self, id: DossierId) -> Result<Option<Dossier>, RepositoryError> {
        Ok(self
            .dossiers
            .lock()
            .expect("dossier mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn dossier_for_position(
        &self,
        position: PositionId,
    ) -> Result<Option<Dossier>, RepositoryError> {
        Ok(self
            .dossiers
            .lock()
            .expect("dossier mutex poisoned")
            .values()
            .find(|dossier| dossier.position == position)
            .cloned())
    }

    fn find_by_docket(&self, docket: &str) -> Result<Option<Dossier>, RepositoryError> {
        Ok(self
            .dossiers
            .lock()
            .expect("dossier mutex poisoned")
            .values()
            .find(|dossier| dossier.docket.as_deref() == Some(docket))
            .cloned())
    }

    fn list_dossiers(&self) -> Result<Vec<Dossier>, RepositoryError> {
        Ok(self
            .dossiers
            .lock()
            .expect("dossier mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_form(&self, form: Form) -> Result<Form, RepositoryError> {
        let mut guard = self.forms.lock().expect("dossier mutex poisoned");
        if guard.contains_key(&form.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(form.id, form.clone());
        Ok(form)
    }

    fn update_form(&self, form: Form) -> Result<(), RepositoryError> {
        let mut guard = self.forms.lock().expect("dossier mutex poisoned");
        if !guard.contains_key(&form.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(form.id, form);
        Ok(())
    }

    fn fetch_form(&self, id: FormId) -> Result<Option<Form>, RepositoryError> {
        Ok(self
            .forms
            .lock()
            .expect("dossier mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn forms_of(&self, dossier: DossierId) -> Result<Vec<Form>, RepositoryError> {
        let mut forms: Vec<Form> = self
            .forms
            .lock()
            .expect("dossier mutex poisoned")
            .values()
            .filter(|form| form.dossier == dossier)
            .cloned()
            .collect();
        forms.sort_by_key(|form| form.id);
        Ok(forms)
    }

    fn insert_evaluation(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.evaluations.lock().expect("dossier mutex poisoned");
        if guard.contains_key(&evaluation.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(evaluation.id, evaluation.clone());
        Ok(evaluation)
    }

    fn update_evaluation(&self, evaluation: Evaluation) -> Result<(), RepositoryError> {
        let mut guard = self.evaluations.lock().expect("dossier mutex poisoned");
        if !guard.contains_key(&evaluation.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(evaluation.id, evaluation);
        Ok(())
    }

    fn fetch_evaluation(
        &self,
        id: EvaluationId,
    ) -> Result<Option<Evaluation>, RepositoryError> {
        Ok(self
            .evaluations
            .lock()
            .expect("dossier mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn evaluations_of(&self, dossier: DossierId) -> Result<Vec<Evaluation>, RepositoryError> {
        let mut evaluations: Vec<Evaluation> = self
            .evaluations
            .lock()
            .expect("dossier mutex poisoned")
            .values()
            .filter(|evaluation| evaluation.dossier == dossier)
            .cloned()
            .collect();
        evaluations.sort_by_key(|evaluation| evaluation.number);
        Ok(evaluations)
    }

    fn upsert_committee(&self, committee: Committee) -> Result<(), RepositoryError> {
        self.committees
            .lock()
            .expect("dossier mutex poisoned")
            .insert(committee.dossier, committee);
        Ok(())
    }

    fn committee_of(&self, dossier: DossierId) -> Result<Option<Committee>, RepositoryError> {
        Ok(self
            .committees
            .lock()
            .expect("dossier mutex poisoned")
            .get(&dossier)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEquivalenceStore {
    students: Arc<Mutex<HashMap<StudentId, Student>>>,
    requests: Arc<Mutex<HashMap<RequestId, EquivalenceRequest>>>,
    items: Arc<Mutex<HashMap<ItemId, RequestItem>>>,
    roster: Arc<Mutex<HashMap<CourseId, RosterEntry>>>,
}

impl EquivalenceStore for InMemoryEquivalenceStore {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut guard = self.students.lock().expect("equivalence mutex poisoned");
        if guard.contains_key(&student.id)
            || guard
                .values()
                .any(|existing| existing.identity_document == student.identity_document)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(student.id, student.clone());
        Ok(student)
    }

    fn fetch_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self
            .students
            .lock()
            .expect("equivalence mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn find_student_by_identity(
        &self,
        identity_document: &str,
    ) -> Result<Option<Student>, RepositoryError> {
        Ok(self
            .students
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .find(|student| student.identity_document == identity_document)
            .cloned())
    }

    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self
            .students
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_request(
        &self,
        request: EquivalenceRequest,
    ) -> Result<EquivalenceRequest, RepositoryError> {
        let mut guard = self.requests.lock().expect("equivalence mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.id, request.clone());
        Ok(request)
    }

    fn update_request(&self, request: EquivalenceRequest) -> Result<(), RepositoryError> {
        let mut guard = self.requests.lock().expect("equivalence mutex poisoned");
        if !guard.contains_key(&request.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(request.id, request);
        Ok(())
    }

    fn fetch_request(
        &self,
        id: RequestId,
    ) -> Result<Option<EquivalenceRequest>, RepositoryError> {
        Ok(self
            .requests
            .lock()
            .expect("equivalence mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list_requests(&self) -> Result<Vec<EquivalenceRequest>, RepositoryError> {
        Ok(self
            .requests
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn insert_item(&self, item: RequestItem) -> Result<RequestItem, RepositoryError> {
        let mut guard = self.items.lock().expect("equivalence mutex poisoned");
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(item.id, item.clone());
        Ok(item)
    }

    fn update_item(&self, item: RequestItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().expect("equivalence mutex poisoned");
        if !guard.contains_key(&item.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(item.id, item);
        Ok(())
    }

    fn fetch_item(&self, id: ItemId) -> Result<Option<RequestItem>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .expect("equivalence mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn items_of(&self, request: RequestId) -> Result<Vec<RequestItem>, RepositoryError> {
        let mut items: Vec<RequestItem> = self
            .items
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .filter(|item| item.request == request)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    fn list_items(&self) -> Result<Vec<RequestItem>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn upsert_roster_entry(&self, entry: RosterEntry) -> Result<(), RepositoryError> {
        self.roster
            .lock()
            .expect("equivalence mutex poisoned")
            .insert(entry.course, entry);
        Ok(())
    }

    fn roster_entry(&self, course: CourseId) -> Result<Option<RosterEntry>, RepositoryError> {
        Ok(self
            .roster
            .lock()
            .expect("equivalence mutex poisoned")
            .get(&course)
            .cloned())
    }

    fn list_roster(&self) -> Result<Vec<RosterEntry>, RepositoryError> {
        Ok(self
            .roster
            .lock()
            .expect("equivalence mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

/// Mail transport that records messages and logs the delivery. A real SMTP
/// adapter plugs in behind the same trait.
#[derive(Default, Clone)]
pub(crate) struct MailLog {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl MailLog {
    #[allow(dead_code)]
    pub(crate) fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mail mutex poisoned").clone()
    }
}

impl MailTransport for MailLog {
    fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "outbound mail recorded"
        );
        self.sent
            .lock()
            .expect("mail mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Built-in template library: placeholder-bearing masters for every generated
/// kind, an F02 master file, the evaluation sheet, and letterheads for the
/// years around now. Rendering serializes the document model to JSON.
pub(crate) struct BuiltinTemplates {
    templates: HashMap<String, TemplateDocument>,
    files: HashMap<String, StoredFile>,
    letterheads: HashMap<i32, Letterhead>,
}

impl BuiltinTemplates {
    pub(crate) fn new(current_year: i32) -> Self {
        let mut templates = HashMap::new();
        for kind in [
            FormKind::F04,
            FormKind::F05,
            FormKind::F06,
            FormKind::F07,
            FormKind::F13,
            FormKind::Survey,
        ] {
            templates.insert(
                kind.code().to_string(),
                TemplateDocument {
                    paragraphs: vec![
                        format!("{} - [DOCENTE_NOMBRE]", kind.label()),
                        "Appointment: [CARGO], dedication [DEDICACION]".to_string(),
                        "Course [ASIGNATURA], academic year [ANIO_LECTIVO]".to_string(),
                        "Issued on [FECHA_GENERACION]".to_string(),
                    ],
                    tables: vec![vec![vec!["Sections: [COMISIONES]".to_string()]]],
                    header: vec!["[LOGO_ANUAL]".to_string(), "[FRASE_ANUAL]".to_string()],
                },
            );
        }
        templates.insert(
            EVALUATION_SHEET_TEMPLATE.to_string(),
            TemplateDocument {
                paragraphs: vec![
                    "La Plata, [fecha]".to_string(),
                    "Planilla de evaluación de equivalencia".to_string(),
                    "Estudiante: [alumno]".to_string(),
                ],
                tables: vec![vec![vec![
                    "Asignatura: [asignatura]".to_string(),
                    "Dictamen:".to_string(),
                ]]],
                header: Vec::new(),
            },
        );

        let mut files = HashMap::new();
        files.insert(
            FormKind::F02.code().to_string(),
            StoredFile {
                filename: "F02_master.docx".to_string(),
                content_type: mime_guess::from_path("F02_master.docx")
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string(),
                bytes: b"F02 master template".to_vec(),
            },
        );

        let mut letterheads = HashMap::new();
        for year in (current_year - 6)..=current_year {
            letterheads.insert(
                year,
                Letterhead {
                    year,
                    logo: Vec::new(),
                    phrase: format!("Academic year {year}"),
                },
            );
        }

        Self {
            templates,
            files,
            letterheads,
        }
    }
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self::new(chrono::Local::now().year())
    }
}

impl TemplateStore for BuiltinTemplates {
    fn template(&self, name: &str) -> Result<Option<TemplateDocument>, DocumentError> {
        Ok(self.templates.get(name).cloned())
    }

    fn file(&self, name: &str) -> Result<Option<StoredFile>, DocumentError> {
        Ok(self.files.get(name).cloned())
    }

    fn letterhead(&self, year: i32) -> Result<Option<Letterhead>, DocumentError> {
        Ok(self.letterheads.get(&year).cloned())
    }

    fn render(
        &self,
        document: &TemplateDocument,
        _logo: Option<&[u8]>,
    ) -> Result<Vec<u8>, DocumentError> {
        serde_json::to_vec_pretty(document).map_err(|err| DocumentError::Render(err.to_string()))
    }
}

/// Concatenating merger: parts that do not carry the PDF magic are skipped
/// and reported, matching how corrupt uploads were handled upstream.
#[derive(Default)]
pub(crate) struct ConcatPdfMerger;

impl PdfMerger for ConcatPdfMerger {
    fn merge(&self, parts: &[PdfPart]) -> Result<MergedPdf, PdfMergeError> {
        let mut bytes = Vec::new();
        let mut skipped = Vec::new();
        for part in parts {
            if part.bytes.starts_with(b"%PDF") {
                bytes.extend_from_slice(&part.bytes);
            } else {
                skipped.push(part.label.clone());
            }
        }
        Ok(MergedPdf { bytes, skipped })
    }
}
