//! Shared in-memory fixtures driving the dossier service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::config::NotificationsConfig;
use crate::workflows::directory::{
    Category, Course, CourseId, Dedication, DeliveryTerm, DirectoryService, DirectoryStore,
    EmailContact, Faculty, FacultyId, NewCourse, NewFaculty, NewPosition, Position, PositionId,
    RepositoryError, Resolution, ResolutionId, StoredFile, Tenure,
};
use crate::workflows::dossier::committee::Committee;
use crate::workflows::dossier::documents::{
    DocumentError, Letterhead, MailError, MailMessage, MailTransport, MergedPdf, PdfMergeError,
    PdfMerger, PdfPart, TemplateDocument, TemplateStore,
};
use crate::workflows::dossier::domain::{
    Dossier, DossierId, Evaluation, EvaluationId, Form, FormId, FormKind,
};
use crate::workflows::dossier::repository::DossierStore;
use crate::workflows::dossier::service::DossierService;

#[derive(Default, Clone)]
pub(crate) struct MemoryDirectory {
    faculty: Arc<Mutex<HashMap<FacultyId, Faculty>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    positions: Arc<Mutex<HashMap<PositionId, Position>>>,
    emails: Arc<Mutex<Vec<EmailContact>>>,
    resolutions: Arc<Mutex<HashMap<ResolutionId, Resolution>>>,
}

impl DirectoryStore for MemoryDirectory {
    fn insert_faculty(&self, faculty: Faculty) -> Result<Faculty, RepositoryError> {
        let mut guard = self.faculty.lock().expect("directory mutex poisoned");
        if guard.contains_key(&faculty.id) {
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
pub(crate) struct MemoryDossiers {
    dossiers: Arc<Mutex<HashMap<DossierId, Dossier>>>,
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
    evaluations: Arc<Mutex<HashMap<EvaluationId, Evaluation>>>,
    committees: Arc<Mutex<HashMap<DossierId, Committee>>>,
}

impl DossierStore for MemoryDossiers {
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
pub(crate) struct RecordingMailbox {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl RecordingMailbox {
    pub(crate) fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mailbox mutex poisoned").clone()
    }
}

impl MailTransport for RecordingMailbox {
    fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailbox mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Template library with a fixed set of masters and letterheads; rendering
/// serializes the document model to JSON bytes.
#[derive(Default)]
pub(crate) struct StaticTemplates {
    pub(crate) templates: HashMap<String, TemplateDocument>,
    pub(crate) files: HashMap<String, StoredFile>,
    pub(crate) letterheads: HashMap<i32, Letterhead>,
}

impl TemplateStore for StaticTemplates {
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
        serde_json::to_vec(document).map_err(|err| DocumentError::Render(err.to_string()))
    }
}

/// Concatenates parts that look like PDFs and reports the rest as skipped.
#[derive(Default)]
pub(crate) struct ConcatMerger;

impl PdfMerger for ConcatMerger {
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

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(crate) fn pdf_file(name: &str) -> StoredFile {
    StoredFile {
        filename: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

pub(crate) fn notifications() -> NotificationsConfig {
    NotificationsConfig {
        department: "Civil Engineering Department".to_string(),
        institution: "UTN-FRLP".to_string(),
        registrar_email: "student.records@frlp.utn.edu.ar".to_string(),
    }
}

fn form_template() -> TemplateDocument {
    TemplateDocument {
        paragraphs: vec![
            "Report of [DOCENTE_NOMBRE] ([CARGO], [DEDICACION])".to_string(),
            "Course [ASIGNATURA], year [ANIO_LECTIVO], issued [FECHA_GENERACION]".to_string(),
        ],
        tables: vec![vec![vec!["Sections: [COMISIONES]".to_string()]]],
        header: vec!["[LOGO_ANUAL]".to_string(), "[FRASE_ANUAL]".to_string()],
    }
}

pub(crate) fn template_library(years: &[i32]) -> StaticTemplates {
    let mut templates = StaticTemplates::default();
    for kind in [
        FormKind::F04,
        FormKind::F05,
        FormKind::F06,
        FormKind::F07,
        FormKind::F13,
        FormKind::Survey,
    ] {
        templates
            .templates
            .insert(kind.code().to_string(), form_template());
    }
    templates.templates.insert(
        crate::workflows::dossier::documents::EVALUATION_SHEET_TEMPLATE.to_string(),
        TemplateDocument {
            paragraphs: vec![
                "La Plata, [fecha]".to_string(),
                "Estudiante: [alumno]".to_string(),
            ],
            tables: vec![vec![vec!["Asignatura: [asignatura]".to_string()]]],
            header: Vec::new(),
        },
    );
    templates.files.insert(
        FormKind::F02.code().to_string(),
        StoredFile {
            filename: "F02_master.docx".to_string(),
            content_type:
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            bytes: b"F02 master payload".to_vec(),
        },
    );
    for &year in years {
        templates.letterheads.insert(
            year,
            Letterhead {
                year,
                logo: vec![0x89, 0x50, 0x4e, 0x47],
                phrase: format!("Institutional motto {year}"),
            },
        );
    }
    templates
}

pub(crate) struct Fixture {
    pub(crate) directory: Arc<DirectoryService<MemoryDirectory>>,
    pub(crate) store: Arc<MemoryDossiers>,
    pub(crate) service: DossierService<MemoryDirectory, MemoryDossiers, RecordingMailbox>,
    pub(crate) mailbox: RecordingMailbox,
    pub(crate) faculty: FacultyId,
    pub(crate) position: PositionId,
}

/// A regular adjunct appointment on a five-year term, with a primary mailbox
/// and the full template library.
pub(crate) fn fixture() -> Fixture {
    fixture_with(Tenure::Regular, Dedication::Simple)
}

pub(crate) fn fixture_with(tenure: Tenure, dedication: Dedication) -> Fixture {
    fixture_with_library(tenure, dedication, &[2020, 2021, 2022, 2023, 2024, 2025])
}

pub(crate) fn fixture_with_library(
    tenure: Tenure,
    dedication: Dedication,
    letterhead_years: &[i32],
) -> Fixture {
    let directory = Arc::new(DirectoryService::new(Arc::new(MemoryDirectory::default())));
    let faculty = directory
        .register_faculty(NewFaculty {
            given_name: "Juan".to_string(),
            surname: "Perez".to_string(),
            national_id: 28_111_222,
            payroll_id: 4_410,
            birth_date: date(1980, 1, 1),
        })
        .expect("faculty registers");
    directory
        .add_email(faculty.id, "JPerez@frlp.utn.edu.ar", true)
        .expect("mailbox registers");
    let course = directory
        .register_course(NewCourse {
            name: "Structural Analysis".to_string(),
            department: "civil".to_string(),
            speciality: "civil".to_string(),
            level: Some("III".to_string()),
            weekly_hours: 6,
            total_hours: 144,
            delivery: DeliveryTerm::Annual,
            mandatory: true,
            score: 0,
        })
        .expect("course registers");
    let position = directory
        .register_position(NewPosition {
            faculty: faculty.id,
            course: course.id,
            tenure,
            category: Category::Adjunct,
            dedication,
            weekly_load: 1.0,
            start: date(2020, 3, 1),
            end: None,
            expiry: Some(date(2025, 3, 1)),
        })
        .expect("position registers");

    let mailbox = RecordingMailbox::default();
    let store = Arc::new(MemoryDossiers::default());
    let service = DossierService::new(
        directory.clone(),
        store.clone(),
        Arc::new(mailbox.clone()),
        Box::new(template_library(letterhead_years)),
        Box::new(ConcatMerger),
        notifications(),
    );

    Fixture {
        directory,
        store,
        service,
        mailbox,
        faculty: faculty.id,
        position: position.id,
    }
}
