//! End-to-end scenarios for the dossier workflow, exercised through the
//! public service facade and the HTTP router so lifecycle rules, checklist
//! bookkeeping, and notifications are validated without reaching into
//! private modules.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use tenure_track::config::NotificationsConfig;
    use tenure_track::workflows::directory::{
        Category, Course, CourseId, Dedication, DeliveryTerm, DirectoryService, DirectoryStore,
        EmailContact, Faculty, FacultyId, NewCourse, NewFaculty, NewPosition, Position,
        PositionId, RepositoryError, Resolution, ResolutionId, StoredFile, Tenure,
    };
    use tenure_track::workflows::dossier::{
        Committee, DocumentError, Dossier, DossierId, DossierService, DossierStore, Evaluation,
        EvaluationId, Form, FormId, Letterhead, MailError, MailMessage, MailTransport, MergedPdf,
        PdfMergeError, PdfMerger, PdfPart, TemplateDocument, TemplateStore,
    };

    #[derive(Default, Clone)]
    pub(super) struct MemoryDirectory {
        faculty: Arc<Mutex<HashMap<FacultyId, Faculty>>>,
        courses: Arc<Mutex<HashMap<CourseId, Course>>>,
        positions: Arc<Mutex<HashMap<PositionId, Position>>>,
        emails: Arc<Mutex<Vec<EmailContact>>>,
        resolutions: Arc<Mutex<HashMap<ResolutionId, Resolution>>>,
    }

    impl DirectoryStore for MemoryDirectory {
        fn insert_faculty(&self, faculty: Faculty) -> Result<Faculty, RepositoryError> {
            self.faculty
                .lock()
                .expect("lock")
                .insert(faculty.id, faculty.clone());
            Ok(faculty)
        }

        fn fetch_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError> {
            Ok(self.faculty.lock().expect("lock").get(&id).cloned())
        }

        fn list_faculty(&self) -> Result<Vec<Faculty>, RepositoryError> {
            Ok(self.faculty.lock().expect("lock").values().cloned().collect())
        }

        fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
            self.courses
                .lock()
                .expect("lock")
                .insert(course.id, course.clone());
            Ok(course)
        }

        fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
            Ok(self.courses.lock().expect("lock").get(&id).cloned())
        }

        fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
            Ok(self.courses.lock().expect("lock").values().cloned().collect())
        }

        fn insert_position(&self, position: Position) -> Result<Position, RepositoryError> {
            self.positions
                .lock()
                .expect("lock")
                .insert(position.id, position.clone());
            Ok(position)
        }

        fn update_position(&self, position: Position) -> Result<(), RepositoryError> {
            self.positions
                .lock()
                .expect("lock")
                .insert(position.id, position);
            Ok(())
        }

        fn fetch_position(&self, id: PositionId) -> Result<Option<Position>, RepositoryError> {
            Ok(self.positions.lock().expect("lock").get(&id).cloned())
        }

        fn positions_of(&self, faculty: FacultyId) -> Result<Vec<Position>, RepositoryError> {
            Ok(self
                .positions
                .lock()
                .expect("lock")
                .values()
                .filter(|position| position.faculty == faculty)
                .cloned()
                .collect())
        }

        fn list_positions(&self) -> Result<Vec<Position>, RepositoryError> {
            Ok(self
                .positions
                .lock()
                .expect("lock")
                .values()
                .cloned()
                .collect())
        }

        fn upsert_email(&self, contact: EmailContact) -> Result<(), RepositoryError> {
            let mut guard = self.emails.lock().expect("lock");
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
                .expect("lock")
                .iter()
                .filter(|entry| entry.faculty == faculty)
                .cloned()
                .collect())
        }

        fn insert_resolution(
            &self,
            resolution: Resolution,
        ) -> Result<Resolution, RepositoryError> {
            self.resolutions
                .lock()
                .expect("lock")
                .insert(resolution.id, resolution.clone());
            Ok(resolution)
        }

        fn fetch_resolution(
            &self,
            id: ResolutionId,
        ) -> Result<Option<Resolution>, RepositoryError> {
            Ok(self.resolutions.lock().expect("lock").get(&id).cloned())
        }

        fn resolutions_of(
            &self,
            position: PositionId,
        ) -> Result<Vec<Resolution>, RepositoryError> {
            Ok(self
                .resolutions
                .lock()
                .expect("lock")
                .values()
                .filter(|resolution| resolution.position == position)
                .cloned()
                .collect())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryDossiers {
        dossiers: Arc<Mutex<HashMap<DossierId, Dossier>>>,
        forms: Arc<Mutex<HashMap<FormId, Form>>>,
        evaluations: Arc<Mutex<HashMap<EvaluationId, Evaluation>>>,
        committees: Arc<Mutex<HashMap<DossierId, Committee>>>,
    }

    impl DossierStore for MemoryDossiers {
        fn insert_dossier(&self, dossier: Dossier) -> Result<Dossier, RepositoryError> {
            self.dossiers
                .lock()
                .expect("lock")
                .insert(dossier.id, dossier.clone());
            Ok(dossier)
        }

        fn update_dossier(&self, dossier: Dossier) -> Result<(), RepositoryError> {
            self.dossiers
                .lock()
                .expect("lock")
                .insert(dossier.id, dossier);
            Ok(())
        }

        fn fetch_dossier(&self, id: DossierId) -> Result<Option<Dossier>, RepositoryError> {
            Ok(self.dossiers.lock().expect("lock").get(&id).cloned())
        }

        fn dossier_for_position(
            &self,
            position: PositionId,
        ) -> Result<Option<Dossier>, RepositoryError> {
            Ok(self
                .dossiers
                .lock()
                .expect("lock")
                .values()
                .find(|dossier| dossier.position == position)
                .cloned())
        }

        fn find_by_docket(&self, docket: &str) -> Result<Option<Dossier>, RepositoryError> {
            Ok(self
                .dossiers
                .lock()
                .expect("lock")
                .values()
                .find(|dossier| dossier.docket.as_deref() == Some(docket))
                .cloned())
        }

        fn list_dossiers(&self) -> Result<Vec<Dossier>, RepositoryError> {
            Ok(self
                .dossiers
                .lock()
                .expect("lock")
                .values()
                .cloned()
                .collect())
        }

        fn insert_form(&self, form: Form) -> Result<Form, RepositoryError> {
            self.forms.lock().expect("lock").insert(form.id, form.clone());
            Ok(form)
        }

        fn update_form(&self, form: Form) -> Result<(), RepositoryError> {
            self.forms.lock().expect("lock").insert(form.id, form);
            Ok(())
        }

        fn fetch_form(&self, id: FormId) -> Result<Option<Form>, RepositoryError> {
            Ok(self.forms.lock().expect("lock").get(&id).cloned())
        }

        fn forms_of(&self, dossier: DossierId) -> Result<Vec<Form>, RepositoryError> {
            let mut forms: Vec<Form> = self
                .forms
                .lock()
                .expect("lock")
                .values()
                .filter(|form| form.dossier == dossier)
                .cloned()
                .collect();
            forms.sort_by_key(|form| form.id);
            Ok(forms)
        }

        fn insert_evaluation(
            &self,
            evaluation: Evaluation,
        ) -> Result<Evaluation, RepositoryError> {
            self.evaluations
                .lock()
                .expect("lock")
                .insert(evaluation.id, evaluation.clone());
            Ok(evaluation)
        }

        fn update_evaluation(&self, evaluation: Evaluation) -> Result<(), RepositoryError> {
            self.evaluations
                .lock()
                .expect("lock")
                .insert(evaluation.id, evaluation);
            Ok(())
        }

        fn fetch_evaluation(
            &self,
            id: EvaluationId,
        ) -> Result<Option<Evaluation>, RepositoryError> {
            Ok(self.evaluations.lock().expect("lock").get(&id).cloned())
        }

        fn evaluations_of(
            &self,
            dossier: DossierId,
        ) -> Result<Vec<Evaluation>, RepositoryError> {
            let mut evaluations: Vec<Evaluation> = self
                .evaluations
                .lock()
                .expect("lock")
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
                .expect("lock")
                .insert(committee.dossier, committee);
            Ok(())
        }

        fn committee_of(
            &self,
            dossier: DossierId,
        ) -> Result<Option<Committee>, RepositoryError> {
            Ok(self.committees.lock().expect("lock").get(&dossier).cloned())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct Mailbox {
        sent: Arc<Mutex<Vec<MailMessage>>>,
    }

    impl Mailbox {
        pub(super) fn sent(&self) -> Vec<MailMessage> {
            self.sent.lock().expect("lock").clone()
        }
    }

    impl MailTransport for Mailbox {
        fn send(&self, message: MailMessage) -> Result<(), MailError> {
            self.sent.lock().expect("lock").push(message);
            Ok(())
        }
    }

    pub(super) struct Templates;

    impl TemplateStore for Templates {
        fn template(&self, name: &str) -> Result<Option<TemplateDocument>, DocumentError> {
            if name == "F02" {
                return Ok(None);
            }
            Ok(Some(TemplateDocument {
                paragraphs: vec![format!(
                    "{name} for [DOCENTE_NOMBRE] - [ASIGNATURA] [ANIO_LECTIVO]"
                )],
                tables: Vec::new(),
                header: vec!["[FRASE_ANUAL]".to_string()],
            }))
        }

        fn file(&self, name: &str) -> Result<Option<StoredFile>, DocumentError> {
            if name != "F02" {
                return Ok(None);
            }
            Ok(Some(StoredFile {
                filename: "F02_master.docx".to_string(),
                content_type: "application/octet-stream".to_string(),
                bytes: b"master".to_vec(),
            }))
        }

        fn letterhead(&self, year: i32) -> Result<Option<Letterhead>, DocumentError> {
            Ok(Some(Letterhead {
                year,
                logo: Vec::new(),
                phrase: format!("motto {year}"),
            }))
        }

        fn render(
            &self,
            document: &TemplateDocument,
            _logo: Option<&[u8]>,
        ) -> Result<Vec<u8>, DocumentError> {
            Ok(document.paragraphs.join("\n").into_bytes())
        }
    }

    pub(super) struct Concat;

    impl PdfMerger for Concat {
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

    pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub(super) fn notifications() -> NotificationsConfig {
        NotificationsConfig {
            department: "Civil Engineering Department".to_string(),
            institution: "UTN-FRLP".to_string(),
            registrar_email: "student.records@frlp.utn.edu.ar".to_string(),
        }
    }

    pub(super) struct World {
        pub(super) service:
            Arc<DossierService<MemoryDirectory, MemoryDossiers, Mailbox>>,
        pub(super) mailbox: Mailbox,
        pub(super) position: PositionId,
    }

    /// A regular semi-exclusive appointment over 2020-2025 with a mailbox on
    /// file, ready for dossier operations.
    pub(super) fn world() -> World {
        let directory = Arc::new(DirectoryService::new(Arc::new(MemoryDirectory::default())));
        let faculty = directory
            .register_faculty(NewFaculty {
                given_name: "Laura".to_string(),
                surname: "Benitez".to_string(),
                national_id: 27_900_100,
                payroll_id: 3_301,
                birth_date: date(1978, 11, 2),
            })
            .expect("faculty registers");
        directory
            .add_email(faculty.id, "lbenitez@frlp.utn.edu.ar", true)
            .expect("mailbox registers");
        let course = directory
            .register_course(NewCourse {
                name: "Hydraulics".to_string(),
                department: "civil".to_string(),
                speciality: "civil".to_string(),
                level: Some("IV".to_string()),
                weekly_hours: 5,
                total_hours: 120,
                delivery: DeliveryTerm::Annual,
                mandatory: true,
                score: 0,
            })
            .expect("course registers");
        let position = directory
            .register_position(NewPosition {
                faculty: faculty.id,
                course: course.id,
                tenure: Tenure::Regular,
                category: Category::Associate,
                dedication: Dedication::SemiExclusive,
                weekly_load: 1.0,
                start: date(2020, 3, 1),
                end: None,
                expiry: Some(date(2025, 3, 1)),
            })
            .expect("position registers");

        let mailbox = Mailbox::default();
        let service = Arc::new(DossierService::new(
            directory.clone(),
            Arc::new(MemoryDossiers::default()),
            Arc::new(mailbox.clone()),
            Box::new(Templates),
            Box::new(Concat),
            notifications(),
        ));

        World {
            service,
            mailbox,
            position: position.id,
        }
    }
}

mod lifecycle {
    use super::common::{date, world};
    use tenure_track::workflows::dossier::{DossierStatus, FormKind, OpenDossier};

    #[test]
    fn full_checklist_is_owed_from_day_one() {
        let world = world();
        let dossier = world
            .service
            .open_dossier(OpenDossier {
                position: world.position,
                docket: Some("10001/2020".to_string()),
            })
            .expect("dossier opens");

        assert_eq!(dossier.status, DossierStatus::Active);

        let detail = world
            .service
            .detail(dossier.id, date(2024, 6, 1))
            .expect("detail builds");
        assert!(detail.cv.is_some());
        assert_eq!(detail.one_time_forms.len(), 3);
        // Semi-exclusive dedication owes F13 as well: six annual kinds over
        // 2020-2023 plus the running-year F04.
        assert_eq!(detail.annual_forms.len(), 6 * 4 + 1);
        assert_eq!(detail.pending_years, vec![2020, 2021, 2022, 2023, 2024]);
        assert!(detail.has_remindable_pending);
    }

    #[test]
    fn evaluation_rounds_walk_the_pending_years_down() {
        let world = world();
        let dossier = world
            .service
            .open_dossier(OpenDossier {
                position: world.position,
                docket: None,
            })
            .expect("dossier opens");
        let today = date(2024, 6, 1);

        world
            .service
            .start_evaluation(dossier.id, vec![2020, 2021, 2022], today)
            .expect("first round");
        let second = world
            .service
            .start_evaluation(dossier.id, vec![2023], today)
            .expect("second round");
        assert_eq!(second.number, 2);

        let detail = world.service.detail(dossier.id, today).expect("detail");
        assert_eq!(detail.pending_years, vec![2024]);
        assert_eq!(detail.evaluations.len(), 2);
        let committee_forms = detail
            .evaluation_forms
            .iter()
            .filter(|form| form.kind == FormKind::F08)
            .count();
        assert_eq!(committee_forms, 2);
    }
}

mod http {
    use super::common::world;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tenure_track::workflows::dossier::{dossier_router, OpenDossier};
    use tower::ServiceExt;

    #[tokio::test]
    async fn dossiers_can_be_opened_and_listed_over_http() {
        let world = world();
        let app = dossier_router(world.service.clone());

        let payload = json!({
            "position": world.position.0,
            "docket": "12345/2020",
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/dossiers")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/dossiers?today=2024-06-01")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let board: Value = serde_json::from_slice(&body).expect("body is json");
        let rows = board["rows"].as_array().expect("rows present");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["docket"], "12345/2020");
        assert_eq!(rows[0]["faculty_name"], "BENITEZ, Laura");
    }

    #[tokio::test]
    async fn rule_violations_surface_as_unprocessable() {
        let world = world();
        let app = dossier_router(world.service.clone());

        let payload = json!({
            "position": world.position.0,
            "docket": "12/20",
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/dossiers")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), 1024)
            .await
            .expect("body reads");
        let error: Value = serde_json::from_slice(&body).expect("body is json");
        assert!(error["error"]
            .as_str()
            .expect("error string")
            .contains("NNNNN/YYYY"));
    }

    #[tokio::test]
    async fn faculty_picker_applies_hierarchical_filters() {
        let world = world();
        let app = dossier_router(world.service.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/faculty?category=associate")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let payload: Value = serde_json::from_slice(&body).expect("body is json");
        assert_eq!(payload["faculty"].as_array().expect("array").len(), 1);

        // Filtering for full professors excludes the associate appointment.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/faculty?category=full")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reads");
        let payload: Value = serde_json::from_slice(&body).expect("body is json");
        assert!(payload["faculty"].as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn reminder_endpoint_reports_the_dispatch() {
        let world = world();
        let dossier = world
            .service
            .open_dossier(OpenDossier {
                position: world.position,
                docket: None,
            })
            .expect("dossier opens");
        let app = dossier_router(world.service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/dossiers/{}/reminders", dossier.id.0))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(world.mailbox.sent().len(), 1);
    }
}
