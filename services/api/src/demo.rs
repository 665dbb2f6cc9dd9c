//! CLI entry points that exercise the workflows without the HTTP server:
//! a roster-export inspection and an end-to-end demo over the in-memory
//! adapters.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use clap::Args;

use tenure_track::config::AppConfig;
use tenure_track::error::AppError;
use tenure_track::workflows::directory::{
    Category, Dedication, DeliveryTerm, DirectoryService, NewCourse, NewFaculty, NewPosition,
    ResolutionAuthority, ResolutionPurpose, RosterImport, StoredFile, Tenure,
};
use tenure_track::workflows::dossier::{
    CommitteeIntake, Constituency, DossierService, ExternalMember, FormStatus, Observer,
    OpenDossier, ResolutionIntake,
};
use tenure_track::workflows::equivalence::{
    CreateRequest, EquivalenceService, ItemStatus, NewStudent, RulingIntake,
};

use crate::infra::{
    BuiltinTemplates, ConcatPdfMerger, InMemoryDirectoryStore, InMemoryDossierStore,
    InMemoryEquivalenceStore, MailLog,
};

#[derive(Args, Debug)]
pub(crate) struct RosterCheckArgs {
    /// Path to the legacy roster CSV export
    pub(crate) path: PathBuf,
    /// Also apply the rows to a scratch directory and report what was created
    #[arg(long)]
    pub(crate) apply: bool,
}

pub(crate) fn run_roster_check(args: RosterCheckArgs) -> Result<(), AppError> {
    let import = RosterImport::from_path(&args.path)?;

    println!("roster export: {}", args.path.display());
    println!("  parseable rows: {}", import.row_count());
    for line in import.skipped() {
        println!("  skipped: {line}");
    }

    if args.apply {
        let directory = DirectoryService::new(Arc::new(InMemoryDirectoryStore::default()));
        let summary = import.apply(&directory)?;
        println!(
            "  would create: {} faculty, {} courses, {} positions",
            summary.faculty_created, summary.courses_created, summary.positions_created
        );
    }

    Ok(())
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (defaults to today)
    #[arg(long)]
    pub(crate) today: Option<NaiveDate>,
}

fn workflow<T, E>(result: Result<T, E>) -> Result<T, AppError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    result.map_err(|err| AppError::Workflow(Box::new(err)))
}

fn pdf_upload(name: &str) -> StoredFile {
    StoredFile {
        filename: name.to_string(),
        content_type: mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        bytes: format!("%PDF-1.4 demo payload: {name}").into_bytes(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let now = today.and_hms_opt(9, 0, 0).expect("valid demo time");

    let directory = Arc::new(DirectoryService::new(Arc::new(
        InMemoryDirectoryStore::default(),
    )));
    let mail = Arc::new(MailLog::default());
    let dossiers = DossierService::new(
        directory.clone(),
        Arc::new(InMemoryDossierStore::default()),
        mail.clone(),
        Box::new(BuiltinTemplates::new(today.year())),
        Box::new(ConcatPdfMerger),
        config.notifications.clone(),
    );
    let equivalences = EquivalenceService::new(
        Arc::new(InMemoryEquivalenceStore::default()),
        directory.clone(),
        mail.clone(),
        Box::new(BuiltinTemplates::new(today.year())),
        config.notifications.clone(),
    );

    println!("== seeding the directory ==");
    let faculty = workflow(directory.register_faculty(NewFaculty {
        given_name: "Juan".to_string(),
        surname: "Perez".to_string(),
        national_id: 28_111_222,
        payroll_id: 4_410,
        birth_date: NaiveDate::from_ymd_opt(1980, 1, 1).expect("valid date"),
    }))?;
    workflow(directory.add_email(faculty.id, "jperez@frlp.utn.edu.ar", true))?;
    let course = workflow(directory.register_course(NewCourse {
        name: "Structural Analysis".to_string(),
        department: "civil".to_string(),
        speciality: "civil".to_string(),
        level: Some("III".to_string()),
        weekly_hours: 6,
        total_hours: 144,
        delivery: DeliveryTerm::Annual,
        mandatory: true,
        score: 0,
    }))?;
    let position = workflow(directory.register_position(NewPosition {
        faculty: faculty.id,
        course: course.id,
        tenure: Tenure::Regular,
        category: Category::Adjunct,
        dedication: Dedication::SemiExclusive,
        weekly_load: 1.0,
        start: today.with_year(today.year() - 3).unwrap_or(today),
        end: None,
        expiry: Some(today.with_year(today.year() + 2).unwrap_or(today)),
    }))?;
    println!(
        "registered {} on {} ({})",
        faculty.display_name(),
        course.display_name(),
        position.rank_line()
    );

    println!();
    println!("== dossier workflow ==");
    let dossier = workflow(dossiers.open_dossier(OpenDossier {
        position: position.id,
        docket: Some(format!("12345/{}", today.year() - 3)),
    }))?;
    println!(
        "dossier opened: docket {:?}, term {} - {}",
        dossier.docket, dossier.start, dossier.current_expiry
    );

    let outcome = workflow(dossiers.register_resolution(
        dossier.id,
        ResolutionIntake {
            number: 120,
            year: today.year() - 3,
            purpose: ResolutionPurpose::Designation,
            authority: ResolutionAuthority::SuperiorCouncil,
            file: Some(pdf_upload("designation.pdf")),
            extension_days: None,
            leave_start: None,
            leave_end: None,
            extends_dossier: false,
        },
    ))?;
    println!(
        "resolution {} linked as {:?}",
        outcome.resolution.reference(),
        outcome.linked_as
    );

    let detail = workflow(dossiers.detail(dossier.id, today))?;
    println!("pending years to evaluate: {:?}", detail.pending_years);

    let first_years: Vec<i32> = detail.pending_years.iter().copied().take(2).collect();
    let evaluation = workflow(dossiers.start_evaluation(dossier.id, first_years, today))?;
    println!(
        "evaluation round {} opened over {:?}",
        evaluation.number, evaluation.years
    );

    // Upload a couple of checklist documents so the committee has material.
    let detail = workflow(dossiers.detail(dossier.id, today))?;
    let upload_targets: Vec<_> = detail
        .one_time_forms
        .iter()
        .chain(detail.annual_forms.iter().take(2))
        .filter(|form| form.status == FormStatus::Pending)
        .map(|form| form.id)
        .collect();
    for form in upload_targets {
        workflow(dossiers.submit_form(form, pdf_upload("upload.pdf"), today))?;
    }

    workflow(dossiers.upsert_committee(
        dossier.id,
        CommitteeIntake {
            internal_titular: Some(faculty.id),
            internal_alternate: None,
            external_titulars: vec![ExternalMember {
                full_name: "Carla Roldan".to_string(),
                email: "croldan@uba.edu.ar".to_string(),
                home_university: "Universidad Nacional de Buenos Aires".to_string(),
                rank_info: "Full Professor, Exclusive".to_string(),
                designation_reference: None,
            }],
            external_alternates: Vec::new(),
            student_titular: Some(Observer {
                full_name: "Nadia Lopez".to_string(),
                email: Some("nlopez@alu.frlp.utn.edu.ar".to_string()),
                constituency: Constituency::Student,
            }),
            student_alternate: None,
            graduate_titular: None,
            graduate_alternate: None,
            attendance: Default::default(),
        },
    ))?;

    let notification = workflow(dossiers.notify_committee(evaluation.id))?;
    println!(
        "committee convoked: {} mails sent, {} issues",
        notification.sent,
        notification.errors.len()
    );

    let reminder = workflow(dossiers.remind_pending(dossier.id, today))?;
    println!(
        "pending-forms reminder to {} with {} attachments",
        reminder.recipient, reminder.attachments
    );

    let bundle = workflow(dossiers.bundle(dossier.id))?;
    println!(
        "consolidated dossier: {} ({} bytes, {} skipped)",
        bundle.filename,
        bundle.bytes.len(),
        bundle.skipped.len()
    );

    println!();
    println!("== equivalence workflow ==");
    workflow(equivalences.assign_responsible(course.id, faculty.id))?;
    let request = workflow(equivalences.create_request(
        CreateRequest {
            student: None,
            new_student: Some(NewStudent {
                full_name: "Marco Vidal".to_string(),
                identity_document: "94-555-1".to_string(),
                email: Some("mvidal@example.com".to_string()),
            }),
            courses: vec![course.id],
            attachments: vec![pdf_upload("transcript.pdf")],
        },
        now,
    ))?;
    println!(
        "request opened: {} items, {} dispatched, {} issues",
        request.items_created,
        request.dispatched,
        request.errors.len()
    );

    let request_detail = workflow(equivalences.detail(request.request))?;
    let item = request_detail.items.first().expect("demo item exists");
    workflow(equivalences.record_ruling(
        item.id,
        RulingIntake {
            status: ItemStatus::Approved,
            supplement_topics: None,
        },
        now,
    ))?;
    let finalized = workflow(equivalences.finalize(
        request.request,
        pdf_upload("signed-act.pdf"),
        now,
    ))?;
    println!(
        "request {} completed at {:?}",
        finalized.id.0, finalized.completed_at
    );

    println!();
    println!("== outbound mail recorded ==");
    for message in mail.sent() {
        println!(
            "-> {} | {} | {} attachment(s)",
            message.to,
            message.subject,
            message.attachments.len()
        );
    }

    Ok(())
}
