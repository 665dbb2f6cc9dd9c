//! Outbound side effects: reminders, committee convocations, bundles.

use crate::workflows::dossier::committee::{Constituency, ExternalMember, Observer};
use crate::workflows::dossier::domain::{FormKind, FormStatus};
use crate::workflows::dossier::repository::DossierStore;
use crate::workflows::dossier::service::{
    CommitteeIntake, DossierServiceError, OpenDossier,
};

use super::common::{date, fixture, pdf_file, Fixture};

fn opened(fx: &Fixture) -> crate::workflows::dossier::domain::Dossier {
    fx.service
        .open_dossier(OpenDossier {
            position: fx.position,
            docket: Some("12345/2020".to_string()),
        })
        .expect("dossier opens")
}

fn submit(
    fx: &Fixture,
    dossier: crate::workflows::dossier::domain::DossierId,
    kind: FormKind,
    year: Option<i32>,
) {
    let form = fx
        .store
        .forms_of(dossier)
        .expect("forms listed")
        .into_iter()
        .find(|form| form.kind == kind && form.year == year && form.status == FormStatus::Pending)
        .expect("form exists");
    let tag = year
        .map(|year| year.to_string())
        .unwrap_or_else(|| "general".to_string());
    fx.service
        .submit_form(
            form.id,
            pdf_file(&format!("{}-{}.pdf", kind.code(), tag)),
            date(2023, 5, 2),
        )
        .expect("submission accepted");
}

fn committee_intake() -> CommitteeIntake {
    CommitteeIntake {
        internal_titular: None,
        internal_alternate: None,
        external_titulars: vec![ExternalMember {
            full_name: "Carla Roldan".to_string(),
            email: "croldan@uba.edu.ar".to_string(),
            home_university: "Universidad Nacional de Buenos Aires".to_string(),
            rank_info: "Full Professor, Exclusive".to_string(),
            designation_reference: Some("441/2023".to_string()),
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
    }
}

#[test]
fn reminder_attaches_generated_and_master_templates() {
    let fx = fixture();
    let dossier = opened(&fx);
    let today = date(2023, 6, 1);

    let outcome = fx
        .service
        .remind_pending(dossier.id, today)
        .expect("reminder sends");

    assert_eq!(outcome.recipient, "jperez@frlp.utn.edu.ar");
    // One F02 master plus one generated F04/F05 per seeded year.
    assert!(outcome.attachments > 1);

    let sent = fx.mailbox.sent();
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert_eq!(message.to, "jperez@frlp.utn.edu.ar");
    assert!(message.subject.contains("Pending Documentation"));
    assert!(message.body.contains("Curriculum Vitae (CONEAU format)"));
    assert!(message.body.contains("Civil Engineering Department"));
    assert!(message
        .attachments
        .iter()
        .any(|attachment| attachment.filename == "F02_master.docx"));
    assert!(message
        .attachments
        .iter()
        .any(|attachment| attachment.filename.starts_with("F04_2020_")));
}

#[test]
fn reminder_reports_missing_letterheads_instead_of_attaching() {
    use crate::workflows::directory::{Dedication, Tenure};

    // No letterhead on file for 2020, so that year's F04/F05 cannot be
    // personalized and must surface as body lines instead of attachments.
    let fx = super::common::fixture_with_library(
        Tenure::Regular,
        Dedication::Simple,
        &[2021, 2022, 2023, 2024, 2025],
    );
    let dossier = opened(&fx);

    let outcome = fx
        .service
        .remind_pending(dossier.id, date(2023, 6, 1))
        .expect("reminder sends");

    assert!(outcome
        .listed
        .iter()
        .any(|line| line.contains("F04 for 2020") && line.contains("could not be generated")));
    let sent = fx.mailbox.sent();
    assert!(!sent[0]
        .attachments
        .iter()
        .any(|attachment| attachment.filename.starts_with("F04_2020_")));
    assert!(sent[0]
        .attachments
        .iter()
        .any(|attachment| attachment.filename.starts_with("F04_2021_")));
}

#[test]
fn reminder_requires_a_primary_mailbox() {
    let fx = fixture();
    let dossier = opened(&fx);

    // Demote the only mailbox.
    fx.directory
        .add_email(fx.faculty, "jperez@frlp.utn.edu.ar", false)
        .expect("demotion applies");

    let err = fx
        .service
        .remind_pending(dossier.id, date(2023, 6, 1))
        .expect_err("missing mailbox rejected");
    assert!(matches!(err, DossierServiceError::MissingPrimaryEmail(_)));
    assert!(fx.mailbox.sent().is_empty());
}

#[test]
fn reminder_needs_something_pending() {
    let fx = fixture();
    let dossier = opened(&fx);

    // Submit every remindable form.
    let forms = fx.store.forms_of(dossier.id).expect("forms listed");
    for form in forms {
        if FormKind::reminded().contains(&form.kind) {
            fx.service
                .submit_form(form.id, pdf_file("upload.pdf"), date(2025, 5, 2))
                .expect("submission accepted");
        }
    }

    let err = fx
        .service
        .remind_pending(dossier.id, date(2025, 6, 1))
        .expect_err("nothing pending");
    assert!(matches!(err, DossierServiceError::NothingToSend(_)));
}

#[test]
fn committee_notification_mails_each_active_member_with_round_documents() {
    let fx = fixture();
    let dossier = opened(&fx);
    let today = date(2023, 6, 1);

    submit(&fx, dossier.id, FormKind::F01, None);
    submit(&fx, dossier.id, FormKind::F04, Some(2020));
    submit(&fx, dossier.id, FormKind::F04, Some(2022));

    let evaluation = fx
        .service
        .start_evaluation(dossier.id, vec![2020, 2021], today)
        .expect("round opens");
    fx.service
        .schedule_evaluation(
            evaluation.id,
            Some(date(2023, 7, 10).and_hms_opt(10, 30, 0).expect("valid")),
        )
        .expect("scheduling works");

    fx.service
        .upsert_committee(dossier.id, committee_intake())
        .expect("committee saved");

    let outcome = fx
        .service
        .notify_committee(evaluation.id)
        .expect("notification sends");
    assert_eq!(outcome.sent, 2);
    assert!(outcome.errors.is_empty());

    let sent = fx.mailbox.sent();
    assert_eq!(sent.len(), 2);
    let message = &sent[0];
    assert!(message.subject.contains("Evaluation Committee"));
    assert!(message.body.contains("10/07/2023 at 10:30"));
    // F01 (general) and the 2020 F04 travel; the 2022 F04 is outside the round.
    assert_eq!(message.attachments.len(), 2);
    assert!(message
        .attachments
        .iter()
        .any(|attachment| attachment.filename == "F01-general.pdf"));
    assert!(message
        .attachments
        .iter()
        .any(|attachment| attachment.filename == "F04-2020.pdf"));
    assert!(!message
        .attachments
        .iter()
        .any(|attachment| attachment.filename == "F04-2022.pdf"));
}

#[test]
fn committee_notification_requires_members_and_documents() {
    let fx = fixture();
    let dossier = opened(&fx);
    let today = date(2023, 6, 1);
    let evaluation = fx
        .service
        .start_evaluation(dossier.id, vec![2020], today)
        .expect("round opens");

    let err = fx
        .service
        .notify_committee(evaluation.id)
        .expect_err("no committee yet");
    assert!(matches!(err, DossierServiceError::MissingCommittee));

    fx.service
        .upsert_committee(dossier.id, committee_intake())
        .expect("committee saved");

    let err = fx
        .service
        .notify_committee(evaluation.id)
        .expect_err("no documents yet");
    assert!(matches!(err, DossierServiceError::NothingToSend(_)));
}

#[test]
fn internal_members_must_be_tenure_track() {
    use crate::workflows::directory::NewFaculty;
    use crate::workflows::dossier::committee::CommitteeViolation;

    let fx = fixture();
    let dossier = opened(&fx);

    // The fixture faculty member holds a regular position, so they qualify.
    let mut intake = committee_intake();
    intake.internal_titular = Some(fx.faculty);
    fx.service
        .upsert_committee(dossier.id, intake)
        .expect("eligible member accepted");

    // A member with no tenure-track appointment does not.
    let outsider = fx
        .directory
        .register_faculty(NewFaculty {
            given_name: "Ana".to_string(),
            surname: "Gomez".to_string(),
            national_id: 30_222_333,
            payroll_id: 4_500,
            birth_date: date(1985, 7, 1),
        })
        .expect("faculty registers");

    let mut intake = committee_intake();
    intake.internal_titular = Some(outsider.id);
    let err = fx
        .service
        .upsert_committee(dossier.id, intake)
        .expect_err("outsider rejected");
    assert!(matches!(
        err,
        DossierServiceError::Committee(CommitteeViolation::IneligibleInternalMember)
    ));
}

#[test]
fn bundle_concatenates_files_oldest_first_and_reports_skips() {
    let fx = fixture();
    let dossier = opened(&fx);

    submit(&fx, dossier.id, FormKind::F01, None);
    submit(&fx, dossier.id, FormKind::F04, Some(2021));

    // A corrupt upload is skipped by the merger, not fatal.
    let survey = fx
        .store
        .forms_of(dossier.id)
        .expect("forms listed")
        .into_iter()
        .find(|form| form.kind == FormKind::Survey && form.year == Some(2020))
        .expect("survey exists");
    fx.service
        .submit_form(
            survey.id,
            crate::workflows::directory::StoredFile {
                filename: "broken.bin".to_string(),
                content_type: "application/octet-stream".to_string(),
                bytes: b"not a pdf".to_vec(),
            },
            date(2023, 5, 2),
        )
        .expect("submission accepted");

    let bundle = fx.service.bundle(dossier.id).expect("bundle builds");
    assert!(bundle.filename.starts_with("dossier_perez-juan"));
    assert_eq!(bundle.skipped, vec!["broken.bin".to_string()]);
    assert!(!bundle.bytes.is_empty());
}

#[test]
fn bundle_requires_stored_files() {
    let fx = fixture();
    let dossier = opened(&fx);

    let err = fx.service.bundle(dossier.id).expect_err("nothing to merge");
    assert!(matches!(err, DossierServiceError::NothingToSend(_)));
}

#[test]
fn jury_sheet_lists_titulars_and_alternates() {
    let fx = fixture();
    let dossier = opened(&fx);

    let err = fx
        .service
        .jury_sheet(dossier.id)
        .expect_err("committee required");
    assert!(matches!(err, DossierServiceError::MissingCommittee));

    let mut intake = committee_intake();
    intake.internal_titular = Some(fx.faculty);
    fx.service
        .upsert_committee(dossier.id, intake)
        .expect("committee saved");

    let sheet = fx.service.jury_sheet(dossier.id).expect("sheet renders");
    assert!(sheet.filename.starts_with("jury_proposal_"));
    let rendered = String::from_utf8(sheet.bytes).expect("render is utf8");
    assert!(rendered.contains("PEREZ, Juan"));
    assert!(rendered.contains("UTN-FRLP"));
    assert!(rendered.contains("Carla Roldan"));
    assert!(rendered.contains("12345/2020"));
}

#[test]
fn form_template_download_personalizes_generated_kinds() {
    let fx = fixture();
    let dossier = opened(&fx);

    let form = fx
        .store
        .forms_of(dossier.id)
        .expect("forms listed")
        .into_iter()
        .find(|form| form.kind == FormKind::F05 && form.year == Some(2021))
        .expect("form exists");

    let document = fx
        .service
        .form_template(form.id, date(2023, 6, 1))
        .expect("template generates");
    assert_eq!(document.filename, "F05_2021_perez-juan.docx");
    let rendered = String::from_utf8(document.bytes).expect("render is utf8");
    assert!(rendered.contains("PEREZ, Juan"));
    assert!(rendered.contains("2021"));
    assert!(rendered.contains("Institutional motto 2021"));
    assert!(!rendered.contains("[DOCENTE_NOMBRE]"));
}
