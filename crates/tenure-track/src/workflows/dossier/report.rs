//! Read models for the dossier dashboard and detail pages.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::FacultyId;

use super::checklist;
use super::committee::Committee;
use super::domain::{
    DossierId, DossierStatus, Evaluation, EvaluationId, EvaluationStatus, Form, FormId, FormKind,
    FormStatus,
};

/// Dashboard filters: faculty-name substring and lifecycle state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<DossierStatus>,
}

/// One dashboard row. Progress counts only the forms currently due.
#[derive(Debug, Clone, Serialize)]
pub struct DossierSummary {
    pub dossier: DossierId,
    pub docket: Option<String>,
    pub faculty: FacultyId,
    pub faculty_name: String,
    pub course: String,
    pub status: DossierStatus,
    pub status_label: &'static str,
    pub start: NaiveDate,
    pub current_expiry: NaiveDate,
    pub due_forms_total: usize,
    pub due_forms_submitted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: DossierStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Dashboard payload: filtered rows ordered by expiry, the status breakdown,
/// and the rows expiring inside the warning window.
#[derive(Debug, Clone, Serialize)]
pub struct DossierBoard {
    pub rows: Vec<DossierSummary>,
    pub status_breakdown: Vec<StatusCount>,
    pub expiring_soon: Vec<DossierSummary>,
}

pub const EXPIRY_WARNING_DAYS: i64 = 120;

impl DossierBoard {
    pub fn build(mut rows: Vec<DossierSummary>, today: NaiveDate) -> Self {
        rows.sort_by(|a, b| a.current_expiry.cmp(&b.current_expiry));

        let status_breakdown = DossierStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                let count = rows.iter().filter(|row| row.status == status).count();
                (count > 0).then_some(StatusCount {
                    status,
                    status_label: status.label(),
                    count,
                })
            })
            .collect();

        let horizon = today + Duration::days(EXPIRY_WARNING_DAYS);
        let expiring_soon = rows
            .iter()
            .filter(|row| row.status.open() && row.current_expiry <= horizon)
            .cloned()
            .collect();

        Self {
            rows,
            status_breakdown,
            expiring_soon,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub id: FormId,
    pub kind: FormKind,
    pub kind_label: &'static str,
    pub status: FormStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_on: Option<NaiveDate>,
    pub has_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationId>,
}

impl FormView {
    pub fn from_form(form: &Form) -> Self {
        Self {
            id: form.id,
            kind: form.kind,
            kind_label: form.kind.label(),
            status: form.status,
            status_label: form.status.label(),
            year: form.year,
            submitted_on: form.submitted_on,
            has_file: form.file.is_some(),
            evaluation: form.evaluation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub id: EvaluationId,
    pub number: u32,
    pub years: Vec<i32>,
    pub opened_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: EvaluationStatus,
    pub status_label: &'static str,
}

impl EvaluationView {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        Self {
            id: evaluation.id,
            number: evaluation.number,
            years: evaluation.years.clone(),
            opened_on: evaluation.opened_on,
            scheduled_at: evaluation.scheduled_at,
            status: evaluation.status,
            status_label: evaluation.status.label(),
        }
    }
}

/// Detail payload: the dossier header plus the checklist partitioned the way
/// the office reads it.
#[derive(Debug, Clone, Serialize)]
pub struct DossierDetail {
    pub dossier: DossierId,
    pub docket: Option<String>,
    pub faculty_name: String,
    pub course: String,
    pub status: DossierStatus,
    pub status_label: &'static str,
    pub start: NaiveDate,
    pub original_expiry: NaiveDate,
    pub current_expiry: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv: Option<FormView>,
    pub one_time_forms: Vec<FormView>,
    pub annual_forms: Vec<FormView>,
    pub evaluation_forms: Vec<FormView>,
    pub evaluations: Vec<EvaluationView>,
    pub pending_years: Vec<i32>,
    pub has_remindable_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee: Option<Committee>,
}

/// Partition the due checklist into the cv / one-time / annual / evaluation
/// groups, ordered by year, evaluation round, then kind.
pub fn partition_forms(
    forms: &[Form],
    today: NaiveDate,
) -> (Option<FormView>, Vec<FormView>, Vec<FormView>, Vec<FormView>) {
    let mut visible: Vec<&Form> = forms
        .iter()
        .filter(|form| checklist::is_due(form, today))
        .collect();
    visible.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then(a.evaluation.cmp(&b.evaluation))
            .then(a.kind.cmp(&b.kind))
    });

    let mut cv = None;
    let mut one_time = Vec::new();
    let mut annual = Vec::new();
    let mut evaluation = Vec::new();

    for form in visible {
        let view = FormView::from_form(form);
        if form.kind == FormKind::Cv {
            cv = Some(view);
        } else if form.kind.one_time() {
            one_time.push(view);
        } else if form.kind.annual() {
            annual.push(view);
        } else if form.kind.evaluation_scoped() {
            evaluation.push(view);
        }
    }

    (cv, one_time, annual, evaluation)
}
