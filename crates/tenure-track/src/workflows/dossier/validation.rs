//! Pre-persist business rules for dossiers, evaluations, and checklist forms.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::workflows::directory::Position;

use super::domain::{Dossier, Evaluation, Form, FormStatus};

const MINIMUM_DURATION_YEARS: i32 = 2;

/// Validation errors raised before a dossier record mutation is persisted.
#[derive(Debug, thiserror::Error)]
pub enum RuleViolation {
    #[error("only regular or ordinary positions may open a dossier (found {found})")]
    NotTenureTrack { found: &'static str },
    #[error("position has no expiry date to derive the dossier term from")]
    MissingPositionExpiry,
    #[error("the expiry date must come after the start date")]
    ExpiryBeforeStart,
    #[error("a dossier must span at least {MINIMUM_DURATION_YEARS} years")]
    DurationTooShort,
    #[error("an open dossier already exists for this position")]
    DuplicateOpenDossier,
    #[error("docket number '{value}' does not match NNNNN/YYYY")]
    InvalidDocketFormat { value: String },
    #[error("docket number '{value}' is already assigned")]
    DocketTaken { value: String },
    #[error("no years were selected for the evaluation")]
    NoYearsSelected,
    #[error("year {year} predates the dossier start ({start_year})")]
    YearBeforeStart { year: i32, start_year: i32 },
    #[error("year {year} has not happened yet")]
    FutureYear { year: i32 },
    #[error("year {year} was already covered by another evaluation")]
    YearAlreadyCovered { year: i32 },
    #[error("{kind} forms must carry the calendar year they correspond to")]
    MissingFormYear { kind: &'static str },
    #[error("year {year} falls outside the dossier term {first}-{last}")]
    FormYearOutOfRange { year: i32, first: i32, last: i32 },
    #[error("a submitted form must have an attached file")]
    SubmittedWithoutFile,
}

fn docket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4,6}/\d{4}$").expect("pattern is valid"))
}

pub(crate) fn ensure_docket_format(value: &str) -> Result<(), RuleViolation> {
    if docket_pattern().is_match(value) {
        Ok(())
    } else {
        Err(RuleViolation::InvalidDocketFormat {
            value: value.to_string(),
        })
    }
}

/// Rules applied before a dossier is opened for a position.
pub(crate) fn ensure_dossier_can_open(
    position: &Position,
    existing: Option<&Dossier>,
    start: NaiveDate,
    original_expiry: NaiveDate,
) -> Result<(), RuleViolation> {
    if !position.tenure.tenure_track() {
        return Err(RuleViolation::NotTenureTrack {
            found: position.tenure.label(),
        });
    }

    if original_expiry <= start {
        return Err(RuleViolation::ExpiryBeforeStart);
    }

    let minimum_expiry = shift_years(start, MINIMUM_DURATION_YEARS);
    if original_expiry < minimum_expiry {
        return Err(RuleViolation::DurationTooShort);
    }

    if existing.map(|dossier| dossier.status.open()).unwrap_or(false) {
        return Err(RuleViolation::DuplicateOpenDossier);
    }

    Ok(())
}

/// Rules applied to the year set of a new evaluation round.
pub(crate) fn ensure_evaluation_years(
    dossier: &Dossier,
    siblings: &[Evaluation],
    years: &[i32],
    today: NaiveDate,
) -> Result<(), RuleViolation> {
    if years.is_empty() {
        return Err(RuleViolation::NoYearsSelected);
    }

    let start_year = dossier.start.year();
    let current_year = today.year();
    let covered: BTreeSet<i32> = siblings
        .iter()
        .flat_map(|evaluation| evaluation.years.iter().copied())
        .collect();

    for &year in years {
        if year < start_year {
            return Err(RuleViolation::YearBeforeStart { year, start_year });
        }
        if year > current_year {
            return Err(RuleViolation::FutureYear { year });
        }
        if covered.contains(&year) {
            return Err(RuleViolation::YearAlreadyCovered { year });
        }
    }

    Ok(())
}

/// Rules applied whenever a checklist form is created or mutated.
pub(crate) fn ensure_form_consistent(form: &Form, dossier: &Dossier) -> Result<(), RuleViolation> {
    if form.kind.annual() {
        let year = form.year.ok_or(RuleViolation::MissingFormYear {
            kind: form.kind.code(),
        })?;
        let first = dossier.start.year();
        let last = dossier.original_expiry.year();
        if year < first || year > last {
            return Err(RuleViolation::FormYearOutOfRange { year, first, last });
        }
    }

    if form.status == FormStatus::Submitted && form.file.is_none() {
        return Err(RuleViolation::SubmittedWithoutFile);
    }

    Ok(())
}

fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    // Feb 29 anchors clamp to Feb 28 on non-leap targets.
    date.with_year(date.year() + years).unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(date.year() + years, 2, 28).expect("Feb 28 exists")
    })
}
