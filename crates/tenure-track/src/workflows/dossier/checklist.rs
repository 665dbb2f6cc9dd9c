//! Checklist blueprint: which forms a dossier owes and when.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::workflows::directory::Dedication;

use super::domain::{Evaluation, Form, FormKind};

/// Kinds seeded when a dossier opens, paired with the year they correspond to
/// (`None` for the one-time set). Annual kinds repeat for every calendar year
/// of the original term; F13 only exists for exclusive and semi-exclusive
/// dedications.
pub fn seeded_kinds(
    start: NaiveDate,
    original_expiry: NaiveDate,
    dedication: Dedication,
) -> Vec<(FormKind, Option<i32>)> {
    let mut kinds: Vec<(FormKind, Option<i32>)> = vec![
        (FormKind::F01, None),
        (FormKind::F02, None),
        (FormKind::F03, None),
        (FormKind::Cv, None),
    ];

    let mut annual = vec![
        FormKind::F04,
        FormKind::F05,
        FormKind::F06,
        FormKind::F07,
        FormKind::Survey,
    ];
    if matches!(dedication, Dedication::Exclusive | Dedication::SemiExclusive) {
        annual.push(FormKind::F13);
    }

    for year in start.year()..=original_expiry.year() {
        for kind in &annual {
            kinds.push((*kind, Some(year)));
        }
    }

    kinds
}

/// Calendar years of the term that no evaluation round has covered yet.
pub fn pending_years(start: NaiveDate, today: NaiveDate, evaluations: &[Evaluation]) -> Vec<i32> {
    let all_years: BTreeSet<i32> = (start.year()..=today.year()).collect();
    let covered: BTreeSet<i32> = evaluations
        .iter()
        .flat_map(|evaluation| evaluation.years.iter().copied())
        .collect();

    all_years.difference(&covered).copied().collect()
}

/// A form counts toward progress (and shows on the detail page) once it is
/// actually owed: non-annual forms always, past years always, and only F04 for
/// the running year.
pub fn is_due(form: &Form, today: NaiveDate) -> bool {
    match form.year {
        None => true,
        Some(year) if year < today.year() => true,
        Some(year) => year == today.year() && form.kind == FormKind::F04,
    }
}
