//! Evaluation committee membership and the active-member convocation rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflows::directory::FacultyId;

use super::domain::DossierId;

/// Constituency an observer represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constituency {
    Student,
    Graduate,
}

impl Constituency {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Graduate => "Graduate",
        }
    }
}

/// Panel member from another institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMember {
    pub full_name: String,
    pub email: String,
    pub home_university: String,
    pub rank_info: String,
    #[serde(default)]
    pub designation_reference: Option<String>,
}

/// Student or graduate observer attached to the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observer {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub constituency: Constituency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Present,
    Absent,
}

/// Attendance map key for the internal titular slot.
pub const INTERNAL_TITULAR_SLOT: &str = "internal_titular";

/// The panel reviewing one dossier. One committee per dossier; membership is
/// replaced wholesale on upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    pub dossier: DossierId,
    pub internal_titular: Option<FacultyId>,
    pub internal_alternate: Option<FacultyId>,
    #[serde(default)]
    pub external_titulars: Vec<ExternalMember>,
    #[serde(default)]
    pub external_alternates: Vec<ExternalMember>,
    pub student_titular: Option<Observer>,
    pub student_alternate: Option<Observer>,
    pub graduate_titular: Option<Observer>,
    pub graduate_alternate: Option<Observer>,
    #[serde(default)]
    pub attendance: BTreeMap<String, Attendance>,
}

impl Committee {
    pub fn empty(dossier: DossierId) -> Self {
        Self {
            dossier,
            internal_titular: None,
            internal_alternate: None,
            external_titulars: Vec::new(),
            external_alternates: Vec::new(),
            student_titular: None,
            student_alternate: None,
            graduate_titular: None,
            graduate_alternate: None,
            attendance: BTreeMap::new(),
        }
    }

    /// Members convoked for a session: the internal alternate stands in when
    /// the titular is marked absent, external and observer titulars always.
    pub fn active_members(&self) -> Vec<CommitteeMember> {
        let mut members = Vec::new();

        let titular_absent = self
            .attendance
            .get(INTERNAL_TITULAR_SLOT)
            .map(|state| *state == Attendance::Absent)
            .unwrap_or(false);
        if titular_absent {
            if let Some(alternate) = self.internal_alternate {
                members.push(CommitteeMember::Internal(alternate));
            }
        } else if let Some(titular) = self.internal_titular {
            members.push(CommitteeMember::Internal(titular));
        }

        for external in &self.external_titulars {
            members.push(CommitteeMember::External(external.clone()));
        }

        if let Some(observer) = &self.student_titular {
            members.push(CommitteeMember::Observer(observer.clone()));
        }
        if let Some(observer) = &self.graduate_titular {
            members.push(CommitteeMember::Observer(observer.clone()));
        }

        members
    }
}

/// A convoked member, carrying enough to resolve a mailbox.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitteeMember {
    Internal(FacultyId),
    External(ExternalMember),
    Observer(Observer),
}

/// Seat checks applied before a committee is persisted.
#[derive(Debug, thiserror::Error)]
pub enum CommitteeViolation {
    #[error("{slot} seat requires a {expected} observer (found {found})")]
    WrongConstituency {
        slot: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("internal members must hold a regular or ordinary position")]
    IneligibleInternalMember,
}

pub(crate) fn ensure_observer_seats(committee: &Committee) -> Result<(), CommitteeViolation> {
    let seats = [
        ("student titular", &committee.student_titular, Constituency::Student),
        ("student alternate", &committee.student_alternate, Constituency::Student),
        ("graduate titular", &committee.graduate_titular, Constituency::Graduate),
        ("graduate alternate", &committee.graduate_alternate, Constituency::Graduate),
    ];

    for (slot, observer, expected) in seats {
        if let Some(observer) = observer {
            if observer.constituency != expected {
                return Err(CommitteeViolation::WrongConstituency {
                    slot,
                    expected: expected.label(),
                    found: observer.constituency.label(),
                });
            }
        }
    }

    Ok(())
}
