use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::{PositionId, ResolutionId, StoredFile};

/// Identifier wrapper for dossiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DossierId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationId(pub u64);

/// Lifecycle state of a tenure-track dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierStatus {
    Active,
    OnLeave,
    Closed,
    Expired,
}

impl DossierStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Active, Self::OnLeave, Self::Closed, Self::Expired]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::OnLeave => "On Leave (Standby)",
            Self::Closed => "Closed",
            Self::Expired => "Expired",
        }
    }

    pub const fn open(self) -> bool {
        matches!(self, Self::Active | Self::OnLeave)
    }
}

/// The record of a faculty member's multi-year evaluation process, one per
/// position. `current_expiry` starts at `original_expiry` and moves with
/// extension resolutions and leave credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub id: DossierId,
    pub position: PositionId,
    pub docket: Option<String>,
    pub start: NaiveDate,
    pub original_expiry: NaiveDate,
    pub current_expiry: NaiveDate,
    pub status: DossierStatus,
    pub designation_resolution: Option<ResolutionId>,
    pub commissioning_resolution: Option<ResolutionId>,
    pub closed_at: Option<NaiveDateTime>,
}

/// The tracked documents of a dossier checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormKind {
    Cv,
    F01,
    F02,
    F03,
    F04,
    F05,
    F06,
    F07,
    F08,
    F09,
    F10,
    F11,
    F12,
    F13,
    Survey,
}

impl FormKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Cv => "CV",
            Self::F01 => "F01",
            Self::F02 => "F02",
            Self::F03 => "F03",
            Self::F04 => "F04",
            Self::F05 => "F05",
            Self::F06 => "F06",
            Self::F07 => "F07",
            Self::F08 => "F08",
            Self::F09 => "F09",
            Self::F10 => "F10",
            Self::F11 => "F11",
            Self::F12 => "F12",
            Self::F13 => "F13",
            Self::Survey => "SURVEY",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cv => "Curriculum Vitae",
            Self::Survey => "Student Survey",
            other => other.code(),
        }
    }

    /// Filed once per dossier.
    pub const fn one_time(self) -> bool {
        matches!(self, Self::Cv | Self::F01 | Self::F02 | Self::F03)
    }

    /// Filed once per covered calendar year.
    pub const fn annual(self) -> bool {
        matches!(
            self,
            Self::F04 | Self::F05 | Self::F06 | Self::F07 | Self::F13 | Self::Survey
        )
    }

    /// Produced by the committee during an evaluation round.
    pub const fn evaluation_scoped(self) -> bool {
        matches!(self, Self::F08 | Self::F09 | Self::F10 | Self::F11 | Self::F12)
    }

    /// Kinds generated on demand from a master template plus the annual
    /// letterhead.
    pub const fn generated(self) -> bool {
        matches!(
            self,
            Self::F04 | Self::F05 | Self::F06 | Self::F07 | Self::F13 | Self::Survey
        )
    }

    /// Kinds covered by the pending-documentation reminder mail.
    pub const fn reminded() -> [Self; 3] {
        [Self::F02, Self::F04, Self::F05]
    }

    pub const fn evaluation_set() -> [Self; 5] {
        [Self::F08, Self::F09, Self::F10, Self::F11, Self::F12]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Pending,
    Submitted,
    Observed,
}

impl FormStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Submitted => "Submitted",
            Self::Observed => "Observed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub dossier: DossierId,
    pub kind: FormKind,
    pub status: FormStatus,
    pub submitted_on: Option<NaiveDate>,
    pub file: Option<StoredFile>,
    pub year: Option<i32>,
    pub evaluation: Option<EvaluationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Scheduled,
    Held,
    Cancelled,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Held => "Held",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// One committee review round covering a set of calendar years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub dossier: DossierId,
    pub number: u32,
    pub opened_on: NaiveDate,
    pub years: Vec<i32>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: EvaluationStatus,
}
