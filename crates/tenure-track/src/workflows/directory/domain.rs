use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for faculty members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacultyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolutionId(pub u64);

/// Character of a faculty appointment. Only ordinary and regular positions
/// participate in the tenure-track evaluation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tenure {
    Ordinary,
    Regular,
    Interim,
    Honorary,
}

impl Tenure {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ordinary => "Ordinary",
            Self::Regular => "Regular",
            Self::Interim => "Interim",
            Self::Honorary => "Honorary",
        }
    }

    pub const fn tenure_track(self) -> bool {
        matches!(self, Self::Ordinary | Self::Regular)
    }
}

/// Academic rank of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SecondAssistant,
    FirstAssistant,
    HeadAssistant,
    Adjunct,
    Associate,
    Full,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SecondAssistant => "Second Assistant",
            Self::FirstAssistant => "First Assistant",
            Self::HeadAssistant => "Head of Practical Works",
            Self::Adjunct => "Adjunct Professor",
            Self::Associate => "Associate Professor",
            Self::Full => "Full Professor",
        }
    }

    /// Ranks participating in the hierarchical picker filter, lowest first.
    /// Assistant ranks below Head of Practical Works are outside the ladder.
    pub const fn ladder() -> [Self; 4] {
        [Self::HeadAssistant, Self::Adjunct, Self::Associate, Self::Full]
    }
}

/// Weekly time commitment of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dedication {
    Simple,
    SemiExclusive,
    Exclusive,
}

impl Dedication {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::SemiExclusive => "Semi-Exclusive",
            Self::Exclusive => "Exclusive",
        }
    }

    pub const fn ladder() -> [Self; 3] {
        [Self::Simple, Self::SemiExclusive, Self::Exclusive]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    OnLeave,
    Retired,
}

impl PositionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::OnLeave => "On Leave",
            Self::Retired => "Retired",
        }
    }
}

/// Term in which a course is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTerm {
    Annual,
    FirstTerm,
    SecondTerm,
}

impl DeliveryTerm {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Annual => "Annual",
            Self::FirstTerm => "First Term",
            Self::SecondTerm => "Second Term",
        }
    }
}

/// Administrative act recorded against a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPurpose {
    Appointment,
    Termination,
    Designation,
    Commissioning,
    LeaveStart,
    LeaveEnd,
    DossierExtension,
}

impl ResolutionPurpose {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Appointment => "Appointment",
            Self::Termination => "Termination",
            Self::Designation => "Designation",
            Self::Commissioning => "Commissioning",
            Self::LeaveStart => "Leave Start",
            Self::LeaveEnd => "Leave End",
            Self::DossierExtension => "Dossier Extension",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAuthority {
    Dean,
    DirectiveCouncil,
    Rector,
    SuperiorCouncil,
}

impl ResolutionAuthority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dean => "Dean",
            Self::DirectiveCouncil => "Directive Council",
            Self::Rector => "Rector",
            Self::SuperiorCouncil => "Superior Council",
        }
    }
}

/// Uploaded file payload kept alongside the record that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A member of the teaching staff. Names are stored lowercased and rendered
/// through `display_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub given_name: String,
    pub surname: String,
    pub national_id: u64,
    pub payroll_id: u64,
    pub birth_date: NaiveDate,
}

impl Faculty {
    /// `SURNAME, Given` rendering used in listings, mail bodies, and filenames.
    pub fn display_name(&self) -> String {
        format!(
            "{}, {}",
            self.surname.to_uppercase(),
            title_case(&self.given_name)
        )
    }
}

/// Mailbox registered for a faculty member. At most one per member is primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContact {
    pub faculty: FacultyId,
    pub address: String,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub department: String,
    pub speciality: String,
    pub level: Option<String>,
    pub weekly_hours: u32,
    pub total_hours: u32,
    pub delivery: DeliveryTerm,
    pub mandatory: bool,
    pub score: i32,
}

impl Course {
    pub fn display_name(&self) -> String {
        title_case(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub faculty: FacultyId,
    pub course: CourseId,
    pub tenure: Tenure,
    pub category: Category,
    pub dedication: Dedication,
    pub weekly_load: f32,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub expiry: Option<NaiveDate>,
    pub status: PositionStatus,
}

impl Position {
    /// `Adjunct Professor Regular` rendering used on generated documents.
    pub fn rank_line(&self) -> String {
        format!("{} {}", self.category.label(), self.tenure.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub id: ResolutionId,
    pub position: PositionId,
    pub number: u32,
    pub year: i32,
    pub purpose: ResolutionPurpose,
    pub authority: ResolutionAuthority,
    pub file: Option<StoredFile>,
    pub leave_start: Option<NaiveDate>,
    pub leave_end: Option<NaiveDate>,
    pub extends_dossier: bool,
}

impl Resolution {
    pub fn reference(&self) -> String {
        format!(
            "Res. {} {}/{}",
            self.authority.label(),
            self.number,
            self.year
        )
    }
}

/// Uppercase the first letter of each whitespace-separated word.
pub(crate) fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
