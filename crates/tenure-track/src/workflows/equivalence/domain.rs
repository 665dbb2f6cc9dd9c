use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workflows::directory::{CourseId, FacultyId, StoredFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Transfer student requesting credit recognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    pub email: Option<String>,
    /// National id or passport number; the dedup key for intake.
    pub identity_document: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// One equivalence request, holding the student's supporting documentation
/// and, once closed, the signed act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceRequest {
    pub id: RequestId,
    pub student: StudentId,
    pub opened_at: NaiveDateTime,
    pub status: RequestStatus,
    pub attachments: Vec<StoredFile>,
    pub signed_act: Option<StoredFile>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    AwaitingDispatch,
    SentToFaculty,
    Approved,
    Denied,
    RequiresSupplement,
}

impl ItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AwaitingDispatch => "Awaiting Dispatch",
            Self::SentToFaculty => "Sent to Faculty",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
            Self::RequiresSupplement => "Requires Supplementary Program",
        }
    }

    /// A ruling has been recorded for the item.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Denied | Self::RequiresSupplement)
    }
}

/// One course inside a request, tracked through dispatch and ruling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
    pub id: ItemId,
    pub request: RequestId,
    pub course: CourseId,
    pub status: ItemStatus,
    pub supplement_topics: Option<String>,
    pub ruled_at: Option<NaiveDateTime>,
}

/// Which faculty member answers equivalence requests for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub course: CourseId,
    pub responsible: Option<FacultyId>,
}

/// `"3 of 5"` progress rendering over a request's items.
pub fn progress(items: &[RequestItem]) -> String {
    let total = items.len();
    if total == 0 {
        return "0 of 0".to_string();
    }
    let ruled = items.iter().filter(|item| item.status.is_final()).count();
    format!("{ruled} of {total}")
}
