use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    title_case, Category, Course, CourseId, Dedication, DeliveryTerm, EmailContact, Faculty,
    FacultyId, Position, PositionId, PositionStatus, Resolution, ResolutionAuthority,
    ResolutionId, ResolutionPurpose, StoredFile, Tenure,
};
use super::repository::{DirectoryStore, RepositoryError};

static FACULTY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static COURSE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static POSITION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RESOLUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_faculty_id() -> FacultyId {
    FacultyId(FACULTY_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_course_id() -> CourseId {
    CourseId(COURSE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_position_id() -> PositionId {
    PositionId(POSITION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

fn next_resolution_id() -> ResolutionId {
    ResolutionId(RESOLUTION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Intake payload for a new faculty member.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFaculty {
    pub given_name: String,
    pub surname: String,
    pub national_id: u64,
    pub payroll_id: u64,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub department: String,
    pub speciality: String,
    #[serde(default)]
    pub level: Option<String>,
    pub weekly_hours: u32,
    pub total_hours: u32,
    pub delivery: DeliveryTerm,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    #[serde(default)]
    pub score: i32,
}

fn default_mandatory() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPosition {
    pub faculty: FacultyId,
    pub course: CourseId,
    pub tenure: Tenure,
    pub category: Category,
    pub dedication: Dedication,
    #[serde(default = "default_weekly_load")]
    pub weekly_load: f32,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
}

fn default_weekly_load() -> f32 {
    1.0
}

/// Intake payload for an administrative resolution filed against a position.
#[derive(Debug, Clone, Deserialize)]
pub struct NewResolution {
    pub position: PositionId,
    pub number: u32,
    pub year: i32,
    pub purpose: ResolutionPurpose,
    pub authority: ResolutionAuthority,
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default)]
    pub leave_start: Option<NaiveDate>,
    #[serde(default)]
    pub leave_end: Option<NaiveDate>,
    #[serde(default)]
    pub extends_dossier: bool,
}

/// Hierarchical picker filter: a selected rank keeps that rank and everything
/// above it on the ladder.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FacultyFilter {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub dedication: Option<Dedication>,
}

/// Row returned to the faculty picker endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FacultyPickerEntry {
    pub id: FacultyId,
    pub surname: String,
    pub given_name: String,
    pub full_name: String,
}

/// Error raised by directory maintenance operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryServiceError {
    #[error("'{0}' is not a mail address")]
    InvalidEmail(String),
    #[error("faculty member not found")]
    UnknownFaculty,
    #[error("course not found")]
    UnknownCourse,
    #[error("position not found")]
    UnknownPosition,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Maintains the staff directory: members, mailboxes, courses, appointments.
pub struct DirectoryService<S> {
    store: Arc<S>,
}

impl<S> DirectoryService<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }

    /// Register a member. Names are normalized to lowercase at rest.
    pub fn register_faculty(&self, intake: NewFaculty) -> Result<Faculty, DirectoryServiceError> {
        let faculty = Faculty {
            id: next_faculty_id(),
            given_name: intake.given_name.trim().to_lowercase(),
            surname: intake.surname.trim().to_lowercase(),
            national_id: intake.national_id,
            payroll_id: intake.payroll_id,
            birth_date: intake.birth_date,
        };
        Ok(self.store.insert_faculty(faculty)?)
    }

    pub fn register_course(&self, intake: NewCourse) -> Result<Course, DirectoryServiceError> {
        let course = Course {
            id: next_course_id(),
            name: intake.name.trim().to_lowercase(),
            department: intake.department.trim().to_lowercase(),
            speciality: intake.speciality.trim().to_lowercase(),
            level: intake.level,
            weekly_hours: intake.weekly_hours,
            total_hours: intake.total_hours,
            delivery: intake.delivery,
            mandatory: intake.mandatory,
            score: intake.score,
        };
        Ok(self.store.insert_course(course)?)
    }

    pub fn register_position(
        &self,
        intake: NewPosition,
    ) -> Result<Position, DirectoryServiceError> {
        self.store
            .fetch_faculty(intake.faculty)?
            .ok_or(DirectoryServiceError::UnknownFaculty)?;
        self.store
            .fetch_course(intake.course)?
            .ok_or(DirectoryServiceError::UnknownCourse)?;

        let position = Position {
            id: next_position_id(),
            faculty: intake.faculty,
            course: intake.course,
            tenure: intake.tenure,
            category: intake.category,
            dedication: intake.dedication,
            weekly_load: intake.weekly_load,
            start: intake.start,
            end: intake.end,
            expiry: intake.expiry,
            status: PositionStatus::Active,
        };
        Ok(self.store.insert_position(position)?)
    }

    /// Register a mailbox. Setting a new primary demotes the previous one.
    pub fn add_email(
        &self,
        faculty: FacultyId,
        address: &str,
        primary: bool,
    ) -> Result<EmailContact, DirectoryServiceError> {
        let address = address.trim().to_lowercase();
        if !address.contains('@') {
            return Err(DirectoryServiceError::InvalidEmail(address));
        }
        self.store
            .fetch_faculty(faculty)?
            .ok_or(DirectoryServiceError::UnknownFaculty)?;

        if primary {
            for mut existing in self.store.emails_of(faculty)? {
                if existing.primary && existing.address != address {
                    existing.primary = false;
                    self.store.upsert_email(existing)?;
                }
            }
        }

        let contact = EmailContact {
            faculty,
            address,
            primary,
        };
        self.store.upsert_email(contact.clone())?;
        Ok(contact)
    }

    pub fn record_resolution(
        &self,
        intake: NewResolution,
    ) -> Result<Resolution, DirectoryServiceError> {
        self.store
            .fetch_position(intake.position)?
            .ok_or(DirectoryServiceError::UnknownPosition)?;

        let resolution = Resolution {
            id: next_resolution_id(),
            position: intake.position,
            number: intake.number,
            year: intake.year,
            purpose: intake.purpose,
            authority: intake.authority,
            file: intake.file,
            leave_start: intake.leave_start,
            leave_end: intake.leave_end,
            extends_dossier: intake.extends_dossier,
        };
        Ok(self.store.insert_resolution(resolution)?)
    }

    pub fn resolutions_of(
        &self,
        position: PositionId,
    ) -> Result<Vec<Resolution>, DirectoryServiceError> {
        Ok(self.store.resolutions_of(position)?)
    }

    pub fn primary_email(
        &self,
        faculty: FacultyId,
    ) -> Result<Option<String>, DirectoryServiceError> {
        Ok(self
            .store
            .emails_of(faculty)?
            .into_iter()
            .find(|contact| contact.primary)
            .map(|contact| contact.address))
    }

    /// Faculty holding at least one tenure-track position, optionally narrowed
    /// by the hierarchical rank/dedication filters.
    pub fn eligible_faculty(
        &self,
        filter: FacultyFilter,
    ) -> Result<Vec<FacultyPickerEntry>, DirectoryServiceError> {
        let allowed_categories = filter.category.and_then(rungs_at_or_above);
        let allowed_dedications = filter.dedication.map(dedications_at_or_above);

        let mut matched: BTreeMap<FacultyId, ()> = BTreeMap::new();
        for position in self.store.list_positions()? {
            if !position.tenure.tenure_track() {
                continue;
            }
            if let Some(categories) = &allowed_categories {
                if !categories.contains(&position.category) {
                    continue;
                }
            }
            if let Some(dedications) = &allowed_dedications {
                if !dedications.contains(&position.dedication) {
                    continue;
                }
            }
            matched.insert(position.faculty, ());
        }

        let mut entries = Vec::with_capacity(matched.len());
        for id in matched.into_keys() {
            let faculty = self
                .store
                .fetch_faculty(id)?
                .ok_or(RepositoryError::NotFound)?;
            entries.push(FacultyPickerEntry {
                id,
                surname: faculty.surname.to_uppercase(),
                given_name: title_case(&faculty.given_name),
                full_name: faculty.display_name(),
            });
        }
        entries.sort_by(|a, b| a.surname.cmp(&b.surname).then(a.given_name.cmp(&b.given_name)));
        Ok(entries)
    }
}

/// Selected rank plus everything above it. Ranks outside the ladder apply no
/// filter, matching the legacy picker behavior.
fn rungs_at_or_above(category: Category) -> Option<Vec<Category>> {
    let ladder = Category::ladder();
    ladder
        .iter()
        .position(|rung| *rung == category)
        .map(|start| ladder[start..].to_vec())
}

fn dedications_at_or_above(dedication: Dedication) -> Vec<Dedication> {
    let ladder = Dedication::ladder();
    let start = ladder
        .iter()
        .position(|rung| *rung == dedication)
        .unwrap_or(0);
    ladder[start..].to_vec()
}
