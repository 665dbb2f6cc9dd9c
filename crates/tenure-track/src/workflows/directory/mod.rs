//! Faculty, course, and position directory backing both workflows.

pub mod domain;
pub mod repository;
pub mod roster;
pub mod service;

pub use domain::{
    Category, Course, CourseId, Dedication, DeliveryTerm, EmailContact, Faculty, FacultyId,
    Position, PositionId, PositionStatus, Resolution, ResolutionAuthority, ResolutionId,
    ResolutionPurpose, StoredFile, Tenure,
};
pub use repository::{DirectoryStore, RepositoryError};
pub use roster::{RosterImport, RosterImportError, RosterImportSummary};
pub use service::{
    DirectoryService, DirectoryServiceError, FacultyFilter, FacultyPickerEntry, NewCourse,
    NewFaculty, NewPosition, NewResolution,
};
