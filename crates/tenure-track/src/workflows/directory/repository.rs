use super::domain::{
    Course, CourseId, EmailContact, Faculty, FacultyId, Position, PositionId, Resolution,
    ResolutionId,
};

/// Storage abstraction for the staff directory so services can be exercised
/// against in-memory fixtures.
pub trait DirectoryStore: Send + Sync {
    fn insert_faculty(&self, faculty: Faculty) -> Result<Faculty, RepositoryError>;
    fn fetch_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, RepositoryError>;
    fn list_faculty(&self) -> Result<Vec<Faculty>, RepositoryError>;

    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError>;
    fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError>;
    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError>;

    fn insert_position(&self, position: Position) -> Result<Position, RepositoryError>;
    fn update_position(&self, position: Position) -> Result<(), RepositoryError>;
    fn fetch_position(&self, id: PositionId) -> Result<Option<Position>, RepositoryError>;
    fn positions_of(&self, faculty: FacultyId) -> Result<Vec<Position>, RepositoryError>;
    fn list_positions(&self) -> Result<Vec<Position>, RepositoryError>;

    /// Insert or replace the contact identified by `(faculty, address)`.
    fn upsert_email(&self, contact: EmailContact) -> Result<(), RepositoryError>;
    fn emails_of(&self, faculty: FacultyId) -> Result<Vec<EmailContact>, RepositoryError>;

    fn insert_resolution(&self, resolution: Resolution) -> Result<Resolution, RepositoryError>;
    fn fetch_resolution(&self, id: ResolutionId)
        -> Result<Option<Resolution>, RepositoryError>;
    fn resolutions_of(&self, position: PositionId) -> Result<Vec<Resolution>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
