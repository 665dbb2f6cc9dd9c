use crate::workflows::directory::{CourseId, RepositoryError};

use super::domain::{
    EquivalenceRequest, ItemId, RequestId, RequestItem, RosterEntry, Student, StudentId,
};

/// Storage abstraction for the equivalence workflow.
pub trait EquivalenceStore: Send + Sync {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn fetch_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    fn find_student_by_identity(
        &self,
        identity_document: &str,
    ) -> Result<Option<Student>, RepositoryError>;
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;

    fn insert_request(
        &self,
        request: EquivalenceRequest,
    ) -> Result<EquivalenceRequest, RepositoryError>;
    fn update_request(&self, request: EquivalenceRequest) -> Result<(), RepositoryError>;
    fn fetch_request(
        &self,
        id: RequestId,
    ) -> Result<Option<EquivalenceRequest>, RepositoryError>;
    fn list_requests(&self) -> Result<Vec<EquivalenceRequest>, RepositoryError>;

    fn insert_item(&self, item: RequestItem) -> Result<RequestItem, RepositoryError>;
    fn update_item(&self, item: RequestItem) -> Result<(), RepositoryError>;
    fn fetch_item(&self, id: ItemId) -> Result<Option<RequestItem>, RepositoryError>;
    fn items_of(&self, request: RequestId) -> Result<Vec<RequestItem>, RepositoryError>;
    fn list_items(&self) -> Result<Vec<RequestItem>, RepositoryError>;

    fn upsert_roster_entry(&self, entry: RosterEntry) -> Result<(), RepositoryError>;
    fn roster_entry(&self, course: CourseId) -> Result<Option<RosterEntry>, RepositoryError>;
    fn list_roster(&self) -> Result<Vec<RosterEntry>, RepositoryError>;
}
