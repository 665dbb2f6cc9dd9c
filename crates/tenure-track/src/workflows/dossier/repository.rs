use crate::workflows::directory::{PositionId, RepositoryError};

use super::committee::Committee;
use super::domain::{Dossier, DossierId, Evaluation, EvaluationId, Form, FormId};

/// Storage abstraction for dossiers, their checklists, evaluation rounds, and
/// committees, so services can run against in-memory fixtures.
pub trait DossierStore: Send + Sync {
    fn insert_dossier(&self, dossier: Dossier) -> Result<Dossier, RepositoryError>;
    fn update_dossier(&self, dossier: Dossier) -> Result<(), RepositoryError>;
    fn fetch_dossier(&self, id: DossierId) -> Result<Option<Dossier>, RepositoryError>;
    fn dossier_for_position(
        &self,
        position: PositionId,
    ) -> Result<Option<Dossier>, RepositoryError>;
    fn find_by_docket(&self, docket: &str) -> Result<Option<Dossier>, RepositoryError>;
    fn list_dossiers(&self) -> Result<Vec<Dossier>, RepositoryError>;

    fn insert_form(&self, form: Form) -> Result<Form, RepositoryError>;
    fn update_form(&self, form: Form) -> Result<(), RepositoryError>;
    fn fetch_form(&self, id: FormId) -> Result<Option<Form>, RepositoryError>;
    fn forms_of(&self, dossier: DossierId) -> Result<Vec<Form>, RepositoryError>;

    fn insert_evaluation(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError>;
    fn update_evaluation(&self, evaluation: Evaluation) -> Result<(), RepositoryError>;
    fn fetch_evaluation(&self, id: EvaluationId)
        -> Result<Option<Evaluation>, RepositoryError>;
    fn evaluations_of(&self, dossier: DossierId) -> Result<Vec<Evaluation>, RepositoryError>;

    fn upsert_committee(&self, committee: Committee) -> Result<(), RepositoryError>;
    fn committee_of(&self, dossier: DossierId) -> Result<Option<Committee>, RepositoryError>;
}
