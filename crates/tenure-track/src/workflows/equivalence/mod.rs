//! Credit-equivalence workflow for transfer students: requests routed per
//! course to the responsible faculty, rulings, and the signed-act closeout.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;


pub use domain::{
    EquivalenceRequest, ItemId, ItemStatus, RequestId, RequestItem, RequestStatus, RosterEntry,
    Student, StudentId,
};
pub use repository::EquivalenceStore;
pub use router::equivalence_router;
pub use service::{
    CreateRequest, DispatchOutcome, EquivalenceService, EquivalenceServiceError, NewStudent,
    RequestDetail, RequestSummary, RulingIntake,
};
pub use stats::EquivalenceStatistics;
