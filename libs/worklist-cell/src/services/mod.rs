pub mod cache;
pub mod field_resolver;
pub mod projector;
pub mod reconciler;
pub mod status_catalog;
pub mod time_normalizer;
pub mod transition;
pub mod visit_history;
pub mod worklist;

pub use field_resolver::{Field, FieldResolver};
pub use projector::RoleViewProjector;
pub use reconciler::RowReconciler;
pub use status_catalog::{CatalogSource, StatusCatalog};
pub use time_normalizer::TimeNormalizer;
pub use transition::{CommitOutcome, DeleteConfirmation, StatusTransitionCoordinator};
pub use visit_history::{HistoryScope, VisitHistoryResolver};
pub use worklist::{LoadedDay, WorklistService};
