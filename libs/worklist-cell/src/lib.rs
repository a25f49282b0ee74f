// =====================================================================================
// WORKLIST CELL - APPOINTMENT RECONCILIATION & STATUS WORKFLOW
// =====================================================================================

pub mod backend;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use backend::{RestWorklistBackend, WorklistBackend};
pub use error::WorklistError;
pub use models::*;
pub use services::*;
pub use store::{RowKey, RowStore};
