// libs/worklist-cell/src/services/transition.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::backend::WorklistBackend;
use crate::error::WorklistError;
use crate::models::{
    AppointmentRow, BookAppointmentRequest, DeleteAppointmentRequest, KnownStatus, Provider,
    StagedChange, UpdateAppointmentRequest, WorklistSession,
};
use crate::services::reconciler::build_timestamp;
use crate::services::status_catalog::StatusCatalog;
use crate::services::time_normalizer::TimeNormalizer;
use crate::store::{RowKey, RowStore};

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Row stays on the current worklist with its new committed values.
    Updated(RowKey),
    /// Row now belongs to another provider's worklist and left this view.
    Relocated { key: RowKey, provider: Provider },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteConfirmation {
    Confirmed,
    Declined,
}

/// Stage → commit lifecycle for worklist rows.
///
/// Staging is local and synchronous. Commit, delete and booking run every
/// local precondition before touching the network, and only a successful
/// commit clears staged edits.
pub struct StatusTransitionCoordinator {
    backend: Arc<dyn WorklistBackend>,
    catalog: StatusCatalog,
}

impl StatusTransitionCoordinator {
    pub fn new(backend: Arc<dyn WorklistBackend>, catalog: StatusCatalog) -> Self {
        Self { backend, catalog }
    }

    pub fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    // ---------------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------------

    pub fn stage_status(&self, store: &RowStore, key: RowKey, raw_label: &str) -> Result<RowStore, WorklistError> {
        let label = self.catalog.normalize_label(raw_label);
        if label.is_blank() {
            return Err(WorklistError::missing("Status"));
        }
        if !self.catalog.to_id(&label).is_mapped() {
            return Err(WorklistError::Validation(format!("Unknown status: {}", label)));
        }

        debug!("Staging status {} for row {}", label, key);
        store.updated(key, |row| {
            let pending = if label == row.status { None } else { Some(label) };
            edit_staged(row, |staged| staged.status = pending);
        })
    }

    pub fn stage_provider(&self, store: &RowStore, key: RowKey, label: &str) -> Result<RowStore, WorklistError> {
        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(WorklistError::missing("Provider"));
        }

        store.updated(key, |row| {
            let pending = if label.eq_ignore_ascii_case(row.provider.label.trim()) {
                None
            } else {
                Some(label)
            };
            edit_staged(row, |staged| staged.provider_label = pending);
        })
    }

    pub fn stage_online_time(&self, store: &RowStore, key: RowKey, text: &str) -> Result<RowStore, WorklistError> {
        let text = text.trim().to_string();
        store.updated(key, |row| {
            let pending = if text == row.online_time { None } else { Some(text) };
            edit_staged(row, |staged| staged.online_time = pending);
        })
    }

    /// Abandons every staged edit on the row.
    pub fn discard(&self, store: &RowStore, key: RowKey) -> Result<RowStore, WorklistError> {
        store.updated(key, |row| row.staged = None)
    }

    // ---------------------------------------------------------------------
    // Commit
    // ---------------------------------------------------------------------

    /// Resolves the provider a commit would send: the staged label looked up
    /// in the directory, or the row's committed provider.
    pub fn resolve_provider(&self, row: &AppointmentRow, session: &WorklistSession) -> Result<Provider, WorklistError> {
        let provider = match row.staged.as_ref().and_then(|staged| staged.provider_label.as_deref()) {
            Some(label) => session
                .providers
                .by_label(label)
                .cloned()
                .ok_or_else(|| WorklistError::Validation(format!("Unknown provider: {}", label)))?,
            None => row.provider.clone(),
        };

        if !provider.is_assigned() {
            return Err(WorklistError::missing("Provider"));
        }
        Ok(provider)
    }

    pub fn build_update(
        &self,
        row: &AppointmentRow,
        session: &WorklistSession,
    ) -> Result<(UpdateAppointmentRequest, Provider), WorklistError> {
        if row.patient_id.trim().is_empty() {
            return Err(WorklistError::missing("Patient id"));
        }
        if row.visit_number == 0 {
            return Err(WorklistError::missing("Visit number"));
        }
        if row.shift_id == 0 {
            return Err(WorklistError::missing("Shift"));
        }
        let clinic_id = first_non_blank(&row.clinic_id, &session.clinic_id)
            .ok_or_else(|| WorklistError::missing("Clinic id"))?;
        if session.user.id.trim().is_empty() {
            return Err(WorklistError::missing("Acting user"));
        }

        let status_id = match row.status_pending() {
            Some(pending) => {
                let id = self.catalog.to_id(pending);
                if !id.is_mapped() {
                    return Err(WorklistError::Validation(format!("Unknown status: {}", pending)));
                }
                Some(id)
            }
            None => Some(self.catalog.to_id(&row.status)).filter(|id| id.is_mapped()),
        };

        let provider = self.resolve_provider(row, session)?;
        let online_time = Some(row.display_online_time().trim().to_string()).filter(|text| !text.is_empty());

        Ok((
            UpdateAppointmentRequest {
                patient_id: row.patient_id.clone(),
                visit_number: row.visit_number,
                shift_id: row.shift_id,
                clinic_id,
                online_time,
                doctor_id: provider.doctor_id.clone(),
                status_id,
                acting_user_id: session.user.id.clone(),
            },
            provider,
        ))
    }

    /// Sends the row's staged edits. On failure the caller keeps its current
    /// snapshot, staged edits included, for a retry.
    #[instrument(skip(self, store, session))]
    pub async fn commit(
        &self,
        store: &RowStore,
        key: RowKey,
        session: &WorklistSession,
    ) -> Result<(RowStore, CommitOutcome), WorklistError> {
        let row = store.require(key)?;
        let (request, provider) = self.build_update(row, session)?;

        let ack = self.backend.update_appointment(&request).await?;
        if !ack.success {
            let reason = ack.reason();
            warn!("Update rejected for patient {} visit {}: {}", request.patient_id, request.visit_number, reason);
            return Err(if reason.to_ascii_lowercase().contains("not found") {
                WorklistError::NotFound(reason)
            } else {
                WorklistError::Rejected(reason)
            });
        }

        let committed = store.updated(key, |row| {
            if let Some(pending) = row.status_pending().cloned() {
                row.status = pending;
            }
            row.online_time = row.display_online_time().trim().to_string();
            row.provider = provider.clone();
            row.staged = None;
        })?;

        let relocated = session
            .viewed_provider
            .as_ref()
            .map(|viewed| !viewed.same_doctor(&provider))
            .unwrap_or(false);

        if relocated {
            info!("Row {} moved to provider {}", key, provider.doctor_id);
            let next = committed.removed(key)?;
            return Ok((next, CommitOutcome::Relocated { key, provider }));
        }

        info!("Committed patient {} visit {}", request.patient_id, request.visit_number);
        Ok((committed, CommitOutcome::Updated(key)))
    }

    // ---------------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------------

    /// The timestamp is today's date with the row's own time; any stored
    /// visit date on the row is ignored.
    pub fn build_delete(
        &self,
        row: &AppointmentRow,
        session: &WorklistSession,
    ) -> Result<DeleteAppointmentRequest, WorklistError> {
        if row.patient_id.trim().is_empty() {
            return Err(WorklistError::missing("Patient id"));
        }
        if !row.provider.is_assigned() {
            return Err(WorklistError::missing("Provider"));
        }
        let clinic_id = first_non_blank(&row.clinic_id, &session.clinic_id)
            .ok_or_else(|| WorklistError::missing("Clinic id"))?;

        let today = session.today.format("%Y-%m-%d").to_string();
        let time = TimeNormalizer::try_normalize(&row.visit_time)
            .ok_or_else(|| WorklistError::missing("Visit time"))?;
        let stamp = build_timestamp(&today, &time)
            .ok_or_else(|| WorklistError::Validation(format!("Invalid visit time: {}", row.visit_time)))?;

        Ok(DeleteAppointmentRequest {
            patient_id: row.patient_id.clone(),
            visit_timestamp: stamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            doctor_id: row.provider.doctor_id.clone(),
            clinic_id,
            acting_user_id: session.user.id.clone(),
        })
    }

    #[instrument(skip(self, store, session))]
    pub async fn delete(
        &self,
        store: &RowStore,
        key: RowKey,
        session: &WorklistSession,
        confirmation: DeleteConfirmation,
    ) -> Result<RowStore, WorklistError> {
        let row = store.require(key)?;
        let request = self.build_delete(row, session)?;

        if confirmation != DeleteConfirmation::Confirmed {
            debug!("Delete of row {} declined", key);
            return Err(WorklistError::NotConfirmed);
        }

        self.backend.delete_appointment(&request).await?;

        info!("Deleted appointment for patient {} at {}", request.patient_id, request.visit_timestamp);
        store.removed(key)
    }

    // ---------------------------------------------------------------------
    // Booking
    // ---------------------------------------------------------------------

    /// A patient with an open (not COMPLETE) appointment in the worklist
    /// loaded for `loaded_date` cannot be booked again on that date. Other
    /// dates are not checked here.
    pub fn check_can_book(
        &self,
        store: &RowStore,
        loaded_date: NaiveDate,
        request: &BookAppointmentRequest,
    ) -> Result<(), WorklistError> {
        if request.visit_date != loaded_date {
            return Ok(());
        }

        let open = store
            .iter()
            .map(|(_, row)| row)
            .find(|row| row.patient_id == request.patient_id && !row.status.is(KnownStatus::Complete));

        match open {
            Some(row) => Err(WorklistError::AlreadyBooked {
                patient_id: request.patient_id.clone(),
                status: row.status.to_string(),
            }),
            None => Ok(()),
        }
    }

    #[instrument(skip(self, store))]
    pub async fn book(
        &self,
        store: &RowStore,
        loaded_date: NaiveDate,
        request: &BookAppointmentRequest,
    ) -> Result<(), WorklistError> {
        if request.patient_id.trim().is_empty() {
            return Err(WorklistError::missing("Patient id"));
        }
        if request.doctor_id.trim().is_empty() {
            return Err(WorklistError::missing("Provider"));
        }
        if request.clinic_id.trim().is_empty() {
            return Err(WorklistError::missing("Clinic id"));
        }
        if request.shift_id == 0 {
            return Err(WorklistError::missing("Shift"));
        }
        let visit_time = TimeNormalizer::try_normalize(&request.visit_time)
            .ok_or_else(|| WorklistError::Validation(format!("Invalid visit time: {}", request.visit_time)))?;

        self.check_can_book(store, loaded_date, request)?;

        let request = BookAppointmentRequest {
            visit_time,
            ..request.clone()
        };
        let ack = self.backend.book_appointment(&request).await?;
        if !ack.success {
            let reason = ack.reason();
            warn!("Booking rejected for patient {}: {}", request.patient_id, reason);
            return Err(WorklistError::Rejected(reason));
        }

        info!("Booked patient {} on {} at {}", request.patient_id, request.visit_date, request.visit_time);
        Ok(())
    }
}

fn edit_staged<F>(row: &mut AppointmentRow, edit: F)
where
    F: FnOnce(&mut StagedChange),
{
    let mut staged = row.staged.take().unwrap_or_default();
    edit(&mut staged);
    row.staged = if staged.is_empty() { None } else { Some(staged) };
}

fn first_non_blank(primary: &str, secondary: &str) -> Option<String> {
    [primary, secondary]
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
