// libs/worklist-cell/src/services/worklist.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use shared_config::AppConfig;

use crate::backend::{RestWorklistBackend, WorklistBackend};
use crate::error::WorklistError;
use crate::models::{BookAppointmentRequest, ProjectedView, Provider, ViewFilters, WorklistSession};
use crate::services::projector::RoleViewProjector;
use crate::services::reconciler::RowReconciler;
use crate::services::status_catalog::StatusCatalog;
use crate::services::transition::{CommitOutcome, DeleteConfirmation, StatusTransitionCoordinator};
use crate::services::visit_history::{HistoryScope, VisitHistoryResolver};
use crate::store::{RowKey, RowStore};

/// Result of fetching and reconciling one day's appointments.
#[derive(Debug, Clone)]
pub struct LoadedDay {
    pub date: NaiveDate,
    pub store: RowStore,
    pub dropped: usize,
}

/// Wires the worklist components together for one signed-in session.
pub struct WorklistService {
    backend: Arc<dyn WorklistBackend>,
    session: WorklistSession,
    reconciler: RowReconciler,
    coordinator: StatusTransitionCoordinator,
    projector: RoleViewProjector,
    history: Arc<VisitHistoryResolver>,
    lab_suffix: String,
}

impl WorklistService {
    pub async fn connect(config: &AppConfig, session: WorklistSession) -> Self {
        let backend: Arc<dyn WorklistBackend> = Arc::new(RestWorklistBackend::new(config));
        Self::with_backend(backend, session, &config.lab_indicator_suffix).await
    }

    pub async fn with_backend(backend: Arc<dyn WorklistBackend>, session: WorklistSession, lab_suffix: &str) -> Self {
        let catalog = StatusCatalog::load(backend.as_ref(), &session.clinic_id).await;
        info!("Worklist ready for clinic {} ({:?} status catalog)", session.clinic_id, catalog.source());

        Self {
            reconciler: RowReconciler::new(catalog.clone()),
            coordinator: StatusTransitionCoordinator::new(Arc::clone(&backend), catalog),
            projector: RoleViewProjector::new(),
            history: Arc::new(history_for(&backend, &session, lab_suffix)),
            lab_suffix: lab_suffix.to_string(),
            backend,
            session,
        }
    }

    pub fn session(&self) -> &WorklistSession {
        &self.session
    }

    pub fn catalog(&self) -> &StatusCatalog {
        self.coordinator.catalog()
    }

    pub fn coordinator(&self) -> &StatusTransitionCoordinator {
        &self.coordinator
    }

    pub fn history(&self) -> Arc<VisitHistoryResolver> {
        Arc::clone(&self.history)
    }

    /// Switches the provider filter. Visit history is scoped by doctor, so
    /// the resolver starts over; the caller reloads the day afterwards.
    pub fn select_provider(&mut self, provider: Option<Provider>) {
        self.session.viewed_provider = provider;
        self.history = Arc::new(history_for(&self.backend, &self.session, &self.lab_suffix));
    }

    #[instrument(skip(self))]
    pub async fn load_day(&self, date: NaiveDate) -> Result<LoadedDay, WorklistError> {
        let doctor_id = worklist_doctor_id(&self.session);
        let records = self
            .backend
            .list_appointments(&doctor_id, &self.session.clinic_id, date)
            .await?;

        let report = self
            .reconciler
            .reconcile_all(&records, &self.session.reconcile_context());

        info!("Loaded {} rows for {} ({} dropped)", report.rows.len(), date, report.dropped);
        Ok(LoadedDay {
            date,
            store: RowStore::from_rows(report.rows),
            dropped: report.dropped,
        })
    }

    pub fn view(&self, store: &RowStore, filters: &ViewFilters) -> ProjectedView {
        self.projector.project(&store.rows(), self.session.user.role, filters)
    }

    pub fn stage_status(&self, store: &RowStore, key: RowKey, label: &str) -> Result<RowStore, WorklistError> {
        self.coordinator.stage_status(store, key, label)
    }

    pub fn stage_provider(&self, store: &RowStore, key: RowKey, label: &str) -> Result<RowStore, WorklistError> {
        self.coordinator.stage_provider(store, key, label)
    }

    pub fn stage_online_time(&self, store: &RowStore, key: RowKey, text: &str) -> Result<RowStore, WorklistError> {
        self.coordinator.stage_online_time(store, key, text)
    }

    pub fn discard(&self, store: &RowStore, key: RowKey) -> Result<RowStore, WorklistError> {
        self.coordinator.discard(store, key)
    }

    pub async fn commit(&self, store: &RowStore, key: RowKey) -> Result<(RowStore, CommitOutcome), WorklistError> {
        self.coordinator.commit(store, key, &self.session).await
    }

    pub async fn delete(
        &self,
        store: &RowStore,
        key: RowKey,
        confirmation: DeleteConfirmation,
    ) -> Result<RowStore, WorklistError> {
        self.coordinator.delete(store, key, &self.session, confirmation).await
    }

    /// Books against the currently loaded day, drops the patient's cached
    /// visit history, then reloads the booked day so the new row appears.
    pub async fn book_and_refresh(
        &self,
        day: &LoadedDay,
        request: &BookAppointmentRequest,
    ) -> Result<LoadedDay, WorklistError> {
        self.coordinator.book(&day.store, day.date, request).await?;
        self.history.invalidate(&request.patient_id).await;
        self.load_day(request.visit_date).await
    }
}

fn history_for(backend: &Arc<dyn WorklistBackend>, session: &WorklistSession, lab_suffix: &str) -> VisitHistoryResolver {
    let scope = HistoryScope {
        doctor_id: worklist_doctor_id(session),
        clinic_id: session.clinic_id.clone(),
        as_of: session.today,
    };
    VisitHistoryResolver::new(Arc::clone(backend), scope, lab_suffix)
}

/// Worklist owner: the provider being viewed, else the signed-in doctor.
fn worklist_doctor_id(session: &WorklistSession) -> String {
    session
        .viewed_provider
        .as_ref()
        .map(|provider| provider.doctor_id.clone())
        .or_else(|| session.user.is_doctor().then(|| session.user.id.clone()))
        .unwrap_or_default()
}
