// libs/worklist-cell/src/services/visit_history.rs
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::backend::WorklistBackend;
use crate::error::WorklistError;
use crate::models::{LastVisit, LastVisitSummary, StatusId, StatusLabel, VisitHistoryEntry};
use crate::services::cache::{LazyCache, Lookup};
use crate::services::field_resolver::{parse_flag, parse_leading_u32, Field, FieldResolver};
use crate::services::reconciler::normalize_date;
use crate::services::time_normalizer::{TimeNormalizer, FALLBACK_TIME};

pub const LOADING_TEXT: &str = "Loading...";
pub const NO_VISIT_TEXT: &str = "No previous visit";

/// Identifiers every history lookup is scoped by.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryScope {
    pub doctor_id: String,
    pub clinic_id: String,
    pub as_of: NaiveDate,
}

/// Lazily fetches and caches each patient's most recent valid visit, plus an
/// independently cached lab-indicator flag used when rendering it.
pub struct VisitHistoryResolver {
    backend: Arc<dyn WorklistBackend>,
    scope: HistoryScope,
    lab_suffix: String,
    history: LazyCache<Option<LastVisitSummary>>,
    lab_flags: LazyCache<bool>,
}

impl VisitHistoryResolver {
    pub fn new(backend: Arc<dyn WorklistBackend>, scope: HistoryScope, lab_suffix: impl Into<String>) -> Self {
        Self {
            backend,
            scope,
            lab_suffix: lab_suffix.into(),
            history: LazyCache::new(),
            lab_flags: LazyCache::new(),
        }
    }

    pub fn scope(&self) -> &HistoryScope {
        &self.scope
    }

    /// Cached answer, or `Loading` while the first fetch for the patient runs.
    pub async fn get_last_visit(&self, patient_id: &str) -> LastVisit {
        let lookup = self
            .history
            .lookup_or_spawn(patient_id, || self.history_fetch(patient_id))
            .await;
        match lookup {
            Lookup::Loading => LastVisit::Loading,
            Lookup::Ready(found) => to_last_visit(found),
        }
    }

    /// Waits for the answer. A failed fetch reads as no visit and is retried
    /// on the next demand.
    pub async fn load_last_visit(&self, patient_id: &str) -> LastVisit {
        match self.history.resolve(patient_id, || self.history_fetch(patient_id)).await {
            Ok(found) => to_last_visit(found),
            Err(_) => LastVisit::NoVisit,
        }
    }

    /// `None` until the lab lookup for the patient has landed.
    pub async fn lab_indicator(&self, patient_id: &str) -> Option<bool> {
        match self
            .lab_flags
            .lookup_or_spawn(patient_id, || self.lab_fetch(patient_id))
            .await
        {
            Lookup::Ready(flag) => Some(flag),
            Lookup::Loading => None,
        }
    }

    pub async fn load_lab_indicator(&self, patient_id: &str) -> bool {
        self.lab_flags
            .resolve(patient_id, || self.lab_fetch(patient_id))
            .await
            .unwrap_or(false)
    }

    /// Display text for the "last visit" column.
    pub async fn render_last_visit(&self, patient_id: &str) -> String {
        match self.get_last_visit(patient_id).await {
            LastVisit::Loading => LOADING_TEXT.to_string(),
            LastVisit::NoVisit => NO_VISIT_TEXT.to_string(),
            LastVisit::Visit(summary) => {
                let flagged = self.lab_indicator(patient_id).await.unwrap_or(false);
                render_summary(&summary, if flagged { Some(self.lab_suffix.as_str()) } else { None })
            }
        }
    }

    /// Drops both cached entries for the patient, e.g. after a new booking.
    pub async fn invalidate(&self, patient_id: &str) {
        self.history.invalidate(patient_id).await;
        self.lab_flags.invalidate(patient_id).await;
    }

    pub async fn invalidate_all(&self) {
        self.history.clear().await;
        self.lab_flags.clear().await;
    }

    fn history_fetch(
        &self,
        patient_id: &str,
    ) -> futures::future::BoxFuture<'static, Result<Option<LastVisitSummary>, WorklistError>> {
        let backend = Arc::clone(&self.backend);
        let scope = self.scope.clone();
        let patient_id = patient_id.to_string();
        async move {
            debug!("Fetching visit history for patient {}", patient_id);
            let records = backend
                .visit_history(&patient_id, &scope.doctor_id, &scope.clinic_id, scope.as_of)
                .await?;
            let entries = parse_entries(&records);
            Ok(latest_valid(&entries).map(LastVisitSummary::from))
        }
        .boxed()
    }

    fn lab_fetch(&self, patient_id: &str) -> futures::future::BoxFuture<'static, Result<bool, WorklistError>> {
        let backend = Arc::clone(&self.backend);
        let clinic_id = self.scope.clinic_id.clone();
        let patient_id = patient_id.to_string();
        async move {
            let details = backend.last_visit_details(&patient_id, &clinic_id).await?;
            Ok(lab_flag_from_details(&details))
        }
        .boxed()
    }
}

fn to_last_visit(found: Option<LastVisitSummary>) -> LastVisit {
    match found {
        Some(summary) => LastVisit::Visit(summary),
        None => LastVisit::NoVisit,
    }
}

pub fn render_summary(summary: &LastVisitSummary, suffix: Option<&str>) -> String {
    format!(
        "{} {}{}",
        summary.date.format("%d-%m-%Y"),
        summary.time,
        suffix.unwrap_or("")
    )
}

/// A record is a valid visit only with a date, a doctor and a visit number.
pub fn parse_entry(raw: &Value) -> Option<VisitHistoryEntry> {
    let date_text = FieldResolver::text(raw, Field::VisitDate)?;
    let date = normalize_date(&date_text)?;
    let doctor_id = FieldResolver::text(raw, Field::DoctorId)?;
    let visit_number = FieldResolver::field(raw, Field::VisitNumber)
        .and_then(parse_leading_u32)
        .filter(|number| *number > 0)?;

    let time = match FieldResolver::field(raw, Field::VisitTime) {
        Some(value) => TimeNormalizer::normalize_value(value),
        None => TimeNormalizer::try_normalize(&date_text).unwrap_or_else(|| FALLBACK_TIME.to_string()),
    };

    let status_id = FieldResolver::field(raw, Field::StatusId)
        .and_then(parse_leading_u32)
        .and_then(|id| i32::try_from(id).ok())
        .map(StatusId)
        .or_else(|| FieldResolver::text(raw, Field::StatusLabel).map(|label| StatusLabel::normalize(&label).id()))
        .unwrap_or(StatusId::UNMAPPED);

    Some(VisitHistoryEntry {
        date,
        time,
        doctor_id,
        visit_number,
        status_id,
        clinical: raw.as_object().cloned().unwrap_or_default(),
    })
}

pub fn parse_entries(records: &[Value]) -> Vec<VisitHistoryEntry> {
    records.iter().filter_map(parse_entry).collect()
}

/// Most recent by date; ties keep the first in backend order.
pub fn latest_valid(entries: &[VisitHistoryEntry]) -> Option<&VisitHistoryEntry> {
    entries.iter().fold(None, |best: Option<&VisitHistoryEntry>, entry| match best {
        Some(current) if entry.date <= current.date => Some(current),
        _ => Some(entry),
    })
}

pub fn lab_flag_from_details(details: &Value) -> bool {
    match FieldResolver::field(details, Field::LabIndicator) {
        Some(Value::String(text)) => parse_flag(&Value::String(text.clone())).unwrap_or(true),
        Some(Value::Object(fields)) => !fields.is_empty(),
        Some(value) => parse_flag(value).unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_valid_prefers_first_on_tie() {
        let entries = parse_entries(&[
            json!({ "visit_date": "2024-02-01", "doctor_id": "D1", "visit_number": 4 }),
            json!({ "visit_date": "2024-02-01", "doctor_id": "D2", "visit_number": 3 }),
            json!({ "visit_date": "2024-01-10", "doctor_id": "D1", "visit_number": 2 }),
        ]);
        let latest = latest_valid(&entries).unwrap();
        assert_eq!(latest.doctor_id, "D1");
        assert_eq!(latest.visit_number, 4);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let entries = parse_entries(&[
            json!({ "visit_date": "2024-02-01", "visit_number": 4 }),
            json!({ "doctor_id": "D1", "visit_number": 4 }),
            json!({ "visit_date": "2024-02-01", "doctor_id": "D1" }),
            json!({ "visit_date": "2024-02-01", "doctor_id": "D1", "visit_number": 0 }),
        ]);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_lab_flag_variants() {
        assert!(lab_flag_from_details(&json!({ "lab_tests": ["CBC"] })));
        assert!(lab_flag_from_details(&json!({ "lab_tests": "CBC, LFT" })));
        assert!(!lab_flag_from_details(&json!({ "lab_tests": [] })));
        assert!(!lab_flag_from_details(&json!({ "lab_required": "no" })));
        assert!(!lab_flag_from_details(&json!({})));
    }
}
