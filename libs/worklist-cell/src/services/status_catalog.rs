// libs/worklist-cell/src/services/status_catalog.rs
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::WorklistBackend;
use crate::models::{KnownStatus, StatusId, StatusLabel, CHECK_OUT_LABEL};
use crate::services::field_resolver::{Field, FieldResolver};

const SYNONYMS: [(&str, &str); 3] = [
    ("ON CALL", "CONSULT ON CALL"),
    ("COMPLETED", "COMPLETE"),
    ("SAVED", "SAVE"),
];

/// Trim, upper-case and fold known synonyms. Everything else is kept verbatim.
pub fn fold_label(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

/// Where the active option list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Clinic,
    Global,
    BuiltIn,
}

/// Label ↔ id mapping plus the status options offered to staff.
#[derive(Debug, Clone)]
pub struct StatusCatalog {
    options: Vec<StatusLabel>,
    source: CatalogSource,
}

impl Default for StatusCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StatusCatalog {
    pub fn builtin() -> Self {
        Self {
            options: KnownStatus::ALL.iter().map(|status| status.label()).collect(),
            source: CatalogSource::BuiltIn,
        }
    }

    pub fn from_labels<I, S>(labels: I, source: CatalogSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options: Vec<StatusLabel> = Vec::new();
        for raw in labels {
            let label = StatusLabel::normalize(raw.as_ref());
            if !label.is_blank() && !options.contains(&label) {
                options.push(label);
            }
        }
        Self { options, source }
    }

    /// Clinic catalog, then the global one, then the built-in labels.
    pub async fn load(backend: &dyn WorklistBackend, clinic_id: &str) -> Self {
        match backend.status_catalog(clinic_id).await {
            Ok(payload) => {
                let labels = labels_from_payload(&payload);
                if !labels.is_empty() {
                    debug!("Loaded {} status labels for clinic {}", labels.len(), clinic_id);
                    return Self::from_labels(labels, CatalogSource::Clinic);
                }
                info!("Clinic {} has no status catalog, using global catalog", clinic_id);
            }
            Err(e) => warn!("Clinic status catalog unavailable for {}: {}", clinic_id, e),
        }

        match backend.global_status_catalog().await {
            Ok(payload) => {
                let labels = labels_from_payload(&payload);
                if !labels.is_empty() {
                    return Self::from_labels(labels, CatalogSource::Global);
                }
                warn!("Global status catalog is empty, using built-in labels");
            }
            Err(e) => warn!("Global status catalog unavailable: {}", e),
        }

        Self::builtin()
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn options(&self) -> &[StatusLabel] {
        &self.options
    }

    pub fn normalize_label(&self, raw: &str) -> StatusLabel {
        StatusLabel::normalize(raw)
    }

    pub fn to_id(&self, label: &StatusLabel) -> StatusId {
        label.id()
    }

    /// Convenience for raw text: normalizes before mapping.
    pub fn id_of(&self, raw: &str) -> StatusId {
        self.normalize_label(raw).id()
    }

    pub fn from_id(&self, id: StatusId) -> Option<StatusLabel> {
        KnownStatus::from_id(id).map(|status| status.label())
    }

    /// Presentation hint only.
    pub fn color_class(&self, label: &StatusLabel) -> &'static str {
        match label.known() {
            Some(KnownStatus::Waiting) => "status-waiting",
            Some(KnownStatus::WithDoctor) => "status-with-doctor",
            Some(KnownStatus::ConsultOnCall) => "status-on-call",
            Some(KnownStatus::WaitingForMedicine) => "status-medicine",
            Some(KnownStatus::Complete) => "status-complete",
            Some(KnownStatus::Submitted) => "status-submitted",
            Some(KnownStatus::WaitingForService) => "status-service-waiting",
            Some(KnownStatus::ServiceCompleted) => "status-service-complete",
            Some(KnownStatus::Save) => "status-save",
            Some(KnownStatus::Booked) => "status-booked",
            Some(KnownStatus::Future) => "status-future",
            Some(KnownStatus::SentForService) => "status-service-sent",
            None if label.as_str() == CHECK_OUT_LABEL => "status-check-out",
            None => "status-unmapped",
        }
    }

    /// Whether the treatment screen may be opened for a row in this status:
    /// WITH DOCTOR, CONSULT ON CALL or a saved draft.
    pub fn enables_treatment(&self, label: &StatusLabel) -> bool {
        matches!(
            label.known(),
            Some(KnownStatus::WithDoctor) | Some(KnownStatus::ConsultOnCall) | Some(KnownStatus::Save)
        )
    }
}

/// Catalog payloads arrive as bare strings or as objects carrying a label field.
pub fn labels_from_payload(payload: &[Value]) -> Vec<String> {
    payload
        .iter()
        .filter_map(|entry| match entry {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Object(_) => FieldResolver::text(entry, Field::CatalogLabel),
            _ => None,
        })
        .collect()
}
