// libs/worklist-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use shared_models::SessionUser;

use crate::services::status_catalog;

// ==============================================================================
// STATUS MODEL
// ==============================================================================

/// Numeric workflow status understood by the backend. Labels outside the
/// closed catalog map to [`StatusId::UNMAPPED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(pub i32);

impl StatusId {
    pub const UNMAPPED: StatusId = StatusId(-1);

    pub fn is_mapped(&self) -> bool {
        *self != Self::UNMAPPED
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed, ordered status catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownStatus {
    Waiting,
    WithDoctor,
    ConsultOnCall,
    WaitingForMedicine,
    Complete,
    Submitted,
    WaitingForService,
    ServiceCompleted,
    Save,
    Booked,
    Future,
    SentForService,
}

impl KnownStatus {
    pub const ALL: [KnownStatus; 12] = [
        KnownStatus::Waiting,
        KnownStatus::WithDoctor,
        KnownStatus::ConsultOnCall,
        KnownStatus::WaitingForMedicine,
        KnownStatus::Complete,
        KnownStatus::Submitted,
        KnownStatus::WaitingForService,
        KnownStatus::ServiceCompleted,
        KnownStatus::Save,
        KnownStatus::Booked,
        KnownStatus::Future,
        KnownStatus::SentForService,
    ];

    pub fn id(&self) -> StatusId {
        StatusId(match self {
            KnownStatus::Waiting => 1,
            KnownStatus::WithDoctor => 2,
            KnownStatus::ConsultOnCall => 3,
            KnownStatus::WaitingForMedicine => 4,
            KnownStatus::Complete => 5,
            KnownStatus::Submitted => 6,
            KnownStatus::WaitingForService => 7,
            KnownStatus::ServiceCompleted => 8,
            KnownStatus::Save => 9,
            KnownStatus::Booked => 10,
            KnownStatus::Future => 11,
            KnownStatus::SentForService => 12,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownStatus::Waiting => "WAITING",
            KnownStatus::WithDoctor => "WITH DOCTOR",
            KnownStatus::ConsultOnCall => "CONSULT ON CALL",
            KnownStatus::WaitingForMedicine => "WAITING FOR MEDICINE",
            KnownStatus::Complete => "COMPLETE",
            KnownStatus::Submitted => "SUBMITTED",
            KnownStatus::WaitingForService => "WAITING FOR SERVICE",
            KnownStatus::ServiceCompleted => "SERVICE COMPLETED",
            KnownStatus::Save => "SAVE",
            KnownStatus::Booked => "BOOKED",
            KnownStatus::Future => "FUTURE",
            KnownStatus::SentForService => "SENT FOR SERVICE",
        }
    }

    pub fn from_id(id: StatusId) -> Option<KnownStatus> {
        Self::ALL.iter().copied().find(|status| status.id() == id)
    }

    pub fn from_label(label: &str) -> Option<KnownStatus> {
        Self::ALL.iter().copied().find(|status| status.as_str() == label)
    }

    pub fn label(&self) -> StatusLabel {
        StatusLabel(self.as_str().to_string())
    }
}

impl fmt::Display for KnownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized status label: trimmed, upper-cased, synonyms folded.
///
/// The only way to build one is through normalization, so a raw backend
/// string can never be compared against a normalized label by accident.
/// Labels outside the catalog are kept verbatim (upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StatusLabel(String);

impl StatusLabel {
    pub fn normalize(raw: &str) -> Self {
        StatusLabel(status_catalog::fold_label(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn known(&self) -> Option<KnownStatus> {
        KnownStatus::from_label(&self.0)
    }

    pub fn id(&self) -> StatusId {
        self.known().map(|status| status.id()).unwrap_or(StatusId::UNMAPPED)
    }

    pub fn is(&self, status: KnownStatus) -> bool {
        self.known() == Some(status)
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for StatusLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(StatusLabel::normalize(&raw))
    }
}

impl From<KnownStatus> for StatusLabel {
    fn from(status: KnownStatus) -> Self {
        status.label()
    }
}

impl PartialEq<KnownStatus> for StatusLabel {
    fn eq(&self, other: &KnownStatus) -> bool {
        self.is(*other)
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Front-desk tally bucket for checked-out patients. It has no numeric id.
pub const CHECK_OUT_LABEL: &str = "CHECK OUT";

// ==============================================================================
// PROVIDERS
// ==============================================================================

/// A provider identifier and its display label, always updated together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Provider {
    pub doctor_id: String,
    pub label: String,
}

impl Provider {
    pub fn new(doctor_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            label: label.into(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        !self.doctor_id.trim().is_empty()
    }

    pub fn same_doctor(&self, other: &Provider) -> bool {
        self.doctor_id.trim().eq_ignore_ascii_case(other.doctor_id.trim())
    }
}

/// Known providers for the clinic, used to resolve an edited label back to an id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDirectory {
    providers: Vec<Provider>,
}

impl ProviderDirectory {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn by_label(&self, label: &str) -> Option<&Provider> {
        let wanted = label.trim();
        self.providers
            .iter()
            .find(|provider| provider.label.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn by_id(&self, doctor_id: &str) -> Option<&Provider> {
        let wanted = doctor_id.trim();
        self.providers
            .iter()
            .find(|provider| provider.doctor_id.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }
}

// ==============================================================================
// CANONICAL ROW
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Billing {
    pub billed: f64,
    pub discount: f64,
    pub dues: f64,
    pub collected: f64,
    pub balance: f64,
}

/// Local edits waiting for a successful commit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StagedChange {
    pub status: Option<StatusLabel>,
    pub provider_label: Option<String>,
    pub online_time: Option<String>,
}

impl StagedChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.provider_label.is_none() && self.online_time.is_none()
    }
}

/// Per-row position in the stage/commit lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPhase {
    Committed(StatusLabel),
    Staged { committed: StatusLabel, pending: StatusLabel },
}

/// One scheduled encounter on the current worklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub appointment_id: Option<String>,
    pub patient_id: String,
    pub patient_name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
    /// Canonical `HH:mm`.
    pub visit_time: String,
    pub visit_date: String,
    pub visit_at: Option<NaiveDateTime>,
    pub provider: Provider,
    pub visit_number: u32,
    pub shift_id: u32,
    pub clinic_id: String,
    pub online_time: String,
    pub status: StatusLabel,
    pub staged: Option<StagedChange>,
    pub reports_received: bool,
    pub visit_details_submitted: bool,
    pub billing: Billing,
}

impl AppointmentRow {
    pub fn doctor_id(&self) -> &str {
        &self.provider.doctor_id
    }

    pub fn provider_label(&self) -> &str {
        &self.provider.label
    }

    pub fn status_pending(&self) -> Option<&StatusLabel> {
        self.staged.as_ref().and_then(|staged| staged.status.as_ref())
    }

    /// Badge shown to the user: a staged status wins over the committed one.
    pub fn display_status(&self) -> &StatusLabel {
        self.status_pending().unwrap_or(&self.status)
    }

    /// Provider label as currently edited (staged label if any).
    pub fn display_provider_label(&self) -> &str {
        self.staged
            .as_ref()
            .and_then(|staged| staged.provider_label.as_deref())
            .unwrap_or(&self.provider.label)
    }

    pub fn display_online_time(&self) -> &str {
        self.staged
            .as_ref()
            .and_then(|staged| staged.online_time.as_deref())
            .unwrap_or(&self.online_time)
    }

    pub fn phase(&self) -> RowPhase {
        match self.status_pending() {
            Some(pending) => RowPhase::Staged {
                committed: self.status.clone(),
                pending: pending.clone(),
            },
            None => RowPhase::Committed(self.status.clone()),
        }
    }

    pub fn has_staged_changes(&self) -> bool {
        self.staged.as_ref().map(|staged| !staged.is_empty()).unwrap_or(false)
    }
}

// ==============================================================================
// RECONCILIATION CONTEXT
// ==============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    /// Provider whose worklist is being viewed; default attribution for rows.
    pub selected_provider: Option<Provider>,
    pub clinic_id: String,
    pub session_doctor_id: Option<String>,
    /// Resolves a doctor name on the record to its identifier.
    pub providers: ProviderDirectory,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub rows: Vec<AppointmentRow>,
    /// Records that yielded no usable patient id.
    pub dropped: usize,
}

// ==============================================================================
// WORKLIST SESSION
// ==============================================================================

/// Everything a write command needs to know about who is acting and where.
#[derive(Debug, Clone)]
pub struct WorklistSession {
    pub user: SessionUser,
    pub clinic_id: String,
    pub viewed_provider: Option<Provider>,
    pub providers: ProviderDirectory,
    pub today: NaiveDate,
}

impl WorklistSession {
    pub fn reconcile_context(&self) -> ReconcileContext {
        ReconcileContext {
            selected_provider: self.viewed_provider.clone(),
            clinic_id: self.clinic_id.clone(),
            session_doctor_id: if self.user.is_doctor() {
                Some(self.user.id.clone())
            } else {
                None
            },
            providers: self.providers.clone(),
        }
    }
}

// ==============================================================================
// BACKEND REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_id: String,
    pub visit_number: u32,
    pub shift_id: u32,
    pub clinic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_time: Option<String>,
    pub doctor_id: String,
    /// Absent when the committed status has no catalog id and no status
    /// change is staged; the backend keeps the status it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<StatusId>,
    pub acting_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAppointmentRequest {
    pub patient_id: String,
    /// `YYYY-MM-DDTHH:mm:00`
    pub visit_timestamp: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub acting_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub visit_date: NaiveDate,
    pub shift_id: u32,
    pub clinic_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub visit_time: String,
    pub reports_received: bool,
    pub in_person: bool,
}

/// `{success, message?}` / `{success, error?}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BackendAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request was not accepted".to_string())
    }
}

// ==============================================================================
// VISIT HISTORY
// ==============================================================================

/// One valid historical encounter. Invalid records never become entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitHistoryEntry {
    pub date: NaiveDate,
    pub time: String,
    pub doctor_id: String,
    pub visit_number: u32,
    pub status_id: StatusId,
    /// Prescriptions, vitals, billing and so on, passed through untouched.
    pub clinical: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastVisitSummary {
    pub date: NaiveDate,
    pub time: String,
    pub doctor_id: String,
    pub visit_number: u32,
    pub status_id: StatusId,
}

impl From<&VisitHistoryEntry> for LastVisitSummary {
    fn from(entry: &VisitHistoryEntry) -> Self {
        Self {
            date: entry.date,
            time: entry.time.clone(),
            doctor_id: entry.doctor_id.clone(),
            visit_number: entry.visit_number,
            status_id: entry.status_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LastVisit {
    Loading,
    NoVisit,
    Visit(LastVisitSummary),
}

// ==============================================================================
// ROLE PROJECTION
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewFilters {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTally {
    pub label: StatusLabel,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub tallies: Vec<StatusTally>,
}

impl StatusCounts {
    pub fn count_of(&self, label: &str) -> usize {
        let wanted = StatusLabel::normalize(label);
        self.tallies
            .iter()
            .find(|tally| tally.label == wanted)
            .map(|tally| tally.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.tallies.iter().map(|tally| tally.count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectedView {
    pub rows: Vec<AppointmentRow>,
    pub counts: StatusCounts,
}
