// libs/worklist-cell/src/services/reconciler.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    AppointmentRow, Billing, KnownStatus, Provider, ReconcileContext, ReconcileReport, StatusId,
    StatusLabel,
};
use crate::services::field_resolver::{parse_leading_u32, Field, FieldResolver, ALIAS_TABLE_VERSION};
use crate::services::status_catalog::StatusCatalog;
use crate::services::time_normalizer::TimeNormalizer;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DOCTOR_ID_PREFIXES: [&str; 7] = ["DOCTOR_", "DOCTOR-", "DOC_", "DOC-", "DR_", "DR-", "DR."];

/// Converts raw appointment records of any known backend shape into rows.
#[derive(Debug, Clone, Default)]
pub struct RowReconciler {
    catalog: StatusCatalog,
}

impl RowReconciler {
    pub fn new(catalog: StatusCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    /// `None` when the record has no usable patient id; never panics or errors
    /// on malformed fields.
    pub fn reconcile(&self, raw: &Value, ctx: &ReconcileContext) -> Option<AppointmentRow> {
        let patient_id = FieldResolver::text(raw, Field::PatientId)?;
        let appointment_id = FieldResolver::text(raw, Field::AppointmentId);

        let visit_date = resolve_date(raw);
        let visit_time = resolve_time(raw);
        let visit_at = visit_date
            .as_deref()
            .and_then(|date| build_timestamp(date, &visit_time));

        Some(AppointmentRow {
            appointment_id,
            patient_id,
            patient_name: resolve_name(raw),
            age: FieldResolver::unsigned_or(raw, Field::Age, 0),
            gender: FieldResolver::text_or(raw, Field::Gender, ""),
            contact: FieldResolver::text_or(raw, Field::Contact, ""),
            visit_time,
            visit_date: visit_date.unwrap_or_default(),
            visit_at,
            provider: resolve_provider(raw, ctx),
            visit_number: FieldResolver::unsigned_or(raw, Field::VisitNumber, 0),
            shift_id: FieldResolver::unsigned_or(raw, Field::ShiftId, 0),
            clinic_id: FieldResolver::text(raw, Field::ClinicId).unwrap_or_else(|| ctx.clinic_id.clone()),
            online_time: FieldResolver::text_or(raw, Field::OnlineTime, ""),
            status: self.resolve_status(raw),
            staged: None,
            reports_received: FieldResolver::flag_or(raw, Field::ReportsReceived, false),
            visit_details_submitted: FieldResolver::flag_or(raw, Field::VisitDetailsSubmitted, false),
            billing: resolve_billing(raw),
        })
    }

    pub fn reconcile_all(&self, records: &[Value], ctx: &ReconcileContext) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for raw in records {
            match self.reconcile(raw, ctx) {
                Some(row) => report.rows.push(row),
                None => report.dropped += 1,
            }
        }

        if report.dropped > 0 {
            warn!("Dropped {} appointment records without a patient id", report.dropped);
        }
        debug!("Reconciled {} appointment rows (alias table v{})", report.rows.len(), ALIAS_TABLE_VERSION);
        report
    }

    fn resolve_status(&self, raw: &Value) -> StatusLabel {
        if let Some(value) = FieldResolver::field(raw, Field::StatusLabel) {
            // A bare number under a label alias is a status id.
            if value.is_number() {
                return self.label_for_id(value);
            }
            if let Some(label) = FieldResolver::text(raw, Field::StatusLabel) {
                return self.catalog.normalize_label(&label);
            }
        }
        // Some feeds only carry the numeric id.
        if let Some(value) = FieldResolver::field(raw, Field::StatusId) {
            return self.label_for_id(value);
        }
        KnownStatus::Waiting.label()
    }

    /// Catalog label for an id value; anything unreadable is kept as sent,
    /// upper-cased and unmapped.
    fn label_for_id(&self, value: &Value) -> StatusLabel {
        let id = parse_leading_u32(value)
            .and_then(|id| i32::try_from(id).ok())
            .map(StatusId);
        match id {
            Some(id) => self
                .catalog
                .from_id(id)
                .unwrap_or_else(|| self.catalog.normalize_label(&id.to_string())),
            None => {
                let raw = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                self.catalog.normalize_label(&raw)
            }
        }
    }
}

/// Composed first/middle/last wins when all three are present.
fn resolve_name(raw: &Value) -> String {
    let first = FieldResolver::text(raw, Field::FirstName);
    let middle = FieldResolver::text(raw, Field::MiddleName);
    let last = FieldResolver::text(raw, Field::LastName);

    if let (Some(first), Some(middle), Some(last)) = (&first, &middle, &last) {
        return format!("{} {} {}", first, middle, last);
    }
    if let Some(full) = FieldResolver::text(raw, Field::FullName) {
        return full;
    }
    [first, middle, last]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_date(raw: &Value) -> Option<String> {
    let text = FieldResolver::text(raw, Field::VisitDate)?;
    Some(
        normalize_date(&text)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or(text),
    )
}

fn resolve_time(raw: &Value) -> String {
    if let Some(value) = FieldResolver::field(raw, Field::VisitTime) {
        return TimeNormalizer::normalize_value(value);
    }
    // A full datetime in the date field still carries the time.
    FieldResolver::text(raw, Field::VisitDate)
        .and_then(|text| TimeNormalizer::try_normalize(&text))
        .unwrap_or_else(|| crate::services::time_normalizer::FALLBACK_TIME.to_string())
}

pub fn normalize_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(head, format).ok())
}

/// `date + "T" + time + ":00"`.
pub fn build_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{}T{}:00", date, time), "%Y-%m-%dT%H:%M:%S").ok()
}

/// Id and label always name the same provider. A doctor name that cannot be
/// tied to an id yields an unassigned provider, which writes reject.
fn resolve_provider(raw: &Value, ctx: &ReconcileContext) -> Provider {
    let raw_id = FieldResolver::text(raw, Field::DoctorId);

    if let Some(name) = FieldResolver::text(raw, Field::DoctorName) {
        if let Some(doctor_id) = raw_id {
            return Provider::new(doctor_id, name);
        }
        if let Some(known) = ctx.providers.by_label(&name) {
            return known.clone();
        }
        if let Some(selected) = &ctx.selected_provider {
            if selected.label.trim().eq_ignore_ascii_case(name.trim()) {
                return selected.clone();
            }
        }
        debug!("No provider id for doctor name {}", name);
        return Provider::new(String::new(), name);
    }

    if let Some(selected) = &ctx.selected_provider {
        let matches_selected = raw_id
            .as_deref()
            .map(|id| id.trim().eq_ignore_ascii_case(selected.doctor_id.trim()))
            .unwrap_or(true);
        if matches_selected {
            return selected.clone();
        }
    }

    match raw_id.or_else(|| ctx.session_doctor_id.clone()) {
        Some(doctor_id) => match ctx.providers.by_id(&doctor_id) {
            Some(known) => known.clone(),
            None => {
                let label = format_provider_label(&doctor_id);
                Provider::new(doctor_id, label)
            }
        },
        None => Provider::default(),
    }
}

/// Display label built from a bare doctor identifier: `DR_ANIL_RAO` → `Anil Rao`.
pub fn format_provider_label(doctor_id: &str) -> String {
    let trimmed = doctor_id.trim();
    let upper = trimmed.to_ascii_uppercase();
    let stripped = DOCTOR_ID_PREFIXES
        .iter()
        .find(|prefix| upper.starts_with(*prefix))
        .map(|prefix| &trimmed[prefix.len()..])
        .unwrap_or(trimmed);

    let label = stripped
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(titlecase)
        .collect::<Vec<_>>()
        .join(" ");

    if label.is_empty() {
        trimmed.to_string()
    } else {
        label
    }
}

fn titlecase(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn resolve_billing(raw: &Value) -> Billing {
    Billing {
        billed: FieldResolver::number_or(raw, Field::BilledAmount, 0.0),
        discount: FieldResolver::number_or(raw, Field::DiscountAmount, 0.0),
        dues: FieldResolver::number_or(raw, Field::DuesAmount, 0.0),
        collected: FieldResolver::number_or(raw, Field::CollectedAmount, 0.0),
        balance: FieldResolver::number_or(raw, Field::BalanceAmount, 0.0),
    }
}
