// libs/worklist-cell/src/services/projector.rs
use shared_models::UserRole;

use crate::models::{
    AppointmentRow, KnownStatus, ProjectedView, StatusCounts, StatusLabel, StatusTally, ViewFilters,
    CHECK_OUT_LABEL,
};

/// Statuses a doctor's worklist shows.
const DOCTOR_VISIBLE: [KnownStatus; 4] = [
    KnownStatus::Waiting,
    KnownStatus::WithDoctor,
    KnownStatus::ConsultOnCall,
    KnownStatus::Save,
];

/// Role-specific filter, order and tallies over the committed row set.
///
/// Only the committed status is consulted; a staged status never moves a
/// row between buckets until it is committed. Tallies are taken before the
/// free-text filters so badge counts do not change while staff type.
#[derive(Debug, Clone, Default)]
pub struct RoleViewProjector;

impl RoleViewProjector {
    pub fn new() -> Self {
        Self
    }

    pub fn project(&self, rows: &[AppointmentRow], role: UserRole, filters: &ViewFilters) -> ProjectedView {
        let in_role: Vec<&AppointmentRow> = rows.iter().filter(|row| self.role_admits(role, row)).collect();
        let counts = self.tally(role, &in_role);

        let mut visible: Vec<AppointmentRow> = in_role
            .into_iter()
            .filter(|row| matches_filters(row, filters))
            .cloned()
            .collect();

        // `sort_by_key` is stable, so ties keep backend order.
        visible.sort_by_key(|row| sort_rank(role, &row.status));

        ProjectedView { rows: visible, counts }
    }

    pub fn role_admits(&self, role: UserRole, row: &AppointmentRow) -> bool {
        match role {
            UserRole::Doctor => DOCTOR_VISIBLE.iter().any(|status| row.status.is(*status)),
            UserRole::Receptionist => true,
        }
    }

    pub fn buckets(&self, role: UserRole) -> Vec<StatusLabel> {
        match role {
            UserRole::Doctor => DOCTOR_VISIBLE.iter().map(|status| status.label()).collect(),
            UserRole::Receptionist => vec![
                KnownStatus::Waiting.label(),
                KnownStatus::WithDoctor.label(),
                KnownStatus::ConsultOnCall.label(),
                StatusLabel::normalize(CHECK_OUT_LABEL),
                KnownStatus::Complete.label(),
                KnownStatus::Save.label(),
            ],
        }
    }

    fn tally(&self, role: UserRole, rows: &[&AppointmentRow]) -> StatusCounts {
        let tallies = self
            .buckets(role)
            .into_iter()
            .map(|label| {
                let count = rows.iter().filter(|row| row.status == label).count();
                StatusTally { label, count }
            })
            .collect();
        StatusCounts { tallies }
    }
}

fn sort_rank(role: UserRole, status: &StatusLabel) -> u8 {
    match role {
        UserRole::Doctor => match status.known() {
            Some(KnownStatus::WithDoctor) => 0,
            Some(KnownStatus::ConsultOnCall) => 1,
            Some(KnownStatus::Waiting) | Some(KnownStatus::Save) => 2,
            _ => 3,
        },
        UserRole::Receptionist => {
            if status.is(KnownStatus::Waiting) {
                0
            } else {
                1
            }
        }
    }
}

fn matches_filters(row: &AppointmentRow, filters: &ViewFilters) -> bool {
    let contains = |haystack: &str, needle: &Option<String>| match needle.as_deref().map(str::trim) {
        Some(needle) if !needle.is_empty() => haystack.to_lowercase().contains(&needle.to_lowercase()),
        _ => true,
    };

    let status_ok = match filters.status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => row.status == StatusLabel::normalize(raw),
        _ => true,
    };

    contains(&row.patient_name, &filters.name) && contains(&row.contact, &filters.contact) && status_ok
}
