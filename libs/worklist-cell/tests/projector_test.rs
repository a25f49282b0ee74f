mod common;

use common::{dr_rao, row};
use shared_models::UserRole;
use worklist_cell::{
    AppointmentRow, KnownStatus, RoleViewProjector, StagedChange, StatusLabel, ViewFilters,
};

fn day() -> Vec<AppointmentRow> {
    vec![
        row("P1", "WAITING", dr_rao()),
        row("P2", "COMPLETE", dr_rao()),
        row("P3", "WITH DOCTOR", dr_rao()),
        row("P4", "SAVE", dr_rao()),
        row("P5", "CONSULT ON CALL", dr_rao()),
        row("P6", "WAITING", dr_rao()),
        row("P7", "CHECK OUT", dr_rao()),
    ]
}

fn ids(rows: &[AppointmentRow]) -> Vec<&str> {
    rows.iter().map(|row| row.patient_id.as_str()).collect()
}

#[test]
fn test_doctor_view_filters_and_orders() {
    let view = RoleViewProjector::new().project(&day(), UserRole::Doctor, &ViewFilters::default());

    assert_eq!(ids(&view.rows), vec!["P3", "P5", "P1", "P4", "P6"]);
    assert_eq!(view.counts.count_of("WAITING"), 2);
    assert_eq!(view.counts.count_of("WITH DOCTOR"), 1);
    assert_eq!(view.counts.count_of("CONSULT ON CALL"), 1);
    assert_eq!(view.counts.count_of("SAVE"), 1);
    assert_eq!(view.counts.count_of("COMPLETE"), 0);
    assert_eq!(view.counts.tallies.len(), 4);
}

#[test]
fn test_receptionist_view_puts_waiting_first() {
    let view = RoleViewProjector::new().project(&day(), UserRole::Receptionist, &ViewFilters::default());

    assert_eq!(ids(&view.rows), vec!["P1", "P6", "P2", "P3", "P4", "P5", "P7"]);
    assert_eq!(view.counts.count_of("waiting"), 2);
    assert_eq!(view.counts.count_of("check out"), 1);
    assert_eq!(view.counts.count_of("completed"), 1);
    assert_eq!(view.counts.tallies.len(), 6);
    assert_eq!(view.counts.total(), 7);
}

#[test]
fn test_staged_status_does_not_move_rows() {
    let mut rows = day();
    rows[0].staged = Some(StagedChange {
        status: Some(StatusLabel::normalize("complete")),
        ..Default::default()
    });

    let view = RoleViewProjector::new().project(&rows, UserRole::Doctor, &ViewFilters::default());

    assert!(ids(&view.rows).contains(&"P1"));
    assert_eq!(view.counts.count_of("WAITING"), 2);
    assert!(view.rows.iter().find(|row| row.patient_id == "P1").unwrap().display_status().is(KnownStatus::Complete));
}

#[test]
fn test_text_filters_narrow_rows_but_not_counts() {
    let mut rows = day();
    rows[2].contact = "9990001111".to_string();

    let projector = RoleViewProjector::new();
    let by_name = ViewFilters {
        name: Some("patient p3".to_string()),
        ..Default::default()
    };
    let view = projector.project(&rows, UserRole::Receptionist, &by_name);
    assert_eq!(ids(&view.rows), vec!["P3"]);
    assert_eq!(view.counts.total(), 7);

    let by_contact = ViewFilters {
        contact: Some("0001".to_string()),
        ..Default::default()
    };
    assert_eq!(ids(&projector.project(&rows, UserRole::Receptionist, &by_contact).rows), vec!["P3"]);

    let by_status = ViewFilters {
        status: Some("waiting".to_string()),
        ..Default::default()
    };
    assert_eq!(ids(&projector.project(&rows, UserRole::Receptionist, &by_status).rows), vec!["P1", "P6"]);
}

#[test]
fn test_blank_filters_are_ignored() {
    let filters = ViewFilters {
        name: Some("   ".to_string()),
        contact: Some(String::new()),
        status: Some(" ".to_string()),
    };

    let view = RoleViewProjector::new().project(&day(), UserRole::Receptionist, &filters);

    assert_eq!(view.rows.len(), 7);
}

#[test]
fn test_doctor_view_hides_finished_and_checked_out_rows() {
    let rows = vec![
        row("P1", "WAITING", dr_rao()),
        row("P2", "WITH DOCTOR", dr_rao()),
        row("P3", "COMPLETE", dr_rao()),
        row("P4", "CHECK OUT", dr_rao()),
    ];

    let view = RoleViewProjector::new().project(&rows, UserRole::Doctor, &ViewFilters::default());

    // Patients with the doctor are listed ahead of those still waiting.
    assert_eq!(ids(&view.rows), vec!["P2", "P1"]);
    assert_eq!(view.counts.total(), 2);
}
