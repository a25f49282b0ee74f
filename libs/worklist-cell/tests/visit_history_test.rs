mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;

use common::{today, FakeBackend};
use shared_models::BackendError;
use shared_utils::test_utils::{MockBackendResponses, TEST_CLINIC_ID};
use worklist_cell::{HistoryScope, LastVisit, VisitHistoryResolver};

fn resolver(backend: &Arc<FakeBackend>) -> VisitHistoryResolver {
    let scope = HistoryScope {
        doctor_id: "D1".to_string(),
        clinic_id: TEST_CLINIC_ID.to_string(),
        as_of: today(),
    };
    VisitHistoryResolver::new(backend.clone(), scope, " (Lab)")
}

fn two_visits() -> Vec<serde_json::Value> {
    vec![
        MockBackendResponses::visit_record("2024-01-10", "1100", "D1", 2, 5),
        MockBackendResponses::visit_record("2024-02-01", "0930", "D1", 4, 5),
    ]
}

#[tokio::test]
async fn test_first_demand_reports_loading_then_caches() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits("P1", two_visits());
    backend.set_fetch_delay(Duration::from_millis(50));
    let history = resolver(&backend);

    assert_eq!(history.get_last_visit("P1").await, LastVisit::Loading);
    assert_eq!(history.get_last_visit("P1").await, LastVisit::Loading);

    let loaded = history.load_last_visit("P1").await;
    assert_matches!(&loaded, LastVisit::Visit(summary) if summary.visit_number == 4);

    assert_eq!(history.get_last_visit("P1").await, loaded);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_most_recent_valid_visit_wins() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits(
        "P1",
        vec![
            MockBackendResponses::visit_record("2024-01-10", "1100", "D1", 2, 5),
            json!({ "visit_date": "2024-03-01", "doctor_id": "D1" }),
            MockBackendResponses::visit_record("2024-02-01", "0930", "D2", 4, 9),
        ],
    );
    let history = resolver(&backend);

    match history.load_last_visit("P1").await {
        LastVisit::Visit(summary) => {
            assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
            assert_eq!(summary.time, "09:30");
            assert_eq!(summary.doctor_id, "D2");
            assert_eq!(summary.status_id.value(), 9);
        }
        other => panic!("expected a visit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_only_invalid_visits_read_as_no_visit() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits(
        "P1",
        vec![
            json!({ "visit_date": "2024-03-01", "visit_number": 3 }),
            json!({ "doctor_id": "D1", "visit_number": 3 }),
        ],
    );
    let history = resolver(&backend);

    assert_eq!(history.load_last_visit("P1").await, LastVisit::NoVisit);
    assert_eq!(history.render_last_visit("P1").await, "No previous visit");
    assert_eq!(history.load_last_visit("P-NEW").await, LastVisit::NoVisit);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_demand() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_visits("P1", BackendError::Timeout("timed out".into()));
    let history = resolver(&backend);

    assert_eq!(history.load_last_visit("P1").await, LastVisit::NoVisit);

    backend.set_visits("P1", two_visits());
    assert_matches!(history.load_last_visit("P1").await, LastVisit::Visit(_));
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalidation_discards_in_flight_result() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits("P1", vec![MockBackendResponses::visit_record("2024-01-10", "1100", "D1", 2, 5)]);
    backend.set_fetch_delay(Duration::from_millis(50));
    let history = resolver(&backend);

    assert_eq!(history.get_last_visit("P1").await, LastVisit::Loading);
    tokio::time::sleep(Duration::from_millis(10)).await;

    history.invalidate("P1").await;
    backend.set_visits("P1", two_visits());

    let fresh = history.load_last_visit("P1").await;
    assert_matches!(&fresh, LastVisit::Visit(summary) if summary.visit_number == 4);

    // Let the stale fetch land; it must not overwrite the fresh answer.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(history.get_last_visit("P1").await, fresh);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_render_adds_lab_suffix_once_flag_is_known() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits("P1", two_visits());
    backend.set_details("P1", json!({ "lab_tests": ["CBC", "LFT"] }));
    let history = resolver(&backend);

    assert_eq!(history.render_last_visit("P1").await, "Loading...");

    history.load_last_visit("P1").await;
    assert!(history.load_lab_indicator("P1").await);

    assert_eq!(history.render_last_visit("P1").await, "01-02-2024 09:30 (Lab)");
    assert_eq!(history.lab_indicator("P1").await, Some(true));
    assert_eq!(backend.detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_render_without_lab_work() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits("P1", two_visits());
    backend.set_details("P1", json!({ "lab_tests": [] }));
    let history = resolver(&backend);

    history.load_last_visit("P1").await;
    assert!(!history.load_lab_indicator("P1").await);

    assert_eq!(history.render_last_visit("P1").await, "01-02-2024 09:30");
}

#[tokio::test]
async fn test_invalidate_all_forgets_every_patient() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_visits("P1", two_visits());
    backend.set_visits("P2", two_visits());
    let history = resolver(&backend);

    history.load_last_visit("P1").await;
    history.load_last_visit("P2").await;
    history.invalidate_all().await;

    assert_eq!(history.get_last_visit("P1").await, LastVisit::Loading);
    assert_eq!(history.get_last_visit("P2").await, LastVisit::Loading);
}
