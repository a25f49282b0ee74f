#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use shared_models::{BackendError, UserRole};
use shared_utils::test_utils::{TestUser, TEST_CLINIC_ID};
use worklist_cell::{
    AppointmentRow, BackendAck, Billing, BookAppointmentRequest, DeleteAppointmentRequest, KnownStatus,
    Provider, ProviderDirectory, StatusLabel, UpdateAppointmentRequest, WorklistBackend, WorklistSession,
};

pub fn init_logging() {
    shared_config::init_tracing();
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

pub fn dr_rao() -> Provider {
    Provider::new("D1", "A Rao")
}

pub fn dr_shah() -> Provider {
    Provider::new("D2", "B Shah")
}

pub fn session(role: UserRole, viewed: Option<Provider>) -> WorklistSession {
    let user = match role {
        UserRole::Doctor => TestUser::doctor("D1", "A Rao"),
        UserRole::Receptionist => TestUser::receptionist("USR-7"),
    };
    WorklistSession {
        user: user.to_session_user(),
        clinic_id: TEST_CLINIC_ID.to_string(),
        viewed_provider: viewed,
        providers: ProviderDirectory::new(vec![dr_rao(), dr_shah()]),
        today: today(),
    }
}

pub fn row(patient_id: &str, status: &str, provider: Provider) -> AppointmentRow {
    AppointmentRow {
        appointment_id: None,
        patient_id: patient_id.to_string(),
        patient_name: format!("Patient {}", patient_id),
        age: 40,
        gender: "F".to_string(),
        contact: "9800000000".to_string(),
        visit_time: "09:30".to_string(),
        visit_date: "2024-03-05".to_string(),
        visit_at: None,
        provider,
        visit_number: 3,
        shift_id: 1,
        clinic_id: TEST_CLINIC_ID.to_string(),
        online_time: String::new(),
        status: StatusLabel::normalize(status),
        staged: None,
        reports_received: false,
        visit_details_submitted: false,
        billing: Billing::default(),
    }
}

pub fn waiting_row(patient_id: &str) -> AppointmentRow {
    row(patient_id, KnownStatus::Waiting.as_str(), dr_rao())
}

/// In-memory backend recording every call.
pub struct FakeBackend {
    pub appointments: Mutex<Vec<Value>>,
    pub update_response: Mutex<Result<BackendAck, BackendError>>,
    pub delete_response: Mutex<Result<(), BackendError>>,
    pub book_response: Mutex<Result<BackendAck, BackendError>>,
    pub clinic_catalog: Mutex<Result<Vec<Value>, BackendError>>,
    pub global_catalog: Mutex<Result<Vec<Value>, BackendError>>,
    pub visits: Mutex<HashMap<String, Result<Vec<Value>, BackendError>>>,
    pub details: Mutex<HashMap<String, Value>>,
    pub fetch_delay: Mutex<Option<Duration>>,
    pub updates: Mutex<Vec<UpdateAppointmentRequest>>,
    pub deletes: Mutex<Vec<DeleteAppointmentRequest>>,
    pub bookings: Mutex<Vec<BookAppointmentRequest>>,
    pub list_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            appointments: Mutex::new(Vec::new()),
            update_response: Mutex::new(Ok(BackendAck::ok())),
            delete_response: Mutex::new(Ok(())),
            book_response: Mutex::new(Ok(BackendAck::ok())),
            clinic_catalog: Mutex::new(Ok(Vec::new())),
            global_catalog: Mutex::new(Ok(Vec::new())),
            visits: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            fetch_delay: Mutex::new(None),
            updates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            bookings: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_update_response(&self, response: Result<BackendAck, BackendError>) {
        *self.update_response.lock().unwrap() = response;
    }

    pub fn set_delete_response(&self, response: Result<(), BackendError>) {
        *self.delete_response.lock().unwrap() = response;
    }

    pub fn set_book_response(&self, response: Result<BackendAck, BackendError>) {
        *self.book_response.lock().unwrap() = response;
    }

    pub fn set_visits(&self, patient_id: &str, records: Vec<Value>) {
        self.visits.lock().unwrap().insert(patient_id.to_string(), Ok(records));
    }

    pub fn fail_visits(&self, patient_id: &str, error: BackendError) {
        self.visits.lock().unwrap().insert(patient_id.to_string(), Err(error));
    }

    pub fn set_details(&self, patient_id: &str, details: Value) {
        self.details.lock().unwrap().insert(patient_id.to_string(), details);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.lock().unwrap().len()
    }

    async fn pause(&self) {
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl WorklistBackend for FakeBackend {
    async fn list_appointments(
        &self,
        _doctor_id: &str,
        _clinic_id: &str,
        _date: NaiveDate,
    ) -> Result<Vec<Value>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.appointments.lock().unwrap().clone())
    }

    async fn update_appointment(&self, request: &UpdateAppointmentRequest) -> Result<BackendAck, BackendError> {
        self.updates.lock().unwrap().push(request.clone());
        self.update_response.lock().unwrap().clone()
    }

    async fn delete_appointment(&self, request: &DeleteAppointmentRequest) -> Result<(), BackendError> {
        self.deletes.lock().unwrap().push(request.clone());
        self.delete_response.lock().unwrap().clone()
    }

    async fn book_appointment(&self, request: &BookAppointmentRequest) -> Result<BackendAck, BackendError> {
        self.bookings.lock().unwrap().push(request.clone());
        self.book_response.lock().unwrap().clone()
    }

    async fn status_catalog(&self, _clinic_id: &str) -> Result<Vec<Value>, BackendError> {
        self.clinic_catalog.lock().unwrap().clone()
    }

    async fn global_status_catalog(&self) -> Result<Vec<Value>, BackendError> {
        self.global_catalog.lock().unwrap().clone()
    }

    async fn visit_history(
        &self,
        patient_id: &str,
        _doctor_id: &str,
        _clinic_id: &str,
        _as_of: NaiveDate,
    ) -> Result<Vec<Value>, BackendError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        // Answer is fixed when the request is made, not when it completes.
        let answer = self
            .visits
            .lock()
            .unwrap()
            .get(patient_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        self.pause().await;
        answer
    }

    async fn last_visit_details(&self, patient_id: &str, _clinic_id: &str) -> Result<Value, BackendError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.details.lock().unwrap().get(patient_id).cloned().unwrap_or(Value::Null))
    }
}
