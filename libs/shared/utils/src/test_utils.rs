use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{SessionUser, UserRole};

pub const TEST_CLINIC_ID: &str = "CLINIC-1";

pub struct TestConfig {
    pub backend_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub lab_indicator_suffix: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8089".to_string(),
            api_key: "test-api-key".to_string(),
            request_timeout_secs: 5,
            lab_indicator_suffix: " (Lab)".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the client at a mock server.
    pub fn with_backend_url(url: &str) -> Self {
        Self {
            backend_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_url: self.backend_url.clone(),
            api_key: self.api_key.clone(),
            request_timeout_secs: self.request_timeout_secs,
            lab_indicator_suffix: self.lab_indicator_suffix.clone(),
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub name: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: format!("USR-{}", &Uuid::new_v4().simple().to_string()[..8]),
            name: "Front Desk".to_string(),
            role: UserRole::Receptionist,
        }
    }
}

impl TestUser {
    pub fn new(id: &str, name: &str, role: UserRole) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
        }
    }

    pub fn doctor(id: &str, name: &str) -> Self {
        Self::new(id, name, UserRole::Doctor)
    }

    pub fn receptionist(id: &str) -> Self {
        Self::new(id, "Front Desk", UserRole::Receptionist)
    }

    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            display_name: Some(self.name.clone()),
            ..SessionUser::new(self.id.clone(), self.role, TEST_CLINIC_ID)
        }
    }
}

/// JSON bodies in the shapes the different backends produce.
pub struct MockBackendResponses;

impl MockBackendResponses {
    /// Snake-case shape with composed name parts.
    pub fn appointment_record(patient_id: &str, time: &str, status: &str, doctor_id: &str) -> Value {
        json!({
            "appointment_id": format!("APT-{}", patient_id),
            "patient_id": patient_id,
            "first_name": "Asha",
            "middle_name": "K",
            "last_name": "Menon",
            "patient_name": "Asha Menon",
            "age": "42",
            "gender": "F",
            "mobile": "9800012345",
            "visit_date": "2024-03-05",
            "visit_time": time,
            "status": status,
            "doctor_id": doctor_id,
            "visit_number": 3,
            "shift_id": 1,
            "clinic_id": TEST_CLINIC_ID,
            "online_time": "",
            "reports_received": false,
            "billed_amount": "500",
            "discount": 50,
            "dues": null,
            "collected": "450.00",
            "balance": 0
        })
    }

    /// Title-case shape with a pre-joined name and doctor name.
    pub fn legacy_appointment_record(patient_id: &str, time: Value, status: &str, doctor_name: &str) -> Value {
        json!({
            "Patient_Id": patient_id,
            "Patient_Name": "Ravi Kumar",
            "Age": 57,
            "Gender": "M",
            "Mobile_No": "9811122233",
            "Visit_Date": "05-03-2024",
            "Visit_Time": time,
            "status_description": status,
            "Doctor_Name": doctor_name,
            "Visit_No": "7",
            "Shift_Id": "2",
            "Online_Time": "10:15",
            "Billed_Amount": "n/a"
        })
    }

    pub fn visit_record(date: &str, time: &str, doctor_id: &str, visit_number: u32, status_id: i32) -> Value {
        json!({
            "visit_date": date,
            "visit_time": time,
            "doctor_id": doctor_id,
            "visit_number": visit_number,
            "status_id": status_id,
            "prescription": [{ "drug": "Paracetamol", "dose": "500mg" }],
            "vitals": { "bp": "120/80", "pulse": 72 }
        })
    }

    pub fn status_catalog(labels: &[&str]) -> Value {
        Value::Array(
            labels
                .iter()
                .map(|label| json!({ "status_description": label }))
                .collect(),
        )
    }

    pub fn ack(success: bool, message: Option<&str>) -> Value {
        match message {
            Some(message) => json!({ "success": success, "message": message }),
            None => json!({ "success": success }),
        }
    }

    pub fn booking_error(message: &str) -> Value {
        json!({ "success": false, "error": message })
    }

    pub fn last_visit_details(lab_tests: &[&str]) -> Value {
        json!({ "data": { "lab_tests": lab_tests, "notes": "follow up in 2 weeks" } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_backend_url("http://127.0.0.1:9999");
        let app_config = config.to_app_config();

        assert_eq!(app_config.backend_url, "http://127.0.0.1:9999");
        assert_eq!(app_config.api_key, "test-api-key");
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("D1", "A Rao");
        let session_user = user.to_session_user();

        assert!(session_user.is_doctor());
        assert_eq!(session_user.clinic_id, TEST_CLINIC_ID);
        assert_eq!(session_user.display_name.as_deref(), Some("A Rao"));
    }

    #[test]
    fn test_default_user_is_receptionist() {
        let user = TestUser::default();
        assert_eq!(user.role, UserRole::Receptionist);
        assert!(user.id.starts_with("USR-"));
    }
}
