// libs/worklist-cell/src/backend.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::RestClient;
use shared_models::BackendError;

use crate::models::{
    BackendAck, BookAppointmentRequest, DeleteAppointmentRequest, UpdateAppointmentRequest,
};

/// The REST collaborators this layer orchestrates. It owns none of them.
#[async_trait]
pub trait WorklistBackend: Send + Sync {
    async fn list_appointments(
        &self,
        doctor_id: &str,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Value>, BackendError>;

    async fn update_appointment(&self, request: &UpdateAppointmentRequest) -> Result<BackendAck, BackendError>;

    async fn delete_appointment(&self, request: &DeleteAppointmentRequest) -> Result<(), BackendError>;

    async fn book_appointment(&self, request: &BookAppointmentRequest) -> Result<BackendAck, BackendError>;

    async fn status_catalog(&self, clinic_id: &str) -> Result<Vec<Value>, BackendError>;

    async fn global_status_catalog(&self) -> Result<Vec<Value>, BackendError>;

    async fn visit_history(
        &self,
        patient_id: &str,
        doctor_id: &str,
        clinic_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Value>, BackendError>;

    /// Detail record for the most recent visit; drives the lab indicator.
    async fn last_visit_details(&self, patient_id: &str, clinic_id: &str) -> Result<Value, BackendError>;
}

const LIST_ENVELOPES: [&str; 5] = ["data", "appointments", "visits", "result", "items"];

/// Lists arrive bare or wrapped in one of a few envelope keys.
pub fn unwrap_list(payload: Value) -> Result<Vec<Value>, BackendError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut object) => {
            for key in LIST_ENVELOPES {
                if let Some(inner) = object.remove(key) {
                    return unwrap_list(inner);
                }
            }
            Err(BackendError::Decode("expected a list or a wrapped list".to_string()))
        }
        other => Err(BackendError::Decode(format!("expected a list, got {}", other))),
    }
}

pub struct RestWorklistBackend {
    client: RestClient,
}

impl RestWorklistBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: RestClient::new(config),
        }
    }

    pub fn with_client(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorklistBackend for RestWorklistBackend {
    async fn list_appointments(
        &self,
        doctor_id: &str,
        clinic_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Value>, BackendError> {
        let path = format!(
            "/api/appointments?doctor_id={}&clinic_id={}&date={}",
            urlencoding::encode(doctor_id),
            urlencoding::encode(clinic_id),
            date.format("%Y-%m-%d")
        );
        let payload = self.client.get_json(&path).await?;
        let records = unwrap_list(payload)?;
        debug!("Fetched {} appointment records for doctor {}", records.len(), doctor_id);
        Ok(records)
    }

    async fn update_appointment(&self, request: &UpdateAppointmentRequest) -> Result<BackendAck, BackendError> {
        let body = serde_json::to_value(request)?;
        let payload = self.client.post_json("/api/appointments/update", body).await?;
        ack_from_payload(payload)
    }

    async fn delete_appointment(&self, request: &DeleteAppointmentRequest) -> Result<(), BackendError> {
        let body = serde_json::to_value(request)?;
        let payload = self.client.post_json("/api/appointments/delete", body).await?;

        // Some deployments answer 200 with `{success: false}` instead of an error status.
        if let Ok(ack) = serde_json::from_value::<BackendAck>(payload.clone()) {
            if payload.get("success").is_some() && !ack.success {
                return Err(BackendError::NotFound(ack.reason()));
            }
        }
        Ok(())
    }

    async fn book_appointment(&self, request: &BookAppointmentRequest) -> Result<BackendAck, BackendError> {
        let body = serde_json::to_value(request)?;
        let payload = self.client.post_json("/api/appointments/book", body).await?;
        ack_from_payload(payload)
    }

    async fn status_catalog(&self, clinic_id: &str) -> Result<Vec<Value>, BackendError> {
        let path = format!("/api/status-catalog?clinic_id={}", urlencoding::encode(clinic_id));
        unwrap_list(self.client.get_json(&path).await?)
    }

    async fn global_status_catalog(&self) -> Result<Vec<Value>, BackendError> {
        unwrap_list(self.client.get_json("/api/status-catalog").await?)
    }

    async fn visit_history(
        &self,
        patient_id: &str,
        doctor_id: &str,
        clinic_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Value>, BackendError> {
        let path = format!(
            "/api/patients/{}/visits?doctor_id={}&clinic_id={}&as_of={}",
            urlencoding::encode(patient_id),
            urlencoding::encode(doctor_id),
            urlencoding::encode(clinic_id),
            as_of.format("%Y-%m-%d")
        );
        unwrap_list(self.client.get_json(&path).await?)
    }

    async fn last_visit_details(&self, patient_id: &str, clinic_id: &str) -> Result<Value, BackendError> {
        let path = format!(
            "/api/patients/{}/last-visit-details?clinic_id={}",
            urlencoding::encode(patient_id),
            urlencoding::encode(clinic_id)
        );
        let payload = self.client.get_json(&path).await?;
        Ok(match payload {
            Value::Object(mut object) if object.contains_key("data") => {
                object.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        })
    }
}

fn ack_from_payload(payload: Value) -> Result<BackendAck, BackendError> {
    match payload {
        // An empty 2xx body means the write went through.
        Value::Null => Ok(BackendAck::ok()),
        Value::Object(_) => Ok(serde_json::from_value(payload)?),
        other => Err(BackendError::Decode(format!("unexpected acknowledgement: {}", other))),
    }
}
