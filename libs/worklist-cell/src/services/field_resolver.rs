// libs/worklist-cell/src/services/field_resolver.rs
//
// Ordered-alias lookup over untyped backend records. Every cross-backend
// field is read through here so the alias rules live in one table.

use serde_json::Value;

/// Bump when an alias list changes so fixtures can be re-checked.
pub const ALIAS_TABLE_VERSION: u32 = 3;

/// Logical fields read from heterogeneous backend records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PatientId,
    AppointmentId,
    FirstName,
    MiddleName,
    LastName,
    FullName,
    Age,
    Gender,
    Contact,
    VisitDate,
    VisitTime,
    StatusLabel,
    StatusId,
    DoctorName,
    DoctorId,
    VisitNumber,
    ShiftId,
    ClinicId,
    OnlineTime,
    ReportsReceived,
    VisitDetailsSubmitted,
    BilledAmount,
    DiscountAmount,
    DuesAmount,
    CollectedAmount,
    BalanceAmount,
    CatalogLabel,
    LabIndicator,
}

impl Field {
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::PatientId => &["patient_id", "Patient_Id", "Patient_ID", "patientId", "PatientId", "pid"],
            Field::AppointmentId => &["appointment_id", "Appointment_Id", "appointmentId", "appt_id"],
            Field::FirstName => &["first_name", "First_Name", "firstName", "fname"],
            Field::MiddleName => &["middle_name", "Middle_Name", "middleName", "mname"],
            Field::LastName => &["last_name", "Last_Name", "lastName", "lname"],
            Field::FullName => &["patient_name", "Patient_Name", "patientName", "full_name", "name", "Name"],
            Field::Age => &["age", "Age", "patient_age", "Patient_Age"],
            Field::Gender => &["gender", "Gender", "sex", "Sex"],
            Field::Contact => &["contact", "Contact", "mobile", "Mobile_No", "mobile_no", "phone", "phone_number", "contact_no"],
            Field::VisitDate => &["visit_date", "Visit_Date", "visitDate", "appointment_date", "Appointment_Date", "date", "Date"],
            Field::VisitTime => &["visit_time", "Visit_Time", "visitTime", "appointment_time", "Appointment_Time", "time", "Time"],
            Field::StatusLabel => &["status", "Status", "status_description", "Status_Description", "statusDescription", "visit_status"],
            Field::StatusId => &["status_id", "Status_Id", "Status_ID", "statusId"],
            Field::DoctorName => &["doctor_name", "Doctor_Name", "doctorName", "provider_name", "Provider_Name"],
            Field::DoctorId => &["doctor_id", "Doctor_Id", "Doctor_ID", "doctorId", "provider_id"],
            Field::VisitNumber => &["visit_number", "Visit_Number", "visitNumber", "visit_no", "Visit_No", "Visit_Id"],
            Field::ShiftId => &["shift_id", "Shift_Id", "Shift_ID", "shiftId", "shift"],
            Field::ClinicId => &["clinic_id", "Clinic_Id", "Clinic_ID", "clinicId"],
            Field::OnlineTime => &["online_time", "Online_Time", "onlineTime", "online_appointment_time", "Online_Appointment_Time"],
            Field::ReportsReceived => &["reports_received", "Reports_Received", "reportsReceived"],
            Field::VisitDetailsSubmitted => &["visit_details_submitted", "Visit_Details_Submitted", "visitDetailsSubmitted", "details_submitted"],
            Field::BilledAmount => &["billed_amount", "Billed_Amount", "billedAmount", "total_amount", "Total_Amount"],
            Field::DiscountAmount => &["discount", "Discount", "discount_amount", "Discount_Amount"],
            Field::DuesAmount => &["dues", "Dues", "dues_amount", "Dues_Amount", "previous_dues"],
            Field::CollectedAmount => &["collected", "Collected", "amount_collected", "Amount_Collected", "paid_amount"],
            Field::BalanceAmount => &["balance", "Balance", "balance_amount", "Balance_Amount"],
            Field::CatalogLabel => &["status_description", "Status_Description", "label", "status", "name"],
            Field::LabIndicator => &["lab_tests", "Lab_Tests", "labTests", "lab_required", "has_lab", "lab_indicator"],
        }
    }
}

/// True when a value counts as supplied: non-null, and non-blank for strings.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}

pub struct FieldResolver;

impl FieldResolver {
    /// First candidate whose value is present on `record`.
    pub fn first<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
        let object = record.as_object()?;
        candidates
            .iter()
            .filter_map(|name| object.get(*name))
            .find(|value| is_present(value))
    }

    pub fn field(record: &Value, field: Field) -> Option<&Value> {
        Self::first(record, field.aliases())
    }

    /// First present scalar rendered as a trimmed string.
    pub fn string(record: &Value, candidates: &[&str]) -> Option<String> {
        let object = record.as_object()?;
        candidates
            .iter()
            .filter_map(|name| object.get(*name))
            .filter(|value| is_present(value))
            .find_map(scalar_to_string)
    }

    pub fn string_or(record: &Value, candidates: &[&str], fallback: &str) -> String {
        Self::string(record, candidates).unwrap_or_else(|| fallback.to_string())
    }

    pub fn text(record: &Value, field: Field) -> Option<String> {
        Self::string(record, field.aliases())
    }

    pub fn text_or(record: &Value, field: Field, fallback: &str) -> String {
        Self::string_or(record, field.aliases(), fallback)
    }

    /// Numeric value of the first present candidate. A present value that
    /// does not parse yields `None` rather than falling through to later
    /// aliases.
    pub fn number(record: &Value, field: Field) -> Option<f64> {
        Self::field(record, field).and_then(parse_number)
    }

    pub fn number_or(record: &Value, field: Field, fallback: f64) -> f64 {
        Self::number(record, field).unwrap_or(fallback)
    }

    pub fn unsigned_or(record: &Value, field: Field, fallback: u32) -> u32 {
        Self::field(record, field)
            .and_then(parse_leading_u32)
            .unwrap_or(fallback)
    }

    pub fn flag_or(record: &Value, field: Field, fallback: bool) -> bool {
        Self::field(record, field).and_then(parse_flag).unwrap_or(fallback)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Finite number from a JSON number or a numeric string (`"1,250.50"` allowed).
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|number| number.is_finite())
}

/// Leading non-negative integer: `34`, `"34"`, `"34 Y"`, `"12.0"`.
pub fn parse_leading_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n.trunc() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => {
            let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        }
        _ => None,
    }
}

pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        Value::Array(items) => Some(!items.is_empty()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_skips_null_and_blank() {
        let record = json!({ "a": null, "b": "   ", "c": "value" });
        assert_eq!(FieldResolver::first(&record, &["a", "b", "c"]), Some(&json!("value")));
    }

    #[test]
    fn test_string_or_falls_back() {
        let record = json!({ "other": 1 });
        assert_eq!(FieldResolver::string_or(&record, &["missing"], "fallback"), "fallback");
    }

    #[test]
    fn test_non_object_record_resolves_nothing() {
        assert_eq!(FieldResolver::first(&json!([1, 2]), &["a"]), None);
        assert_eq!(FieldResolver::string(&json!("text"), &["a"]), None);
    }

    #[test]
    fn test_numbers_are_rendered_as_strings() {
        let record = json!({ "Patient_Id": 1042 });
        assert_eq!(FieldResolver::text(&record, Field::PatientId), Some("1042".to_string()));
    }

    #[test]
    fn test_unparseable_number_is_not_nan() {
        let record = json!({ "billed_amount": "n/a" });
        assert_eq!(FieldResolver::number_or(&record, Field::BilledAmount, 0.0), 0.0);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(parse_leading_u32(&json!("34 Y")), Some(34));
        assert_eq!(parse_leading_u32(&json!(12.0)), Some(12));
        assert_eq!(parse_leading_u32(&json!("Y34")), None);
    }
}
