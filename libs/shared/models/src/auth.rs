use serde::{Deserialize, Serialize};
use std::fmt;

/// Which worklist a signed-in user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    #[default]
    #[serde(alias = "front_desk", alias = "admin")]
    Receptionist,
}

impl UserRole {
    /// Role strings come from the session bootstrap; anything that is not a
    /// doctor gets the receptionist view.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "doctor" | "dr" | "physician" => UserRole::Doctor,
            _ => UserRole::Receptionist,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Doctor => write!(f, "doctor"),
            UserRole::Receptionist => write!(f, "receptionist"),
        }
    }
}

/// The acting user established by session bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub clinic_id: String,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, role: UserRole, clinic_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            role,
            clinic_id: clinic_id.into(),
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }
}
