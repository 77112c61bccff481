//! Core data type definitions

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the backend (e.g. http://10.0.16.189:5002)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string sent with every request
    pub user_agent: String,
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Directory holding the persisted session key files.
    /// A leading `~` is expanded to the user's home directory.
    pub data_dir: String,
}

/// A medicine in the user's cabinet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    /// Backend-assigned identifier, absent until the backend stores it
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub quantity: u32,
    /// Expiry date as the backend stores it (YYYY-MM-DD)
    pub expiry_date: String,
}

/// One medicine line inside a treatment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentMedicine {
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
}

/// A treatment schedule as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub treatment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub medicines: Vec<TreatmentMedicine>,
}

/// Fields for creating a new treatment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentInput {
    pub user_id: String,
    pub treatment_name: String,
    pub medicines: Vec<TreatmentMedicine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
