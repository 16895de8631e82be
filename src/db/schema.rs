//! Database schema and types

use crate::state_machine::CompletedIntake;
use crate::triage::Ward;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    patient_name TEXT NOT NULL,
    patient_age INTEGER NOT NULL CHECK (patient_age > 0),
    patient_query TEXT NOT NULL,
    ward TEXT NOT NULL
        CHECK (ward IN ('general_ward', 'emergency_ward', 'mental_health_ward')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_ward ON patients(ward);
CREATE INDEX IF NOT EXISTS idx_patients_created ON patients(created_at DESC);
";

/// Immutable record of a completed intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub patient_name: String,
    pub patient_age: u8,
    pub patient_query: String,
    pub ward: Ward,
    pub created_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Snapshot a completed intake with a fresh id and timestamp
    pub fn from_intake(intake: CompletedIntake) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_name: intake.name,
            patient_age: intake.age,
            patient_query: intake.query,
            ward: intake.ward,
            created_at: Utc::now(),
        }
    }
}
