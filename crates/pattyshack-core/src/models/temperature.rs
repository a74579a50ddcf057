//! Temperature log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    F,
    C,
}

/// One equipment temperature reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLog {
    pub id: String,
    pub location_id: String,
    pub equipment_name: String,
    pub temperature: f64,
    pub unit: TemperatureUnit,
    pub logged_by: String,
    pub logged_at: DateTime<Utc>,
    pub is_compliant: bool,
    pub min_temp: f64,
    pub max_temp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TemperatureLog {
    /// Whether the reading falls inside its equipment's bounds (inclusive).
    pub fn is_within_range(&self) -> bool {
        (self.min_temp..=self.max_temp).contains(&self.temperature)
    }
}
