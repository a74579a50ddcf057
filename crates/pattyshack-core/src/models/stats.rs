//! Dashboard statistics model

use serde::{Deserialize, Serialize};

/// Today's at-a-glance numbers for the current location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    pub tasks_completed_today: usize,
    pub tasks_pending_today: usize,
    pub temp_logs_today: usize,
    /// Percentage of compliant readings; 100 when nothing was logged
    pub temp_compliance_rate: f64,
    pub messages_unread: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_today: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_percent: Option<f64>,
}

impl DashboardStats {
    /// Compliance percentage for `compliant` out of `total` readings.
    #[allow(clippy::cast_precision_loss)]
    pub fn compliance_rate(compliant: usize, total: usize) -> f64 {
        if total == 0 {
            100.0
        } else {
            compliant as f64 / total as f64 * 100.0
        }
    }
}
