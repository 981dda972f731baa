// server/src/models/dashboard.rs

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
  pub total_revenue: i64,
  pub total_bookings: i64,
  pub verified_givers: i64,
  /// Clients created in the last 30 days.
  pub new_clients: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
  /// `YYYY-MM`
  pub month: String,
  pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiverStatusCount {
  /// "Verified" or "Pending".
  pub status: String,
  pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUsage {
  pub name: String,
  pub bookings: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
  pub key_metrics: KeyMetrics,
  pub monthly_revenue_data: Vec<MonthlyRevenue>,
  pub giver_status_data: Vec<GiverStatusCount>,
  pub service_usage_data: Vec<ServiceUsage>,
}

pub const TOP_SERVICES_LIMIT: usize = 5;
pub const NEW_CLIENT_WINDOW_DAYS: i64 = 30;

pub fn giver_status_label(is_verified: bool) -> &'static str {
  if is_verified {
    "Verified"
  } else {
    "Pending"
  }
}

/// Both buckets are always present, Verified first.
pub fn giver_status_data(verified: i64, pending: i64) -> Vec<GiverStatusCount> {
  vec![
    GiverStatusCount {
      status: giver_status_label(true).to_string(),
      count: verified,
    },
    GiverStatusCount {
      status: giver_status_label(false).to_string(),
      count: pending,
    },
  ]
}
