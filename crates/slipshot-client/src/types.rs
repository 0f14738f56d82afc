//! Request and response types for the Slipshot API.
//!
//! These types mirror the backend's API contract.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Tags (categories)
// ─────────────────────────────────────────────────────────────────────────────

/// A user-defined category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag ID.
    pub id: i64,
    /// Display name, unique per user.
    pub name: String,
}

/// Request to create or rename a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Slips (transactions)
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlipType {
    Income,
    #[default]
    Expense,
}

impl SlipType {
    pub fn as_str(self) -> &'static str {
        match self {
            SlipType::Income => "income",
            SlipType::Expense => "expense",
        }
    }
}

/// A recorded transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slip {
    /// Slip ID.
    pub id: i64,
    /// Counterparty account name.
    pub account_name: String,
    /// Decimal amount as sent by the server (e.g. `"120.50"`).
    pub amount: String,
    /// Transaction date (`YYYY-MM-DD`).
    pub date: String,
    /// Transaction time (`HH:MM:SS`), if known.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub note: String,
    /// Image URL for uploaded slips.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(rename = "type")]
    pub slip_type: SlipType,
    pub created_at: String,
    pub updated_at: String,
}

impl Slip {
    /// Amount parsed as a float, if well-formed.
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.parse().ok()
    }
}

/// Filters for listing slips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SlipQuery {
    /// Range start (`YYYY-MM-DD`); only applied together with `end`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Range end (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Tag ID filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<i64>,
    /// Type filter.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub slip_type: Option<SlipType>,
}

impl SlipQuery {
    /// Query parameters in a stable order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = &self.start {
            pairs.push(("start".to_string(), start.clone()));
        }
        if let Some(end) = &self.end {
            pairs.push(("end".to_string(), end.clone()));
        }
        if let Some(tag) = self.tag {
            pairs.push(("tag".to_string(), tag.to_string()));
        }
        if let Some(slip_type) = self.slip_type {
            pairs.push(("type".to_string(), slip_type.as_str().to_string()));
        }
        pairs
    }
}

/// Request to create a slip manually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSlipRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    pub amount: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub slip_type: Option<SlipType>,
}

/// Partial update of a slip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSlipRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub slip_type: Option<SlipType>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

/// Granularity of a dashboard period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Day => "day",
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Year => "year",
        }
    }
}

impl std::str::FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(PeriodType::Day),
            "week" => Ok(PeriodType::Week),
            "month" => Ok(PeriodType::Month),
            "year" => Ok(PeriodType::Year),
            other => Err(format!("unknown period type '{other}'")),
        }
    }
}

/// Dashboard aggregation period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DashboardQuery {
    pub period_type: PeriodType,
    /// `YYYY-MM-DD` for day/week, `YYYY-MM` for month, `YYYY` for year.
    /// Without a value the server aggregates over all time.
    pub period_value: Option<String>,
}

impl DashboardQuery {
    pub fn new(period_type: PeriodType, period_value: impl Into<String>) -> Self {
        Self {
            period_type,
            period_value: Some(period_value.into()),
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "period_type".to_string(),
            self.period_type.as_str().to_string(),
        )];
        if let Some(value) = &self.period_value {
            pairs.push(("period_value".to_string(), value.clone()));
        }
        pairs
    }
}

/// Aggregated view for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    #[serde(default)]
    pub recent_slips: Vec<RecentSlip>,
    pub slip_count: u64,
    #[serde(default)]
    pub tag_breakdown: Vec<TagBreakdown>,
    #[serde(default)]
    pub daily_trend: Vec<DailyTrend>,
}

/// Compact slip summary shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSlip {
    pub id: i64,
    pub account_name: String,
    pub amount: f64,
    pub date: String,
    #[serde(rename = "type")]
    pub slip_type: SlipType,
    pub tag_name: Option<String>,
}

/// Expense total for one tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagBreakdown {
    pub tag_id: Option<i64>,
    pub tag_name: String,
    pub amount: f64,
    pub count: u64,
}

/// Totals for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub date: String,
    pub income: f64,
    pub expense: f64,
    pub count: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Interactive login credentials.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub authenticated: bool,
}

/// Response of the auth check endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub authenticated: bool,
    /// Access credential lapsed but a renewal credential is present.
    #[serde(default)]
    pub refresh_available: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
}
