//! Dashboard API.

use slipshot_cache::SavedPeriod;

use crate::client::SlipshotClient;
use crate::error::{ResourceResult, Result};
use crate::resource::{Resource, SlotState};
use crate::transport::ApiRequest;
use crate::types::{Dashboard, DashboardQuery, PeriodType};

/// Dashboard aggregates, one slot per period.
pub struct DashboardResource;

impl Resource for DashboardResource {
    type Params = DashboardQuery;
    type Value = Dashboard;
    const NAME: &'static str = "dashboard";

    fn params_key(query: &DashboardQuery) -> String {
        match &query.period_value {
            Some(value) => format!("{}={}", query.period_type.as_str(), value),
            None => query.period_type.as_str().to_string(),
        }
    }

    fn request(query: &DashboardQuery) -> ApiRequest {
        ApiRequest::get("dashboard/").with_query(query.to_pairs())
    }
}

/// Dashboard API client.
pub struct DashboardApi {
    client: SlipshotClient,
}

impl DashboardApi {
    pub(crate) fn new(client: SlipshotClient) -> Self {
        Self { client }
    }

    /// Dashboard for `query`, from cache when fresh.
    pub async fn get(&self, query: &DashboardQuery) -> ResourceResult<Dashboard> {
        self.client.inner().dashboard.get(query).await
    }

    /// Dashboard for `query` from the network.
    pub async fn refresh(&self, query: &DashboardQuery) -> ResourceResult<Dashboard> {
        self.client.inner().dashboard.refresh(query).await
    }

    pub fn cached(&self, query: &DashboardQuery) -> Option<Dashboard> {
        self.client.inner().dashboard.peek(query)
    }

    pub fn state(&self, query: &DashboardQuery) -> SlotState {
        self.client.inner().dashboard.state(query)
    }

    /// Period remembered in the user preferences, or the default (all months).
    pub fn saved_query(&self) -> DashboardQuery {
        let Some(saved) = self.client.preferences().load().dashboard_period else {
            return DashboardQuery::default();
        };
        match saved.period_type.parse::<PeriodType>() {
            Ok(period_type) => DashboardQuery {
                period_type,
                period_value: saved.period_value,
            },
            Err(_) => DashboardQuery::default(),
        }
    }

    /// Remember `query` as the preferred dashboard period.
    pub fn save_query(&self, query: &DashboardQuery) -> Result<()> {
        self.client.preferences().update(|prefs| {
            prefs.dashboard_period = Some(SavedPeriod {
                period_type: query.period_type.as_str().to_string(),
                period_value: query.period_value.clone(),
            });
        })?;
        Ok(())
    }
}
