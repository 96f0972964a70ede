// Dashboard service - Use case for building dashboards from the selected source
use crate::application::data_source::DataSourceSelector;
use crate::domain::dashboard::DashboardData;
use crate::domain::filters::{DashboardFilters, DataSourcePreference, FiltersPayload};
use serde::Serialize;

/// Which source a client is being served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceStatus {
    pub source: DataSourcePreference,
    pub real_available: bool,
}

#[derive(Clone)]
pub struct DashboardService {
    selector: DataSourceSelector,
}

impl DashboardService {
    pub fn new(selector: DataSourceSelector) -> Self {
        Self { selector }
    }

    pub async fn get_dashboard(
        &self,
        filters: &DashboardFilters,
        preference: Option<DataSourcePreference>,
    ) -> anyhow::Result<DashboardData> {
        let source = self.selector.select(preference);
        tracing::info!(
            "Building dashboard from {} source (date={}, season={}, sdr={}, college={}, origin={})",
            source.kind(),
            filters.date,
            filters.season,
            filters.sdr,
            filters.college,
            filters.origin
        );
        source.get_dashboard_data(filters).await
    }

    pub async fn get_available_filters(&self, preference: Option<DataSourcePreference>) -> FiltersPayload {
        self.selector.select(preference).get_available_filters().await
    }

    pub fn data_source_status(&self, preference: Option<DataSourcePreference>) -> DataSourceStatus {
        DataSourceStatus {
            source: self.selector.select(preference).kind(),
            real_available: self.selector.real_available(),
        }
    }
}
