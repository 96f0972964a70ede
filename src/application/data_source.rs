// Data source port and real/mock selection
use crate::domain::dashboard::DashboardData;
use crate::domain::filters::{DashboardFilters, DataSourcePreference, FiltersPayload};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Which kind of source this is
    fn kind(&self) -> DataSourcePreference;

    /// Build the full dashboard payload for the given filters
    async fn get_dashboard_data(&self, filters: &DashboardFilters) -> anyhow::Result<DashboardData>;

    /// Selection sets for the filter bar; always answers something usable
    async fn get_available_filters(&self) -> FiltersPayload;
}

/// Picks the mock or the Helena-backed source for each request.
///
/// `real` is only present when Helena credentials are configured.
#[derive(Clone)]
pub struct DataSourceSelector {
    mock: Arc<dyn DataSource>,
    real: Option<Arc<dyn DataSource>>,
    default_preference: DataSourcePreference,
}

impl DataSourceSelector {
    pub fn new(
        mock: Arc<dyn DataSource>,
        real: Option<Arc<dyn DataSource>>,
        default_preference: DataSourcePreference,
    ) -> Self {
        Self {
            mock,
            real,
            default_preference,
        }
    }

    pub fn real_available(&self) -> bool {
        self.real.is_some()
    }

    /// Cookie preference wins over the configured default.
    pub fn effective_preference(&self, cookie: Option<DataSourcePreference>) -> DataSourcePreference {
        cookie.unwrap_or(self.default_preference)
    }

    pub fn select(&self, cookie: Option<DataSourcePreference>) -> Arc<dyn DataSource> {
        let preference = self.effective_preference(cookie);

        let source = match (&self.real, preference) {
            (Some(real), DataSourcePreference::Real) => real.clone(),
            _ => self.mock.clone(),
        };

        tracing::debug!(
            "Selected {} data source (preference={}, credentials={})",
            source.kind(),
            preference,
            self.real_available()
        );

        source
    }
}
