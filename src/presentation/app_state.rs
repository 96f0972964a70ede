// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::helena_api::HelenaApi;
use crate::application::share_links::ShareLinkStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    /// Present only when Helena credentials are configured.
    pub helena: Option<Arc<dyn HelenaApi>>,
    pub share_links: ShareLinkStore,
    pub cookie_name: String,
}
