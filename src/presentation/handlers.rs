// HTTP request handlers
use crate::application::dashboard_service::DataSourceStatus;
use crate::application::helena_api::HelenaApi;
use crate::application::share_links::SharedView;
use crate::domain::dashboard::DashboardData;
use crate::domain::filters::{
    DashboardFilters, DataSourcePreference, FiltersPayload, ALL_COLLEGES, ALL_SDRS,
};
use crate::domain::helena::{Card, Contact, Metric, Panel};
use crate::infrastructure::http_response::{preference_cookie, read_cookie, ApiError, JsonBody};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Dashboard filters as they arrive in a query string or a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
    pub season: Option<String>,
    pub sdr: Option<String>,
    pub college: Option<String>,
    pub origin: Option<String>,
}

impl DashboardQuery {
    /// `date` is required; the rest fall back to "no filter".
    pub fn into_filters(self) -> Result<DashboardFilters, ApiError> {
        let date = self
            .date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing required parameter: date".to_string()))?;

        Ok(DashboardFilters {
            date,
            season: self.season.unwrap_or_default(),
            sdr: non_blank(self.sdr).unwrap_or_else(|| ALL_SDRS.to_string()),
            college: non_blank(self.college).unwrap_or_else(|| ALL_COLLEGES.to_string()),
            origin: self.origin.unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct CardsQuery {
    #[serde(rename = "panelId")]
    pub panel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DataSourceRequest {
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub filters: DashboardQuery,
}

fn cookie_preference(state: &AppState, headers: &HeaderMap) -> Option<DataSourcePreference> {
    read_cookie(headers, &state.cookie_name).and_then(|value| value.parse().ok())
}

fn helena(state: &AppState) -> Result<&Arc<dyn HelenaApi>, ApiError> {
    state.helena.as_ref().ok_or(ApiError::NotConfigured)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Dashboard for filters given as query parameters
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardData>, ApiError> {
    dashboard(&state, &headers, query).await
}

/// Dashboard for filters given as a JSON body
pub async fn post_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(query): JsonBody<DashboardQuery>,
) -> Result<Json<DashboardData>, ApiError> {
    dashboard(&state, &headers, query).await
}

async fn dashboard(
    state: &AppState,
    headers: &HeaderMap,
    query: DashboardQuery,
) -> Result<Json<DashboardData>, ApiError> {
    let filters = query.into_filters()?;
    let data = state
        .dashboard_service
        .get_dashboard(&filters, cookie_preference(state, headers))
        .await?;
    Ok(Json(data))
}

/// Filter selection sets; never fails
pub async fn get_filters(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<FiltersPayload> {
    Json(
        state
            .dashboard_service
            .get_available_filters(cookie_preference(&state, &headers))
            .await,
    )
}

pub async fn get_data_source(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<DataSourceStatus> {
    Json(
        state
            .dashboard_service
            .data_source_status(cookie_preference(&state, &headers)),
    )
}

/// Stores the client's preference in a cookie and reports the resulting source
pub async fn set_data_source(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<DataSourceRequest>,
) -> Result<Response, ApiError> {
    let preference: DataSourcePreference = request.source.parse().map_err(ApiError::BadRequest)?;
    let status = state.dashboard_service.data_source_status(Some(preference));

    let mut response = Json(status).into_response();
    if let Some(cookie) = preference_cookie(&state.cookie_name, preference.as_str()) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

pub async fn list_panels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Panel>>, ApiError> {
    Ok(Json(helena(&state)?.list_panels().await?))
}

pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CardsQuery>,
) -> Result<Json<Vec<Card>>, ApiError> {
    let api = helena(&state)?;
    let panel_id = non_blank(query.panel_id)
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: panelId".to_string()))?;
    Ok(Json(api.list_cards(&panel_id).await?))
}

pub async fn list_contacts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Contact>>, ApiError> {
    Ok(Json(helena(&state)?.list_contacts().await?))
}

pub async fn list_metrics(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Metric>>, ApiError> {
    Ok(Json(helena(&state)?.list_metrics().await?))
}

pub async fn create_share(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ShareRequest>,
) -> Result<(StatusCode, Json<SharedView>), ApiError> {
    let filters = request.filters.into_filters()?;
    Ok((StatusCode::CREATED, Json(state.share_links.create(filters))))
}

pub async fn get_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<SharedView>, ApiError> {
    state
        .share_links
        .get(&token)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown share link: {}", token)))
}
