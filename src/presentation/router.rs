// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_share, get_dashboard, get_data_source, get_filters, get_share, health_check,
    list_cards, list_contacts, list_metrics, list_panels, post_dashboard, set_data_source,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/dashboard", get(get_dashboard).post(post_dashboard))
        .route("/api/filters", get(get_filters))
        .route("/api/data-source", get(get_data_source).post(set_data_source))
        .route("/api/helena/panels", get(list_panels))
        .route("/api/helena/cards", get(list_cards))
        .route("/api/helena/contacts", get(list_contacts))
        .route("/api/helena/metrics", get(list_metrics))
        .route("/api/share", post(create_share))
        .route("/api/share/:token", get(get_share))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::data_source::{DataSource, DataSourceSelector};
    use crate::application::helena_api::HelenaApi;
    use crate::application::share_links::ShareLinkStore;
    use crate::domain::dashboard::DashboardData;
    use crate::domain::filters::{DataSourcePreference, FiltersPayload};
    use crate::infrastructure::config::CustomFieldKeys;
    use crate::infrastructure::helena_data_source::tests::{card, contact, panel, FakeHelena};
    use crate::infrastructure::helena_data_source::HelenaDataSource;
    use crate::infrastructure::mock_data_source::MockDataSource;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn mock_only_router() -> Router {
        let selector = DataSourceSelector::new(Arc::new(MockDataSource::new()), None, DataSourcePreference::Real);
        build_router(Arc::new(AppState {
            dashboard_service: DashboardService::new(selector),
            helena: None,
            share_links: ShareLinkStore::new(10),
            cookie_name: "data-source".to_string(),
        }))
    }

    fn helena_router() -> Router {
        let fake = FakeHelena {
            panels: vec![panel("p1")],
            cards: vec![("p1".to_string(), vec![card("d1", "p1", "Alice")])],
            contacts: vec![contact("c1", json!({ "college": "X" }))],
            ..FakeHelena::default()
        };
        let api: Arc<dyn HelenaApi> = Arc::new(fake);
        let real: Arc<dyn DataSource> = Arc::new(HelenaDataSource::new(api.clone(), CustomFieldKeys::default()));
        let selector = DataSourceSelector::new(Arc::new(MockDataSource::new()), Some(real), DataSourcePreference::Real);

        build_router(Arc::new(AppState {
            dashboard_service: DashboardService::new(selector),
            helena: Some(api),
            share_links: ShareLinkStore::new(10),
            cookie_name: "data-source".to_string(),
        }))
    }

    async fn send(router: Router, request: Request<Body>) -> Result<Response<Body>> {
        router.oneshot(request).await.map_err(|err| match err {})
    }

    async fn json_body(response: Response<Body>) -> Result<Value> {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .context("read response body")?;
        serde_json::from_slice(&body).context("parse JSON body")
    }

    fn get(uri: &str) -> Result<Request<Body>> {
        Request::builder().uri(uri).body(Body::empty()).context("build request")
    }

    fn post_json(uri: &str, body: Value) -> Result<Request<Body>> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .context("build request")
    }

    #[tokio::test]
    async fn test_health_endpoint() -> Result<()> {
        let response = send(mock_only_router(), get("/healthz")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_query_and_body_filters_give_same_dashboard() -> Result<()> {
        let router = mock_only_router();

        let from_query = send(
            router.clone(),
            get("/api/dashboard?date=2025-06-01&season=2025.1&sdr=Todos&college=Todas&origin=")?,
        )
        .await?;
        assert_eq!(from_query.status(), StatusCode::OK);

        let from_body = send(
            router,
            post_json(
                "/api/dashboard",
                json!({ "date": "2025-06-01", "season": "2025.1", "sdr": "Todos", "college": "Todas", "origin": "" }),
            )?,
        )
        .await?;
        assert_eq!(from_body.status(), StatusCode::OK);

        let from_query = json_body(from_query).await?;
        let from_body = json_body(from_body).await?;
        assert_eq!(from_query, from_body);

        let parsed: DashboardData = serde_json::from_value(from_query).context("dashboard shape")?;
        assert!(!parsed.conversion_rates.stages.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_date_is_400() -> Result<()> {
        let response = send(mock_only_router(), get("/api/dashboard?sdr=Alice")?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await?;
        assert!(body["error"].as_str().unwrap_or_default().contains("date"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_json_400() -> Result<()> {
        let untyped = Request::builder()
            .method("POST")
            .uri("/api/dashboard")
            .body(Body::from(json!({ "date": "2025-06-01" }).to_string()))
            .context("build request")?;
        let requests = vec![
            post_json("/api/dashboard", json!({ "date": 5 }))?,
            untyped,
            post_json("/api/data-source", json!({}))?,
            post_json("/api/share", json!({ "filters": "everything" }))?,
        ];

        for request in requests {
            let uri = request.uri().to_string();
            let response = send(mock_only_router(), request).await?;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            assert!(content_type.starts_with("application/json"), "{}", uri);
            let body = json_body(response).await?;
            assert!(body["error"].is_string(), "{}", uri);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_survives_contacts_failure() -> Result<()> {
        let fake = FakeHelena {
            panels: vec![panel("p1")],
            cards: vec![("p1".to_string(), vec![card("d1", "p1", "Alice")])],
            fail_contacts: true,
            ..FakeHelena::default()
        };
        let api: Arc<dyn HelenaApi> = Arc::new(fake);
        let real: Arc<dyn DataSource> = Arc::new(HelenaDataSource::new(api.clone(), CustomFieldKeys::default()));
        let selector = DataSourceSelector::new(Arc::new(MockDataSource::new()), Some(real), DataSourcePreference::Real);
        let router = build_router(Arc::new(AppState {
            dashboard_service: DashboardService::new(selector),
            helena: Some(api),
            share_links: ShareLinkStore::new(10),
            cookie_name: "data-source".to_string(),
        }));

        let response = send(router, get("/api/dashboard?date=2025-06-01")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let data: DashboardData = serde_json::from_value(json_body(response).await?)?;
        assert_eq!(data.generation_activation.generated, 1);
        assert_eq!(data.sales_conversion.by_sdr[0].sdr, "Alice");
        Ok(())
    }

    #[tokio::test]
    async fn test_proxy_without_credentials_is_503() -> Result<()> {
        for uri in ["/api/helena/panels", "/api/helena/cards?panelId=p1", "/api/helena/contacts", "/api/helena/metrics"] {
            let response = send(mock_only_router(), get(uri)?).await?;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
            let body = json_body(response).await?;
            assert!(body["error"].is_string());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_cards_proxy_requires_panel_id() -> Result<()> {
        let response = send(helena_router(), get("/api/helena/cards")?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(helena_router(), get("/api/helena/cards?panelId=p1")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await?;
        assert_eq!(body[0]["owner"], "Alice");
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_follow_cookie_preference() -> Result<()> {
        let response = send(helena_router(), get("/api/filters")?).await?;
        let real: FiltersPayload = serde_json::from_value(json_body(response).await?)?;
        assert_eq!(real.sdrs, vec!["Alice"]);
        assert_eq!(real.colleges, vec!["X"]);

        let request = Request::builder()
            .uri("/api/filters")
            .header(header::COOKIE, "data-source=mock")
            .body(Body::empty())
            .context("build request")?;
        let response = send(helena_router(), request).await?;
        let mock: FiltersPayload = serde_json::from_value(json_body(response).await?)?;
        assert_eq!(mock, MockDataSource::new().get_available_filters().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_data_source_sets_cookie() -> Result<()> {
        let response = send(helena_router(), post_json("/api/data-source", json!({ "source": "mock" }))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(cookie.starts_with("data-source=mock"));
        let body = json_body(response).await?;
        assert_eq!(body, json!({ "source": "mock", "realAvailable": true }));

        let response = send(helena_router(), post_json("/api/data-source", json!({ "source": "live" }))?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_data_source_without_credentials_reports_mock() -> Result<()> {
        let request = Request::builder()
            .uri("/api/data-source")
            .header(header::COOKIE, "data-source=real")
            .body(Body::empty())
            .context("build request")?;
        let response = send(mock_only_router(), request).await?;
        let body = json_body(response).await?;
        assert_eq!(body, json!({ "source": "mock", "realAvailable": false }));
        Ok(())
    }

    #[tokio::test]
    async fn test_share_link_round_trip() -> Result<()> {
        let router = mock_only_router();

        let response = send(
            router.clone(),
            post_json("/api/share", json!({ "filters": { "date": "2025-06-01", "sdr": "Alice" } }))?,
        )
        .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await?;
        let token = created["token"].as_str().context("token")?.to_string();

        let response = send(router.clone(), get(&format!("/api/share/{}", token))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let resolved = json_body(response).await?;
        assert_eq!(resolved["filters"]["sdr"], "Alice");
        assert_eq!(resolved["filters"]["college"], "Todas");

        let response = send(router, get("/api/share/unknown")?).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
