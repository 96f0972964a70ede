// Helena CRM API client
use crate::application::helena_api::{HelenaApi, UpstreamError};
use crate::application::request_deduplicator::RequestDeduplicator;
use crate::domain::helena::{parse_records, Card, Contact, Metric, Panel};
use crate::infrastructure::config::HelenaSettings;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const PANELS_PATH: &str = "crm/v1/panel";
const CARDS_PATH: &str = "crm/v1/panel/card";
const CONTACTS_PATH: &str = "core/v1/contact";
const METRICS_PATH: &str = "crm/v1/panel/metric";

/// One page of a Helena listing.
#[derive(Debug, Clone)]
struct Page {
    items: Vec<Value>,
    has_more: bool,
}

#[derive(Clone)]
pub struct HelenaClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    page_size: u32,
    max_pages: u32,
    dedup: RequestDeduplicator<Arc<Page>, UpstreamError>,
}

impl HelenaClient {
    pub fn new(settings: &HelenaSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build Helena HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            token: settings.token.trim().to_string(),
            page_size: settings.page_size.max(1),
            max_pages: settings.max_pages.max(1),
            dedup: RequestDeduplicator::new(settings.min_request_delay()),
        })
    }

    fn request_key(path: &str, query: &[(String, String)]) -> String {
        let query: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        format!("{}?{}", path, query.join("&"))
    }

    async fn fetch_page(
        &self,
        path: &str,
        params: &[(&str, &str)],
        page_number: u32,
    ) -> Result<Arc<Page>, UpstreamError> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.push(("PageNumber".to_string(), page_number.to_string()));
        query.push(("PageSize".to_string(), self.page_size.to_string()));

        let key = Self::request_key(path, &query);
        let url = format!("{}/{}", self.base_url, path);
        let http = self.http.clone();
        let token = self.token.clone();

        self.dedup
            .execute(&key, move || async move {
                tracing::debug!("GET {} {:?}", url, query);
                let response = http
                    .get(&url)
                    .header("Authorization", format!("Bearer {}", token))
                    .header("Accept", "application/json")
                    .query(&query)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(UpstreamError::Status { status, body });
                }

                let body = response.json::<Value>().await?;
                parse_page(body).map(Arc::new)
            })
            .await
    }

    /// Walks pages until Helena reports no more, a page comes back empty, or
    /// `max_pages` is reached.
    async fn fetch_all(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<Value>, UpstreamError> {
        let mut items = Vec::new();

        for page_number in 1..=self.max_pages {
            let page = self.fetch_page(path, params, page_number).await?;
            items.extend(page.items.iter().cloned());

            if !page.has_more || page.items.is_empty() {
                return Ok(items);
            }
        }

        tracing::warn!("Stopped paging {} after {} pages", path, self.max_pages);
        Ok(items)
    }
}

/// Accepts the paged envelope `{items, hasMorePages | totalPages}` or a bare array.
fn parse_page(body: Value) -> Result<Page, UpstreamError> {
    match body {
        Value::Array(items) => Ok(Page {
            items,
            has_more: false,
        }),
        Value::Object(mut map) => {
            let items = match map.remove("items") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(UpstreamError::Decode(format!(
                        "expected an items array, got {}",
                        other
                    )));
                }
            };

            let has_more = map
                .get("hasMorePages")
                .and_then(Value::as_bool)
                .or_else(|| {
                    let page = map.get("pageNumber").and_then(Value::as_u64)?;
                    let total = map.get("totalPages").and_then(Value::as_u64)?;
                    Some(page < total)
                })
                .unwrap_or(false);

            Ok(Page { items, has_more })
        }
        other => Err(UpstreamError::Decode(format!(
            "unexpected response shape: {}",
            other
        ))),
    }
}

#[async_trait]
impl HelenaApi for HelenaClient {
    async fn list_panels(&self) -> Result<Vec<Panel>, UpstreamError> {
        let items = self
            .fetch_all(PANELS_PATH, &[("IncludeDetails", "Steps")])
            .await?;
        Ok(parse_records(&items, Panel::from_value))
    }

    async fn list_cards(&self, panel_id: &str) -> Result<Vec<Card>, UpstreamError> {
        let items = self.fetch_all(CARDS_PATH, &[("PanelId", panel_id)]).await?;
        let mut cards = parse_records(&items, Card::from_value);
        for card in &mut cards {
            card.panel_id.get_or_insert_with(|| panel_id.to_string());
        }
        Ok(cards)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, UpstreamError> {
        let items = self.fetch_all(CONTACTS_PATH, &[]).await?;
        Ok(parse_records(&items, Contact::from_value))
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, UpstreamError> {
        let items = self.fetch_all(METRICS_PATH, &[]).await?;
        Ok(parse_records(&items, Metric::from_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct FakeHelena {
        panel_requests: Arc<AtomicUsize>,
    }

    async fn panels(
        State(fake): State<FakeHelena>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        fake.panel_requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer secret") {
            return (StatusCode::UNAUTHORIZED, "bad token").into_response();
        }

        let page = query.get("PageNumber").map(String::as_str);
        let body = match page {
            Some("1") => json!({
                "pageNumber": 1,
                "totalPages": 2,
                "items": [{ "id": "p1", "title": "Vendas" }]
            }),
            _ => json!({
                "pageNumber": 2,
                "totalPages": 2,
                "items": [{ "id": "p2", "title": "Pós-venda" }, { "title": "no id" }]
            }),
        };
        Json(body).into_response()
    }

    async fn cards(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        match query.get("PanelId").map(String::as_str) {
            Some("p1") => Json(json!([{ "id": "d1", "owner": "Alice" }])).into_response(),
            _ => (StatusCode::BAD_GATEWAY, "boom").into_response(),
        }
    }

    async fn spawn_fake(fake: FakeHelena) -> String {
        let router = Router::new()
            .route("/crm/v1/panel", get(panels))
            .route("/crm/v1/panel/card", get(cards))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn client(base_url: String) -> HelenaClient {
        HelenaClient::new(&HelenaSettings {
            base_url,
            token: "secret".to_string(),
            min_request_delay_ms: 0,
            ..HelenaSettings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_walks_pages_and_drops_records_without_id() {
        let fake = FakeHelena::default();
        let client = client(spawn_fake(fake.clone()).await);

        let panels = client.list_panels().await.unwrap();
        let ids: Vec<&str> = panels.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(fake.panel_requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_listings_share_upstream_calls() {
        let fake = FakeHelena::default();
        let client = client(spawn_fake(fake.clone()).await);

        let (a, b) = futures::future::join(client.list_panels(), client.list_panels()).await;
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fake.panel_requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cards_get_panel_id_and_errors_carry_status() {
        let client = client(spawn_fake(FakeHelena::default()).await);

        let cards = client.list_cards("p1").await.unwrap();
        assert_eq!(cards[0].panel_id.as_deref(), Some("p1"));
        assert_eq!(cards[0].owner.as_deref(), Some("Alice"));

        let err = client.list_cards("p9").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Status {
                status: 502,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_wrong_token_is_a_status_error() {
        let base_url = spawn_fake(FakeHelena::default()).await;
        let client = HelenaClient::new(&HelenaSettings {
            base_url,
            token: "wrong".to_string(),
            min_request_delay_ms: 0,
            ..HelenaSettings::default()
        })
        .unwrap();

        match client.list_panels().await {
            Err(UpstreamError::Status { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected a status error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_page_shapes() {
        let page = parse_page(json!({ "items": [1, 2], "hasMorePages": true })).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);

        let page = parse_page(json!([{ "id": 1 }])).unwrap();
        assert!(!page.has_more);

        assert!(matches!(
            parse_page(json!({ "items": "nope" })),
            Err(UpstreamError::Decode(_))
        ));
        assert!(matches!(parse_page(json!(42)), Err(UpstreamError::Decode(_))));
    }
}
