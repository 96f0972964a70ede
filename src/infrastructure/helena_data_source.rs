// Helena-backed data source - Aggregates panels, cards and contacts
use crate::application::dashboard_shaper::shape_dashboard;
use crate::application::data_source::DataSource;
use crate::application::helena_api::{HelenaApi, UpstreamError};
use crate::domain::dashboard::DashboardData;
use crate::domain::filters::{DashboardFilters, DataSourcePreference, FiltersPayload};
use crate::domain::helena::{Card, Contact, Panel};
use crate::infrastructure::config::CustomFieldKeys;
use async_trait::async_trait;
use futures::future::{join, join_all};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Everything collected from Helena for one request. The contact listing
/// keeps its outcome so each caller decides how to degrade.
struct Snapshot {
    panels: Vec<Panel>,
    cards: Vec<Card>,
    contacts: Result<Vec<Contact>, UpstreamError>,
}

#[derive(Clone)]
pub struct HelenaDataSource {
    api: Arc<dyn HelenaApi>,
    fields: CustomFieldKeys,
}

impl HelenaDataSource {
    pub fn new(api: Arc<dyn HelenaApi>, fields: CustomFieldKeys) -> Self {
        Self { api, fields }
    }

    /// Panels first, then every panel's cards alongside the contact list.
    /// A panel whose cards cannot be fetched contributes no cards.
    async fn collect(&self) -> Result<Snapshot, UpstreamError> {
        let panels = self.api.list_panels().await?;

        let card_fetches = panels.iter().map(|panel| async move {
            match self.api.list_cards(&panel.id).await {
                Ok(cards) => cards,
                Err(e) => {
                    tracing::warn!("Error fetching cards for panel {}: {}", panel.id, e);
                    Vec::new()
                }
            }
        });

        let (cards_per_panel, contacts) = join(join_all(card_fetches), self.api.list_contacts()).await;
        let cards: Vec<Card> = cards_per_panel.into_iter().flatten().collect();

        tracing::debug!(
            "Collected {} panels, {} cards, {} contacts from Helena",
            panels.len(),
            cards.len(),
            contacts.as_ref().map_or(0, Vec::len)
        );

        Ok(Snapshot {
            panels,
            cards,
            contacts,
        })
    }

    fn derive_filters(&self, cards: &[Card], contacts: &[Contact]) -> FiltersPayload {
        let sdrs = distinct(cards.iter().filter_map(|c| c.owner.as_deref()));
        let colleges = distinct(contacts.iter().filter_map(|c| c.custom_field(&self.fields.college)));
        let origins = distinct(contacts.iter().filter_map(|c| c.custom_field(&self.fields.origin)));

        FiltersPayload::new(sdrs, colleges, origins)
    }
}

/// Distinct, trimmed, non-empty values in sorted order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl DataSource for HelenaDataSource {
    fn kind(&self) -> DataSourcePreference {
        DataSourcePreference::Real
    }

    async fn get_dashboard_data(&self, filters: &DashboardFilters) -> anyhow::Result<DashboardData> {
        let snapshot = self.collect().await?;
        let contacts = snapshot.contacts.unwrap_or_else(|e| {
            tracing::warn!("Error fetching contacts, shaping dashboard without them: {}", e);
            Vec::new()
        });

        Ok(shape_dashboard(
            &snapshot.panels,
            &snapshot.cards,
            &contacts,
            filters,
            &self.fields,
            chrono::Utc::now().date_naive(),
        ))
    }

    async fn get_available_filters(&self) -> FiltersPayload {
        let collected = self
            .collect()
            .await
            .and_then(|snapshot| snapshot.contacts.map(|contacts| (snapshot.cards, contacts)));

        match collected {
            Ok((cards, contacts)) => self.derive_filters(&cards, &contacts),
            Err(e) => {
                tracing::warn!("Error collecting filters from Helena, serving fallback: {}", e);
                FiltersPayload::fallback()
            }
        }
    }
}
