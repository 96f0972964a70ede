// Dashboard shaper - Maps Helena panels, cards and contacts into dashboard blocks
use crate::domain::dashboard::{
    percentage, round1, time_to_convert_label, ConversionBucket, ConversionRates, DashboardData,
    GenerationActivation, LeadQuality, LeadQualityItem, LeadStock, SalesByTimeToConvert,
    SalesConversion, SdrConversion, StageCount, StageRate, WeeklyCount, TIME_TO_CONVERT_BUCKETS,
};
use crate::domain::filters::DashboardFilters;
use crate::domain::helena::{Card, Contact, Panel};
use crate::infrastructure::config::CustomFieldKeys;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Open leads untouched for longer than this are counted as stale.
const STALE_AFTER_DAYS: i64 = 30;
const UNASSIGNED: &str = "unassigned";
const UNKNOWN_ORIGIN: &str = "unknown";
const UNSTAGED: &str = "unstaged";

/// One card after joining it with its panel and contacts.
struct Deal<'a> {
    card: &'a Card,
    contacts: Vec<&'a Contact>,
    stage: Option<(usize, &'a str)>,
    won: bool,
}

impl Deal<'_> {
    fn activated(&self) -> bool {
        matches!(self.stage, Some((index, _)) if index >= 1)
    }

    fn contact_field(&self, key: &str) -> Option<&str> {
        self.contacts.iter().find_map(|c| c.custom_field(key))
    }

    fn any_contact_has(&self, key: &str, expected: &str) -> bool {
        self.contacts.iter().any(|c| c.custom_field(key) == Some(expected))
    }
}

/// Builds the dashboard payload. `today` is the reference date when the
/// filters carry no parseable `date`.
pub fn shape_dashboard(
    panels: &[Panel],
    cards: &[Card],
    contacts: &[Contact],
    filters: &DashboardFilters,
    fields: &CustomFieldKeys,
    today: NaiveDate,
) -> DashboardData {
    let cutoff = NaiveDate::parse_from_str(filters.date.trim(), "%Y-%m-%d").ok();
    let reference = cutoff.unwrap_or(today);

    let panels_by_id: HashMap<&str, &Panel> = panels.iter().map(|p| (p.id.as_str(), p)).collect();
    let contacts_by_id: HashMap<&str, &Contact> =
        contacts.iter().map(|c| (c.id.as_str(), c)).collect();

    let deals: Vec<Deal> = cards
        .iter()
        .map(|card| join_deal(card, &panels_by_id, &contacts_by_id))
        .filter(|deal| matches_filters(deal, filters, fields, cutoff))
        .collect();

    tracing::debug!(
        "Shaping dashboard from {} of {} cards (reference date {})",
        deals.len(),
        cards.len(),
        reference
    );

    DashboardData {
        generation_activation: generation_activation(&deals),
        sales_conversion: sales_conversion(&deals),
        conversion_rates: conversion_rates(&deals, panels),
        lead_stock: lead_stock(&deals, reference),
        sales_by_time_to_convert: sales_by_time_to_convert(&deals),
        lead_quality: lead_quality(&deals, fields),
    }
}

fn join_deal<'a>(
    card: &'a Card,
    panels: &HashMap<&str, &'a Panel>,
    contacts: &HashMap<&str, &'a Contact>,
) -> Deal<'a> {
    let panel = card.panel_id.as_deref().and_then(|id| panels.get(id).copied());
    let stage = match (panel, card.step_id.as_deref()) {
        (Some(panel), Some(step_id)) => panel
            .stage_of(step_id)
            .map(|index| (index, panel.steps[index].title.as_str())),
        _ => None,
    };
    let won = match (panel, stage) {
        (Some(panel), Some((index, _))) => panel.steps.len() >= 2 && index == panel.steps.len() - 1,
        _ => false,
    };

    Deal {
        card,
        contacts: card
            .contact_ids
            .iter()
            .filter_map(|id| contacts.get(id.as_str()).copied())
            .collect(),
        stage,
        won,
    }
}

fn matches_filters(
    deal: &Deal,
    filters: &DashboardFilters,
    fields: &CustomFieldKeys,
    cutoff: Option<NaiveDate>,
) -> bool {
    if let Some(sdr) = filters.sdr_filter() {
        if deal.card.owner.as_deref() != Some(sdr) {
            return false;
        }
    }
    if let Some(college) = filters.college_filter() {
        if !deal.any_contact_has(&fields.college, college) {
            return false;
        }
    }
    if let Some(origin) = filters.origin_filter() {
        if !deal.any_contact_has(&fields.origin, origin) {
            return false;
        }
    }
    if let Some(season) = filters.season_filter() {
        let on_card = deal.card.custom_field(&fields.season) == Some(season);
        if !on_card && !deal.any_contact_has(&fields.season, season) {
            return false;
        }
    }
    if let (Some(cutoff), Some(created_at)) = (cutoff, deal.card.created_at) {
        if created_at.date_naive() > cutoff {
            return false;
        }
    }
    true
}

fn generation_activation(deals: &[Deal]) -> GenerationActivation {
    let generated = deals.len() as u64;
    let activated = deals.iter().filter(|d| d.activated()).count() as u64;

    let mut weeks: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for deal in deals {
        if let Some(created_at) = deal.card.created_at {
            let week = created_at.iso_week();
            let entry = weeks
                .entry(format!("{}-W{:02}", week.year(), week.week()))
                .or_default();
            entry.0 += 1;
            if deal.activated() {
                entry.1 += 1;
            }
        }
    }

    GenerationActivation {
        generated,
        activated,
        activation_rate: percentage(activated, generated),
        weekly: weeks
            .into_iter()
            .map(|(week, (generated, activated))| WeeklyCount {
                week,
                generated,
                activated,
            })
            .collect(),
    }
}

fn sales_conversion(deals: &[Deal]) -> SalesConversion {
    let leads = deals.len() as u64;
    let sales = deals.iter().filter(|d| d.won).count() as u64;

    let mut by_owner: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for deal in deals {
        let entry = by_owner
            .entry(deal.card.owner.as_deref().unwrap_or(UNASSIGNED))
            .or_default();
        entry.0 += 1;
        if deal.won {
            entry.1 += 1;
        }
    }

    SalesConversion {
        leads,
        sales,
        conversion_rate: percentage(sales, leads),
        by_sdr: by_owner
            .into_iter()
            .map(|(sdr, (leads, sales))| SdrConversion {
                sdr: sdr.to_string(),
                leads,
                sales,
                conversion_rate: percentage(sales, leads),
            })
            .collect(),
    }
}

/// Funnel by stage position; a stage is named after the first panel that has it.
fn conversion_rates(deals: &[Deal], panels: &[Panel]) -> ConversionRates {
    let depth = panels.iter().map(|p| p.steps.len()).max().unwrap_or(0);
    let mut stages: Vec<StageRate> = Vec::with_capacity(depth);

    for index in 0..depth {
        let name = panels
            .iter()
            .find_map(|p| p.steps.get(index))
            .map(|s| s.title.clone())
            .unwrap_or_default();
        let reached = deals
            .iter()
            .filter(|d| d.stage.map(|(i, _)| i).unwrap_or(0) >= index)
            .count() as u64;
        let rate = match stages.last() {
            None if reached > 0 => 100.0,
            None => 0.0,
            Some(previous) => percentage(reached, previous.reached),
        };
        stages.push(StageRate {
            stage: name,
            reached,
            rate,
        });
    }

    ConversionRates { stages }
}

fn lead_stock(deals: &[Deal], reference: NaiveDate) -> LeadStock {
    let stale_before = reference - Duration::days(STALE_AFTER_DAYS);
    let open: Vec<&Deal> = deals.iter().filter(|d| !d.won).collect();

    let stale = open
        .iter()
        .filter(|d| {
            d.card
                .updated_at
                .or(d.card.created_at)
                .map(|t| t.date_naive() < stale_before)
                .unwrap_or(false)
        })
        .count() as u64;

    let mut by_stage: BTreeMap<(usize, &str), u64> = BTreeMap::new();
    for deal in &open {
        let key = deal.stage.unwrap_or((usize::MAX, UNSTAGED));
        *by_stage.entry(key).or_default() += 1;
    }

    LeadStock {
        open: open.len() as u64,
        stale,
        by_stage: by_stage
            .into_iter()
            .map(|((_, stage), count)| StageCount {
                stage: stage.to_string(),
                count,
            })
            .collect(),
    }
}

fn sales_by_time_to_convert(deals: &[Deal]) -> SalesByTimeToConvert {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for deal in deals.iter().filter(|d| d.won) {
        if let (Some(created), Some(closed)) = (deal.card.created_at, deal.card.updated_at) {
            let days = (closed - created).num_days().max(0);
            *counts.entry(time_to_convert_label(days)).or_default() += 1;
        }
    }

    SalesByTimeToConvert {
        buckets: TIME_TO_CONVERT_BUCKETS
            .iter()
            .map(|(label, _)| ConversionBucket {
                label: label.to_string(),
                sales: counts.get(label).copied().unwrap_or(0),
            })
            .collect(),
    }
}

fn lead_quality(deals: &[Deal], fields: &CustomFieldKeys) -> LeadQuality {
    let mut by_origin: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
    for deal in deals {
        let origin = deal.contact_field(&fields.origin).unwrap_or(UNKNOWN_ORIGIN);
        let entry = by_origin.entry(origin).or_default();
        entry.0 += 1;
        if deal.activated() {
            entry.1 += 1;
        }
        if deal.won {
            entry.2 += 1;
        }
    }

    LeadQuality {
        items: by_origin
            .into_iter()
            .map(|(origin, (leads, activated, sales))| LeadQualityItem {
                origin: origin.to_string(),
                leads,
                activated,
                sales,
                quality_score: quality_score(leads, activated, sales),
            })
            .collect(),
    }
}

/// Conversion weighs 60%, activation 40%.
pub fn quality_score(leads: u64, activated: u64, sales: u64) -> f64 {
    round1(0.6 * percentage(sales, leads) + 0.4 * percentage(activated, leads))
}
