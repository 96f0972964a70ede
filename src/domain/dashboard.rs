// Dashboard domain model
use serde::{Deserialize, Serialize};

/// Everything one dashboard page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub generation_activation: GenerationActivation,
    pub sales_conversion: SalesConversion,
    pub conversion_rates: ConversionRates,
    pub lead_stock: LeadStock,
    pub sales_by_time_to_convert: SalesByTimeToConvert,
    pub lead_quality: LeadQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationActivation {
    pub generated: u64,
    pub activated: u64,
    pub activation_rate: f64,
    pub weekly: Vec<WeeklyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCount {
    /// ISO week label, e.g. `2025-W07`.
    pub week: String,
    pub generated: u64,
    pub activated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesConversion {
    pub leads: u64,
    pub sales: u64,
    pub conversion_rate: f64,
    pub by_sdr: Vec<SdrConversion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdrConversion {
    pub sdr: String,
    pub leads: u64,
    pub sales: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRates {
    pub stages: Vec<StageRate>,
}

/// Funnel stage: how many leads reached it and the rate from the stage before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRate {
    pub stage: String,
    pub reached: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStock {
    pub open: u64,
    pub stale: u64,
    pub by_stage: Vec<StageCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesByTimeToConvert {
    pub buckets: Vec<ConversionBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionBucket {
    pub label: String,
    pub sales: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadQuality {
    pub items: Vec<LeadQualityItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadQualityItem {
    pub origin: String,
    pub leads: u64,
    pub activated: u64,
    pub sales: u64,
    pub quality_score: f64,
}

/// Time-to-convert buckets as `(label, upper bound in days)`; `None` is open-ended.
pub const TIME_TO_CONVERT_BUCKETS: [(&str, Option<i64>); 5] = [
    ("0-7d", Some(7)),
    ("8-15d", Some(15)),
    ("16-30d", Some(30)),
    ("31-60d", Some(60)),
    ("60d+", None),
];

/// Percentage rounded to one decimal; zero when there is nothing to divide by.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 * 100.0 / whole as f64)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Bucket label for a number of days between lead creation and sale.
pub fn time_to_convert_label(days: i64) -> &'static str {
    for (label, upper) in TIME_TO_CONVERT_BUCKETS {
        match upper {
            Some(upper) if days <= upper => return label,
            Some(_) => continue,
            None => return label,
        }
    }
    "60d+"
}
