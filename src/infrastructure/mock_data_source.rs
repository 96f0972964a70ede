// Mock data source - Offline dashboard generator for running without Helena credentials
use crate::application::data_source::DataSource;
use crate::application::dashboard_shaper::quality_score;
use crate::domain::dashboard::{
    percentage, ConversionBucket, ConversionRates, DashboardData, GenerationActivation,
    LeadQuality, LeadQualityItem, LeadStock, SalesByTimeToConvert, SalesConversion,
    SdrConversion, StageCount, StageRate, WeeklyCount, TIME_TO_CONVERT_BUCKETS,
};
use crate::domain::filters::{DashboardFilters, DataSourcePreference, FiltersPayload};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const SDRS: [&str; 4] = ["Ana Souza", "Bruno Lima", "Carla Mendes", "Diego Rocha"];
const COLLEGES: [&str; 3] = ["Unidade Centro", "Unidade Norte", "Unidade Sul"];
const ORIGINS: [&str; 5] = ["Instagram", "Google", "Indicação", "Site", "Evento"];
const STAGES: [&str; 5] = ["Novo lead", "Contato feito", "Visita agendada", "Proposta", "Matriculado"];
const WEEKS: u32 = 8;

/// Generates plausible dashboards without touching the network. Equal
/// filters always produce equal data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource;

impl MockDataSource {
    pub fn new() -> Self {
        Self
    }

    fn rng_for(filters: &DashboardFilters) -> StdRng {
        let mut hasher = DefaultHasher::new();
        filters.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    fn generate(filters: &DashboardFilters) -> DashboardData {
        let mut rng = Self::rng_for(filters);

        let sdrs: Vec<&str> = match filters.sdr_filter() {
            Some(sdr) => vec![sdr],
            None => SDRS.to_vec(),
        };
        let origins: Vec<&str> = match filters.origin_filter() {
            Some(origin) => vec![origin],
            None => ORIGINS.to_vec(),
        };

        // Funnel: each stage keeps a random share of the previous one.
        let mut reached = Vec::with_capacity(STAGES.len());
        let mut current: u64 = rng.gen_range(120..400) * sdrs.len() as u64 / SDRS.len() as u64 + 10;
        for _ in STAGES {
            reached.push(current);
            current = current * rng.gen_range(35..85) / 100;
        }
        let generated = reached[0];
        let activated = reached[1];
        let sales = reached[STAGES.len() - 1];

        // Each week and each SDR gets a share of the subset (activated, sales)
        // plus a share of the remainder, so every breakdown adds up to its total.
        let weekly = split(&mut rng, activated, WEEKS as usize)
            .into_iter()
            .zip(split(&mut rng, generated - activated, WEEKS as usize))
            .enumerate()
            .map(|(i, (activated, not_activated))| WeeklyCount {
                week: format!("W{:02}", i + 1),
                generated: activated + not_activated,
                activated,
            })
            .collect();

        let by_sdr = split(&mut rng, sales, sdrs.len())
            .into_iter()
            .zip(split(&mut rng, generated - sales, sdrs.len()))
            .zip(&sdrs)
            .map(|((sales, not_sold), sdr)| {
                let leads = sales + not_sold;
                SdrConversion {
                    sdr: sdr.to_string(),
                    leads,
                    sales,
                    conversion_rate: percentage(sales, leads),
                }
            })
            .collect();

        let stages = reached
            .iter()
            .enumerate()
            .map(|(i, &count)| StageRate {
                stage: STAGES[i].to_string(),
                reached: count,
                rate: if i == 0 {
                    if count > 0 { 100.0 } else { 0.0 }
                } else {
                    percentage(count, reached[i - 1])
                },
            })
            .collect();

        let open = generated - sales;
        let open_by_stage = split(&mut rng, open, STAGES.len() - 1);
        let by_stage = STAGES[..STAGES.len() - 1]
            .iter()
            .zip(open_by_stage)
            .map(|(stage, count)| StageCount {
                stage: stage.to_string(),
                count,
            })
            .collect();

        let buckets = TIME_TO_CONVERT_BUCKETS
            .iter()
            .zip(split(&mut rng, sales, TIME_TO_CONVERT_BUCKETS.len()))
            .map(|((label, _), sales)| ConversionBucket {
                label: label.to_string(),
                sales,
            })
            .collect();

        let items = origins
            .iter()
            .zip(split(&mut rng, generated, origins.len()))
            .map(|(origin, leads)| {
                let activated = leads * rng.gen_range(30..80) / 100;
                let sales = activated * rng.gen_range(10..50) / 100;
                LeadQualityItem {
                    origin: origin.to_string(),
                    leads,
                    activated,
                    sales,
                    quality_score: quality_score(leads, activated, sales),
                }
            })
            .collect();

        DashboardData {
            generation_activation: GenerationActivation {
                generated,
                activated,
                activation_rate: percentage(activated, generated),
                weekly,
            },
            sales_conversion: SalesConversion {
                leads: generated,
                sales,
                conversion_rate: percentage(sales, generated),
                by_sdr,
            },
            conversion_rates: ConversionRates { stages },
            lead_stock: LeadStock {
                open,
                stale: open * rng.gen_range(5..25) / 100,
                by_stage,
            },
            sales_by_time_to_convert: SalesByTimeToConvert { buckets },
            lead_quality: LeadQuality { items },
        }
    }
}

/// Splits `total` into `parts` random shares that add up to `total`.
fn split(rng: &mut StdRng, total: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let weights: Vec<u64> = (0..parts).map(|_| rng.gen_range(1..10)).collect();
    let weight_sum: u64 = weights.iter().sum();

    let mut shares: Vec<u64> = weights.iter().map(|w| total * w / weight_sum).collect();
    let assigned: u64 = shares.iter().sum();
    shares[0] += total - assigned;
    shares
}

#[async_trait]
impl DataSource for MockDataSource {
    fn kind(&self) -> DataSourcePreference {
        DataSourcePreference::Mock
    }

    async fn get_dashboard_data(&self, filters: &DashboardFilters) -> anyhow::Result<DashboardData> {
        Ok(Self::generate(filters))
    }

    async fn get_available_filters(&self) -> FiltersPayload {
        FiltersPayload::new(
            SDRS.iter().map(|s| s.to_string()).collect(),
            COLLEGES.iter().map(|s| s.to_string()).collect(),
            ORIGINS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_structurally_valid_for_any_filters() {
        let source = MockDataSource::new();
        let cases = vec![
            DashboardFilters::new("2025-06-01"),
            DashboardFilters {
                sdr: "Someone Unknown".to_string(),
                college: "Nowhere".to_string(),
                origin: "TikTok".to_string(),
                season: "1999.9".to_string(),
                date: String::new(),
            },
        ];

        for filters in cases {
            let data = source.get_dashboard_data(&filters).await.unwrap();
            let ga = &data.generation_activation;
            assert!(ga.activated <= ga.generated);
            assert_eq!(ga.weekly.iter().map(|w| w.generated).sum::<u64>(), ga.generated);
            assert_eq!(ga.weekly.iter().map(|w| w.activated).sum::<u64>(), ga.activated);
            assert!(ga.weekly.iter().all(|w| w.activated <= w.generated));

            let sc = &data.sales_conversion;
            assert!(sc.sales <= sc.leads);
            assert_eq!(sc.by_sdr.iter().map(|s| s.leads).sum::<u64>(), sc.leads);
            assert_eq!(sc.by_sdr.iter().map(|s| s.sales).sum::<u64>(), sc.sales);
            assert!(sc.by_sdr.iter().all(|s| s.sales <= s.leads));
            assert_eq!(data.conversion_rates.stages.len(), STAGES.len());
            assert_eq!(
                data.lead_stock.by_stage.iter().map(|s| s.count).sum::<u64>(),
                data.lead_stock.open
            );
            assert_eq!(
                data.sales_by_time_to_convert.buckets.iter().map(|b| b.sales).sum::<u64>(),
                data.sales_conversion.sales
            );
            assert!(!data.lead_quality.items.is_empty());
        }
    }

    #[tokio::test]
    async fn test_deterministic_per_filters() {
        let source = MockDataSource::new();
        let filters = DashboardFilters::new("2025-06-01");
        let first = source.get_dashboard_data(&filters).await.unwrap();
        let second = source.get_dashboard_data(&filters).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sdr_filter_narrows_breakdown() {
        let filters = DashboardFilters {
            sdr: "Bruno Lima".to_string(),
            ..DashboardFilters::new("2025-06-01")
        };
        let data = MockDataSource::new().get_dashboard_data(&filters).await.unwrap();
        assert_eq!(data.sales_conversion.by_sdr.len(), 1);
        assert_eq!(data.sales_conversion.by_sdr[0].sdr, "Bruno Lima");
    }

    #[tokio::test]
    async fn test_filters_offer_every_option() {
        let filters = MockDataSource::new().get_available_filters().await;
        assert_eq!(filters.sdrs.len(), SDRS.len());
        assert_eq!(filters.colleges.len(), COLLEGES.len());
        assert_eq!(filters.origins.len(), ORIGINS.len());
    }
}
