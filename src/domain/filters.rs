// Dashboard filter domain models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel meaning "every SDR".
pub const ALL_SDRS: &str = "Todos";
/// Sentinel meaning "every college".
pub const ALL_COLLEGES: &str = "Todas";

/// Business seasons offered to the UI. Not derived from upstream data.
pub const SEASONS: [&str; 4] = ["2025.1", "2025.2", "2026.1", "2026.2"];

/// Filters applied to one dashboard request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilters {
    pub date: String,
    pub season: String,
    pub sdr: String,
    pub college: String,
    pub origin: String,
}

impl DashboardFilters {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            season: String::new(),
            sdr: ALL_SDRS.to_string(),
            college: ALL_COLLEGES.to_string(),
            origin: String::new(),
        }
    }

    pub fn sdr_filter(&self) -> Option<&str> {
        active(&self.sdr, ALL_SDRS)
    }

    pub fn college_filter(&self) -> Option<&str> {
        active(&self.college, ALL_COLLEGES)
    }

    pub fn origin_filter(&self) -> Option<&str> {
        active(&self.origin, "")
    }

    pub fn season_filter(&self) -> Option<&str> {
        active(&self.season, "")
    }
}

fn active<'a>(value: &'a str, sentinel: &str) -> Option<&'a str> {
    let value = value.trim();
    if value.is_empty() || value == sentinel {
        None
    } else {
        Some(value)
    }
}

/// Selection sets the UI offers in its filter bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersPayload {
    pub sdrs: Vec<String>,
    pub colleges: Vec<String>,
    pub origins: Vec<String>,
    pub seasons: Vec<String>,
}

impl FiltersPayload {
    /// Builds the payload, substituting sentinels for empty selection sets.
    pub fn new(sdrs: Vec<String>, colleges: Vec<String>, origins: Vec<String>) -> Self {
        let sdrs = if sdrs.is_empty() {
            vec![ALL_SDRS.to_string()]
        } else {
            sdrs
        };
        let colleges = if colleges.is_empty() {
            vec![ALL_COLLEGES.to_string()]
        } else {
            colleges
        };

        Self {
            sdrs,
            colleges,
            origins,
            seasons: static_seasons(),
        }
    }

    /// Payload served when upstream data could not be collected at all.
    pub fn fallback() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

pub fn static_seasons() -> Vec<String> {
    SEASONS.iter().map(|s| s.to_string()).collect()
}

/// Which data source a client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourcePreference {
    Real,
    Mock,
}

impl DataSourcePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourcePreference::Real => "real",
            DataSourcePreference::Mock => "mock",
        }
    }
}

impl fmt::Display for DataSourcePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSourcePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(DataSourcePreference::Real),
            "mock" => Ok(DataSourcePreference::Mock),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}
