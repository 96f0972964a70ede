use crate::domain::filters::DataSourcePreference;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub helena: HelenaSettings,
    #[serde(default)]
    pub data_source: DataSourceSettings,
    #[serde(default)]
    pub fields: CustomFieldKeys,
    #[serde(default)]
    pub share: ShareSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HelenaSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_min_request_delay_ms")]
    pub min_request_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSourceSettings {
    #[serde(default)]
    pub use_mock: bool,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

/// Keys of the Helena custom fields the dashboard filters on.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CustomFieldKeys {
    #[serde(default = "default_college_field")]
    pub college: String,
    #[serde(default = "default_origin_field")]
    pub origin: String,
    #[serde(default = "default_season_field")]
    pub season: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShareSettings {
    #[serde(default = "default_share_max_entries")]
    pub max_entries: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

fn default_min_request_delay_ms() -> u64 {
    1000
}

fn default_cookie_name() -> String {
    "data-source".to_string()
}

fn default_college_field() -> String {
    "college".to_string()
}

fn default_origin_field() -> String {
    "origin".to_string()
}

fn default_season_field() -> String {
    "season".to_string()
}

fn default_share_max_entries() -> usize {
    1000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for HelenaSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            min_request_delay_ms: default_min_request_delay_ms(),
        }
    }
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            use_mock: false,
            cookie_name: default_cookie_name(),
        }
    }
}

impl Default for CustomFieldKeys {
    fn default() -> Self {
        Self {
            college: default_college_field(),
            origin: default_origin_field(),
            season: default_season_field(),
        }
    }
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            max_entries: default_share_max_entries(),
        }
    }
}

impl HelenaSettings {
    /// Both the base URL and the token must be present to talk to Helena.
    pub fn has_credentials(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.token.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_request_delay(&self) -> Duration {
        Duration::from_millis(self.min_request_delay_ms)
    }
}

impl DataSourceSettings {
    pub fn default_preference(&self) -> DataSourcePreference {
        if self.use_mock {
            DataSourcePreference::Mock
        } else {
            DataSourcePreference::Real
        }
    }
}

/// Loads `config/dashboard.*` (optional) overlaid with `DASHBOARD__*` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
