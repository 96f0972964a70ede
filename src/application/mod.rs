// Application layer - Use cases and ports
pub mod dashboard_service;
pub mod dashboard_shaper;
pub mod data_source;
pub mod helena_api;
pub mod request_deduplicator;
pub mod share_links;
