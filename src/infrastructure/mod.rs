// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod helena_client;
pub mod helena_data_source;
pub mod http_response;
pub mod mock_data_source;
