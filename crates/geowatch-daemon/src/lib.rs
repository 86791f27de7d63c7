pub mod config;
pub mod geo_client;
pub mod logging;
pub mod scheduler;
pub mod shutdown;
pub mod store;
