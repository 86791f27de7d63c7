pub mod geo_history;
pub mod nodes;
