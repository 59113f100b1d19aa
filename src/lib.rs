pub mod analysis;
pub mod config;
pub mod ingest;
pub mod model;
pub mod output;
pub mod server;
pub mod snapshot;
pub mod trend;
