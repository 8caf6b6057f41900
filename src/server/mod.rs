mod album_routes;
pub mod config;
mod error;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;
mod upload_routes;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};
pub use http_layers::*;
pub use server::{make_app, make_metrics_app, run_server};
pub use state::ServerState;
