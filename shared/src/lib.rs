pub mod config;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use state::AppState;
