pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod diagram;
pub mod error;
pub mod oauth;
pub mod scaffold;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::Config;
pub use error::ApiError;
pub use server::{AppState, app_router};
