//! fashionlens web server
//!
//! Upload form, results page and JSON API in front of the classifier
//! cascade. The cascade is loaded once at startup and shared read-only;
//! inference runs on the blocking thread pool.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod templates;
pub mod upload;

pub use app::{build_app, run_server};
pub use cli::{Cli, Commands, ServeArgs};
pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;
