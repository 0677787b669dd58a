//! HTTP surface of the shrink URL shortener.

pub mod app;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;
pub mod telemetry;
pub mod throttle;

pub use app::App;
pub use state::AppState;
