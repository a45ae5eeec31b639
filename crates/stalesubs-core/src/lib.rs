pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod handle_cache;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod tracing_setup;
pub mod youtube;

pub use config::AuditConfig;
pub use error::AuditError;
pub use pipeline::{run, Outcome, Report};
