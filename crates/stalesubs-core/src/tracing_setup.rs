use std::fs::OpenOptions;

use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer};

/// Env var naming a file that receives a debug-level copy of every log line
pub const LOG_FILE_ENV: &str = "STALESUBS_LOG_FILE";

pub fn init_tracing() {
    // Console verbosity follows RUST_LOG, defaulting to info
    let console_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let registry = tracing_subscriber::registry().with(console);

    let Some(log_path) = std::env::var(LOG_FILE_ENV).ok() else {
        registry.init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(LevelFilter::DEBUG);

            registry.with(file_layer).init();
            eprintln!("File logging enabled: {}", log_path);
        }
        Err(e) => {
            registry.init();
            tracing::warn!("Could not open log file {}: {}", log_path, e);
        }
    }
}
