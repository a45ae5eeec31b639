use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use stalesubs_core::export::ensure_present;
use stalesubs_core::handle_cache::HandleCache;
use stalesubs_core::report::{self, render, Layout};
use stalesubs_core::resolve::CachedLookup;
use stalesubs_core::tracing_setup::init_tracing;
use stalesubs_core::youtube::{Authenticator, YouTubeClient};
use stalesubs_core::{run, AuditConfig, AuditError, Outcome};

#[derive(Parser)]
#[command(name = "stalesubs")]
#[command(about = "Find YouTube subscriptions you have not watched in a long time")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Watch-history export from Google Takeout (overrides exportPath)
    #[arg(long, short = 'e')]
    export: Option<PathBuf>,

    /// Days without a watch before a subscription counts as stale
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Skip scanning the account's activity feed
    #[arg(long)]
    no_activity_feed: bool,
}

impl Cli {
    /// Resolve the config file and apply flag overrides on top of it
    fn config(&self) -> Result<AuditConfig, AuditError> {
        let mut config = AuditConfig::discover(self.config.as_deref())?;
        if let Some(export) = &self.export {
            config.export_path = export.clone();
        }
        if let Some(days) = self.lookback_days {
            config.lookback_days = days;
        }
        if self.no_activity_feed {
            config.include_activity_feed = false;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    println!("{}", "=".repeat(80));
    println!("YOUTUBE SUBSCRIPTION ANALYZER");
    println!("{}", "=".repeat(80));
    println!();

    if let Err(e) = audit(&cli).await {
        tracing::error!("{:#}", e);
        if e.is_user_actionable() {
            eprintln!("\nError: {}", e);
        } else {
            eprintln!("\nThe audit stopped before a report could be produced: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn audit(cli: &Cli) -> Result<(), AuditError> {
    let config = cli.config()?;
    tracing::debug!("Effective config: {:?}", config);

    // Check before the authorization prompt so a missing export costs nothing
    ensure_present(&config.export_path)?;

    let access_token = Authenticator::new(&config)?.access_token().await?;
    let client = YouTubeClient::new(access_token)?;
    let lookup = CachedLookup::new(&client, HandleCache::open(&config.handle_cache_path));

    match run(&config, Utc::now(), &client, &lookup).await? {
        Outcome::NoSubscriptions => {
            println!("No subscriptions found or unable to fetch subscriptions.");
        }
        Outcome::Completed(report) => {
            print!("\n{}", render(&report, Layout::Console));
            let path = report::save(&report, &config.report_dir)?;
            println!("\nResults saved to: {}", path.display());
        }
    }
    Ok(())
}
