use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::env;
use tenko_protocol::client::TenkoClient;
use tenko_smart_start::config::Settings;
use tenko_smart_start::run::run_once;
use tenko_smart_start::ticker::{drive, Every, Once, Trigger};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Returns whether to run a single tick.
fn parse_args(args: &[String]) -> Result<bool> {
    let program = args.first().map_or("tenko-smart-start", String::as_str);
    match args.get(1).map(String::as_str) {
        None => Ok(false),
        Some("--once") if args.len() == 2 => Ok(true),
        Some(arg) => bail!("Usage: {} [--once]\nUnknown arg: {}", program, arg),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let once = parse_args(&args)?;

    init_logging();

    let settings = Settings::from_env().context("Failed to read settings")?;
    let client = TenkoClient::new(&settings.api_url);

    let mut trigger: Box<dyn Trigger> = if once {
        Box::new(Once::default())
    } else {
        Box::new(Every::new(settings.tick, shutdown_signal()))
    };

    info!(api = %client.base_url(), tick_secs = settings.tick.as_secs(), once, "Starting smart start");
    let (client, settings) = (&client, &settings);
    let runs = drive(trigger.as_mut(), move || async move {
        // The outcome is already logged; a failed tick never stops the loop.
        let _ = run_once(client, settings, Utc::now()).await;
    })
    .await;
    info!(runs, "Stopped");
    Ok(())
}
