use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::env;
use tenko_protocol::client::{StageApi, TenkoClient};
use tenko_protocol::messages::StagePair;
use tenko_smart_start::config::Settings;
use tenko_smart_start::schedule::stages_at;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn parse_mode(arg: &str, settings: &Settings) -> Result<StagePair> {
    Ok(match arg {
        "1" => StagePair::stage_1_on(),
        "2" => StagePair::stage_2_on(),
        "auto" => stages_at(Utc::now(), settings.utc_offset),
        _ => bail!("Unknown mode: {}", arg),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("Usage: (1|2|auto)");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;
    let stages = parse_mode(&args[1], &settings)?;
    let credentials = settings.credentials()?;

    let client = TenkoClient::new(&settings.api_url);
    let auth = client
        .authenticate(credentials.login, credentials.password)
        .await
        .context("Login request failed")?;
    if !auth.is_ok() {
        bail!("Authentication failed (status {:?})", auth.status);
    }

    let result = client.set_stages(&auth.token, stages).await.context("Stage update failed")?;
    info!(%stages, message = %result.message, "Set");
    Ok(())
}
