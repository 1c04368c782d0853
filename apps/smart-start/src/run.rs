use crate::config::{ConfigError, Settings};
use crate::schedule::stages_at;
use chrono::{DateTime, Utc};
use tenko_protocol::client::StageApi;
use tenko_protocol::messages::StageResult;
use thiserror::Error;
use tracing::{error, info};

/// Why a tick ended without updating the stages.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Authentication failed (status {status:?})")]
    AuthRejected { status: String },

    #[error("Error processing request")]
    Api(#[from] tenko_protocol::Error),
}

/// One tick: log in, work out the stages for `now` and submit them.
///
/// Every failure is logged here and handed back to the caller; nothing panics or
/// escapes in any other way.
pub async fn run_once<A>(api: &A, settings: &Settings, now: DateTime<Utc>) -> Result<StageResult, RunError>
where
    A: StageApi + ?Sized,
{
    info!(at = %now.with_timezone(&settings.utc_offset), "Timer tick");

    let result = submit(api, settings, now).await;
    match &result {
        Ok(stage_result) => info!(message = %stage_result.message, "Stage result"),
        Err(RunError::Config(e)) => error!(error = %e, "Configuration error"),
        Err(e @ RunError::AuthRejected { .. }) => error!("{}", e),
        Err(RunError::Api(e)) => error!(error = %e, endpoint = e.endpoint(), details = ?e, "Error processing request"),
    }
    result
}

async fn submit<A>(api: &A, settings: &Settings, now: DateTime<Utc>) -> Result<StageResult, RunError>
where
    A: StageApi + ?Sized,
{
    let credentials = settings.credentials()?;
    info!(login = %credentials.login, "Login");

    let auth = api.authenticate(credentials.login, credentials.password).await?;
    if !auth.is_ok() {
        return Err(RunError::AuthRejected { status: auth.status });
    }

    let stages = stages_at(now, settings.utc_offset);
    info!(%stages, "Setting stages");
    Ok(api.set_stages(&auth.token, stages).await?)
}
