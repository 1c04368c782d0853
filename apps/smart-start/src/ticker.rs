use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Decides when the run logic fires.
#[async_trait]
pub trait Trigger: Send {
    /// Waits for the next tick. Returns false once the trigger is done.
    async fn wait(&mut self) -> bool;
}

/// Fires exactly once.
#[derive(Default)]
pub struct Once {
    fired: bool,
}

#[async_trait]
impl Trigger for Once {
    async fn wait(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }
}

type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Fires immediately and then every `period` until `shutdown` resolves.
/// Ticks missed while a run is still going are dropped, not replayed.
pub struct Every {
    ticker: Interval,
    shutdown: Option<Shutdown>,
}

impl Every {
    pub fn new<S>(period: Duration, shutdown: S) -> Every
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Every {
            ticker,
            shutdown: Some(Box::pin(shutdown)),
        }
    }
}

#[async_trait]
impl Trigger for Every {
    async fn wait(&mut self) -> bool {
        let Some(shutdown) = self.shutdown.as_mut() else {
            return false;
        };
        let fired = tokio::select! {
            biased;
            _ = shutdown => false,
            _ = self.ticker.tick() => true,
        };
        if !fired {
            self.shutdown = None;
        }
        fired
    }
}

/// Calls `job` on every tick of `trigger`, one run at a time. Returns the number of runs.
pub async fn drive<T, F, Fut>(trigger: &mut T, mut job: F) -> u64
where
    T: Trigger + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut runs = 0;
    while trigger.wait().await {
        job().await;
        runs += 1;
    }
    runs
}
