//! Periodic trigger for pipeline runs.
//!
//! At most one run is in flight: a tick that fires while the previous run is
//! still going is skipped. Shutdown stops the ticker and waits for the
//! in-flight run so its summary still reaches the store.

use std::sync::Arc;
use std::time::Duration;
use tokio::{
    signal,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::entities::RunSummary;
use crate::pipeline::PipelineRunner;
use crate::repositories::SourceProvider;

pub struct Scheduler {
    runner: Arc<PipelineRunner>,
    provider: Arc<dyn SourceProvider>,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl Scheduler {
    pub fn new(
        runner: Arc<PipelineRunner>,
        provider: Arc<dyn SourceProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            provider,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`Scheduler::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Trigger runs until ctrl-c or until the shutdown token is cancelled.
    pub async fn run_until_ctrl_c(self) -> usize {
        let shutdown_token = self.shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("received shutdown signal, finishing the current run");
            shutdown_token.cancel();
        });

        self.run().await
    }

    /// Trigger a run on every tick, the first one immediately. Returns how
    /// many runs completed; their summaries are already in the store.
    pub async fn run(self) -> usize {
        info!(interval_secs = self.interval.as_secs(), "scheduler started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0;
        let mut in_flight: Option<JoinHandle<RunSummary>> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(handle) = in_flight.take_if(|h| h.is_finished()) {
                        completed += collect(handle).await;
                    }
                    if in_flight.is_some() {
                        warn!("previous run still in progress, skipping tick");
                        continue;
                    }
                    in_flight = Some(self.runner.spawn(Arc::clone(&self.provider)));
                }
            }
        }

        if let Some(handle) = in_flight {
            info!("waiting for the in-flight run");
            completed += collect(handle).await;
        }
        info!(runs = completed, "scheduler stopped");
        completed
    }
}

/// 1 when the run finished, 0 when its task failed.
async fn collect(handle: JoinHandle<RunSummary>) -> usize {
    match handle.await {
        Ok(summary) => {
            debug!(run_id = %summary.run_id, status = %summary.status, "run collected");
            1
        }
        Err(e) => {
            error!(error = %e, "pipeline run task failed");
            0
        }
    }
}
