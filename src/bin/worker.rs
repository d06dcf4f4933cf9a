use anyhow::Result;
use gazette::{
    app_state::{AppState, init_tracing},
    config::Config,
    scheduler::Scheduler,
    status::latest_status,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format());

    let state = AppState::connect(&config).await?;

    let status = latest_status(state.store.as_ref()).await?;
    info!(
        last_run = ?status.last_run,
        status = %status.status,
        articles = status.articles_count,
        "starting worker"
    );

    let scheduler = Scheduler::new(
        state.runner.clone(),
        state.provider.clone(),
        config.schedule_interval(),
    );
    let runs = scheduler.run_until_ctrl_c().await;

    info!(runs, "worker stopped");
    Ok(())
}
