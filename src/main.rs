use anyhow::Result;
use gazette::{
    app_state::{AppState, init_tracing},
    config::Config,
};

/// Run the pipeline once and print the run summary.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format());

    let state = AppState::connect(&config).await?;
    let report = state.runner.run_from(state.provider.as_ref()).await;

    println!("{}", serde_json::to_string_pretty(&report.summary)?);
    Ok(())
}
