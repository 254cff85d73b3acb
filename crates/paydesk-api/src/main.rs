use paydesk_api::services::overdue::OverdueSweeper;
use paydesk_api::setup;
use paydesk_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    let sweeper = OverdueSweeper::start(
        state.db.invoices.clone(),
        config.overdue_sweep_interval_secs,
    );

    setup::server::start_server(&config, router).await?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    Ok(())
}
