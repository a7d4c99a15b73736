use anyhow::Context;
use dotenvy::dotenv;

use tippool::config::Config;
use tippool::models::OverridePayload;
use tippool::session::SessionCoordinator;
use tippool::store::JsonScheduleStore;

use tracing::{info, warn};
use tracing_appender::rolling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "tippool.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Allocation run starting...");

    let store = JsonScheduleStore::new(&config.schedule_file);
    let record = store
        .load_record()
        .context("failed to load payout schedule")?;
    let schedule_id = record.schedule_id;
    let business_date = record.business_date;

    let coordinator = SessionCoordinator::new(store, config.reconcile_tolerance);
    let mut session = coordinator.load_session(schedule_id, business_date).await?;

    let report = session.reallocate();
    if report.has_missing_roles() {
        warn!(roles = ?report.missing_roles, "entitled roles with no eligible receiver");
    }
    info!(
        schedule_id,
        total_receiver_percentage = report.total_receiver_percentage,
        net_payout_total = report.net_payout_total,
        "allocation pass finished"
    );

    let payload = OverridePayload::from_schedule(session.schedule(), &[]);
    println!("{}", serde_json::to_string_pretty(&payload)?);

    info!(schedule_id, "Allocation run complete");
    Ok(())
}
