use std::sync::Arc;

use anyhow::Result;
use stockroom::config::Settings;
use stockroom::race;
use stockroom::store::ElasticsearchStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings);

    info!(
        address = %settings.store.address,
        index = %settings.store.index,
        "starting optimistic-update race demonstration"
    );

    let store = Arc::new(ElasticsearchStore::from_settings(&settings)?);
    let report = race::run(store).await?;

    info!(
        conflict_observed = report.conflict_was_observed(),
        attempts_by_second_writer = report.second.attempts.len(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        document = %report.final_document,
        "demonstration finished"
    );

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
