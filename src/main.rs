use tracing::info;

use staybook::config::Config;
use staybook::replay::{self, Scenario};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the event stream; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env()?;
    staybook::observability::init(config.metrics_port)?;

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: staybook <scenario.json>")?;
    let raw = std::fs::read_to_string(&path)?;
    let scenario: Scenario = serde_json::from_str(&raw)?;

    info!("staybook replaying {path}");
    info!("  horizon: {} months", config.horizon_months);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let today = chrono::Local::now().date_naive();
    let records = replay::run(scenario, today, config.horizon_months).await?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }

    info!("{} events emitted", records.len());
    Ok(())
}
