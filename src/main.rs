use anyhow::{Context, Result};
use solar_power_forecaster::{config, forecast, telemetry};
use config::Config;
use forecast::{ForecastOrchestrator, JsonFileWeatherSource};
use std::sync::Arc;
use telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let location = cfg.site.location()?;
    let capacity = cfg.plant.capacity()?;

    let model = cfg
        .model
        .store()
        .load(&cfg.model.version)
        .with_context(|| format!("Failed to load model version {}", cfg.model.version))?;

    let orchestrator =
        ForecastOrchestrator::new(Arc::new(model)).with_tilt_optimizer(cfg.tilt.optimizer());
    let weather = JsonFileWeatherSource::new(cfg.weather.observations_path());

    info!(site = %location, capacity = %capacity, "starting forecast run");
    let run = orchestrator.run(&weather, &location, capacity).await?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    info!(
        total_energy_mwh = run.total_energy_mwh(),
        peak_power_mw = run.peak_power_mw(),
        tilt = %run.optimal_tilt,
        "forecast run finished"
    );
    Ok(())
}
