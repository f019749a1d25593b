use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use tracing::info;

use timetemp_common::{ActuatorState, HeaterConfig};

/// Physical heater relay.
pub trait HeaterOutput: Send + Sync {
    fn drive(&self, state: ActuatorState) -> anyhow::Result<()>;
}

/// Relay writes are file I/O; run them on the blocking pool.
pub async fn drive(heater: &Arc<dyn HeaterOutput>, state: ActuatorState) -> anyhow::Result<()> {
    let heater = heater.clone();
    tokio::task::spawn_blocking(move || heater.drive(state))
        .await
        .context("heater write task failed")?
}

/// Relay on a sysfs GPIO line; the pin must already be exported as an output.
pub struct GpioHeater {
    value_path: PathBuf,
}

impl GpioHeater {
    pub fn new(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
        }
    }
}

impl HeaterOutput for GpioHeater {
    fn drive(&self, state: ActuatorState) -> anyhow::Result<()> {
        let level = if state.is_on() { "1" } else { "0" };
        std::fs::write(&self.value_path, level)
            .with_context(|| format!("failed to write {}", self.value_path.display()))
    }
}

/// Stand-in when no relay is wired up.
#[derive(Default)]
pub struct LogHeater {
    on: AtomicBool,
}

impl HeaterOutput for LogHeater {
    fn drive(&self, state: ActuatorState) -> anyhow::Result<()> {
        if self.on.swap(state.is_on(), Ordering::Relaxed) != state.is_on() {
            info!("heater output (simulated): {state}");
        }
        Ok(())
    }
}

pub fn from_config(config: &HeaterConfig) -> Arc<dyn HeaterOutput> {
    match &config.gpio_value_path {
        Some(path) => Arc::new(GpioHeater::new(path)),
        None => Arc::new(LogHeater::default()),
    }
}
