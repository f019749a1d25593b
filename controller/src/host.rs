use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::Path,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use tokio::{
    net::TcpListener,
    sync::{watch, Mutex},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use timetemp_common::{
    ActuatorState, CycleReport, LoadOrigin, Loaded, RuntimeConfig, ScheduleSet, SensorConfig,
    Thermostat, WallClock,
};

use crate::{
    clock::Clock,
    eeprom::FileStorage,
    heater::{self, HeaterOutput},
    sensor::{self, MqttSensor, TemperatureSensor, W1Sensor},
    web,
};

/// Fixed delay between control cycles.
pub const CYCLE_PERIOD: Duration = Duration::from_secs(1);

/// Everything the control loop and the web handlers share. The thermostat mutex is
/// the single boundary serializing cycles, updates, and page renders.
#[derive(Clone)]
pub struct AppState {
    pub thermostat: Arc<Mutex<Thermostat<FileStorage>>>,
    pub sensor: Arc<dyn TemperatureSensor>,
    pub clock: Clock,
    relay_on: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        thermostat: Thermostat<FileStorage>,
        sensor: Arc<dyn TemperatureSensor>,
        clock: Clock,
    ) -> Self {
        Self {
            thermostat: Arc::new(Mutex::new(thermostat)),
            sensor,
            clock,
            relay_on: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Last state the relay accepted, which lags the engine while writes fail.
    pub fn relay(&self) -> ActuatorState {
        if self.relay_on.load(Ordering::Relaxed) {
            ActuatorState::On
        } else {
            ActuatorState::Off
        }
    }

    fn set_relay(&self, state: ActuatorState) {
        self.relay_on.store(state.is_on(), Ordering::Relaxed);
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = data_dir();
    let mut runtime = load_runtime_config(&data_dir).await.unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime);
    runtime.sanitize();

    let storage_path = data_dir.join(&runtime.storage.file);
    let (thermostat, loaded) = boot_thermostat(storage_path.clone(), runtime.storage.size).await?;
    match loaded.origin {
        LoadOrigin::Stored => info!("schedule loaded from {}", storage_path.display()),
        LoadOrigin::Initialized => info!("blank storage, wrote default schedule"),
        LoadOrigin::Migrated => info!("marked legacy schedule image as initialized"),
    }
    if let Some(err) = &loaded.commit_error {
        warn!("schedule write-back failed, running on loaded values: {err}");
    }
    warn_inverted(thermostat.schedule());

    let heater = heater::from_config(&runtime.heater);

    let sensor: Arc<dyn TemperatureSensor> = match &runtime.sensor {
        SensorConfig::W1 { device } => {
            info!("reading DS18B20 {device}");
            Arc::new(W1Sensor::new(device))
        }
        SensorConfig::Mqtt(mqtt) => {
            info!("reading temperature from mqtt {}:{}", mqtt.host, mqtt.port);
            Arc::new(MqttSensor::spawn(mqtt))
        }
    };

    let clock = Clock::from_name(&runtime.timezone);
    info!("schedule evaluated in {}", clock.timezone());
    let state = AppState::new(thermostat, sensor, clock);

    let (stop_tx, stop_rx) = watch::channel(false);
    let control = tokio::spawn(run_control_loop(state.clone(), heater, stop_rx));

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for shutdown signal: {err}");
            }
            info!("stop requested");
            let _ = stop_tx.send(true);
        })
        .await?;

    control.await.context("control loop task failed")?;
    Ok(())
}

async fn boot_thermostat(
    path: PathBuf,
    size: usize,
) -> anyhow::Result<(Thermostat<FileStorage>, Loaded)> {
    tokio::task::spawn_blocking(move || {
        let storage = FileStorage::open(&path, size)
            .with_context(|| format!("failed to open storage at {}", path.display()))?;
        Thermostat::boot(storage, &ScheduleSet::default())
            .context("failed to load schedule from storage")
    })
    .await
    .context("storage boot task failed")?
}

async fn run_control_loop(
    state: AppState,
    heater: Arc<dyn HeaterOutput>,
    stop: watch::Receiver<bool>,
) {
    if let Err(err) = heater::drive(&heater, ActuatorState::Off).await {
        warn!("failed to initialize heater output: {err:#}");
    }
    state.set_relay(ActuatorState::Off);

    loop {
        let now = state.clock.now();
        let report = control_step(&state, &heater, now).await;
        info!(
            time = %report.time_label,
            window = %report.window,
            on = report.on_threshold,
            temp = report.temperature_c,
            off = report.off_threshold,
            heater = %report.heater,
            "control cycle"
        );

        // The delay always runs to completion; the stop flag is only seen afterwards.
        tokio::time::sleep(CYCLE_PERIOD).await;
        if *stop.borrow() {
            break;
        }
    }

    if let Err(err) = heater::drive(&heater, ActuatorState::Off).await {
        warn!("failed to release heater on stop: {err:#}");
    }
    state.set_relay(ActuatorState::Off);
    info!("control loop stopped");
}

/// One cycle: read the sensor, evaluate, and push a changed state to the relay.
/// A failed relay write is retried on the next cycle.
pub(crate) async fn control_step(
    state: &AppState,
    heater: &Arc<dyn HeaterOutput>,
    now: WallClock,
) -> CycleReport {
    let reading = sensor::read(&state.sensor).await;
    let report = state.thermostat.lock().await.cycle(&now, reading);

    if report.changed {
        info!("heater {} ({} at {})", report.heater, report.window, report.time_label);
    }
    if report.heater != state.relay() {
        match heater::drive(heater, report.heater).await {
            Ok(()) => state.set_relay(report.heater),
            Err(err) => warn!("failed to drive heater: {err:#}"),
        }
    }

    report
}

pub(crate) fn warn_inverted(schedule: &ScheduleSet) {
    for kind in schedule.inverted_windows() {
        let window = schedule.window(kind);
        warn!(
            "{kind} window turns on below {} but off above {}; no dead-band",
            window.on_threshold, window.off_threshold
        );
    }
}

fn data_dir() -> PathBuf {
    std::env::var("TIMETEMP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.timetemp"))
}

async fn load_runtime_config(data_dir: &Path) -> anyhow::Result<RuntimeConfig> {
    let path = data_dir.join("runtime.json");
    match tokio::fs::read(&path).await {
        Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
            .with_context(|| format!("malformed {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    if let Some(port) = env_parse::<u16>("TIMETEMP_HTTP_PORT") {
        runtime.http_port = port;
    }
    if let Ok(timezone) = std::env::var("TIMETEMP_TZ") {
        runtime.timezone = timezone;
    }

    if let SensorConfig::Mqtt(mqtt) = &mut runtime.sensor {
        if let Ok(host) = std::env::var("MQTT_HOST") {
            mqtt.host = host;
        }
        if let Some(port) = env_parse::<u16>("MQTT_PORT") {
            mqtt.port = port;
        }
        if let Ok(user) = std::env::var("MQTT_USER") {
            mqtt.user = user;
        }
        if let Ok(pass) = std::env::var("MQTT_PASS") {
            mqtt.pass = pass;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}
