use std::time::Duration;

use anyhow::Context;
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use timetemp_common::{
    w1::{parse_w1_slave, slave_path},
    SENSOR_DISCONNECTED_C, TOPIC_SENSOR_STATUS, TOPIC_SENSOR_TEMP,
};

const PUBLISH_INTERVAL: Duration = Duration::from_secs(30);

enum Probe {
    W1 { path: String },
    Simulated,
}

impl Probe {
    fn from_env() -> Self {
        match std::env::var("TIMETEMP_W1_DEVICE") {
            Ok(device) if !device.trim().is_empty() => Self::W1 {
                path: slave_path(device.trim()),
            },
            _ => Self::Simulated,
        }
    }

    async fn read_celsius(&self, tick: u64) -> f32 {
        match self {
            Self::W1 { path } => match tokio::fs::read_to_string(path).await {
                Ok(raw) => parse_w1_slave(&raw).unwrap_or_else(|| {
                    warn!("unusable DS18B20 reading from {path}");
                    SENSOR_DISCONNECTED_C
                }),
                Err(err) => {
                    warn!("failed to read DS18B20 at {path}: {err}");
                    SENSOR_DISCONNECTED_C
                }
            },
            Self::Simulated => simulated_celsius(tick),
        }
    }
}

/// Drifts between 13.0 and 19.0 so both day and night thresholds get crossed.
fn simulated_celsius(tick: u64) -> f32 {
    let phase = (tick % 24) as f32;
    let offset = if phase < 12.0 { phase } else { 24.0 - phase };
    13.0 + offset * 0.5
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut mqtt_options = MqttOptions::new("timetemp-sensor", mqtt_host, mqtt_port);
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_SENSOR_STATUS,
        "offline",
        QoS::AtLeastOnce,
        true,
    ));

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    mqtt.publish(TOPIC_SENSOR_STATUS, QoS::AtLeastOnce, true, "online")
        .await
        .context("failed to publish sensor online status")?;

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("sensor mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    let probe = Probe::from_env();
    match &probe {
        Probe::W1 { path } => info!("sensor publisher started, reading {path}"),
        Probe::Simulated => info!("sensor publisher started with simulated readings"),
    }

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(PUBLISH_INTERVAL);

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        let celsius = probe.read_celsius(tick).await;
        mqtt.publish(TOPIC_SENSOR_TEMP, QoS::AtLeastOnce, true, format!("{celsius:.2}"))
            .await
            .context("failed to publish sensor temperature")?;
    }
}
