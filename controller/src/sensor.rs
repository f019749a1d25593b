use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tracing::{debug, info, warn};

use timetemp_common::{
    w1::{parse_w1_slave, slave_path},
    MqttConfig, SENSOR_DISCONNECTED_C, TOPIC_SENSOR_TEMP,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 64;

/// Source of the single Celsius reading used each cycle.
///
/// Never fails: an unreadable sensor reports `SENSOR_DISCONNECTED_C`.
pub trait TemperatureSensor: Send + Sync {
    fn read_celsius(&self) -> f32;
}

/// A DS18B20 conversion blocks for most of a second, so reads go to the blocking pool.
pub async fn read(sensor: &Arc<dyn TemperatureSensor>) -> f32 {
    let sensor = sensor.clone();
    match tokio::task::spawn_blocking(move || sensor.read_celsius()).await {
        Ok(celsius) => celsius,
        Err(err) => {
            warn!("sensor read task failed: {err}");
            SENSOR_DISCONNECTED_C
        }
    }
}

pub struct W1Sensor {
    path: PathBuf,
}

impl W1Sensor {
    pub fn new(device: &str) -> Self {
        Self {
            path: PathBuf::from(slave_path(device)),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemperatureSensor for W1Sensor {
    fn read_celsius(&self) -> f32 {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => parse_w1_slave(&raw).unwrap_or_else(|| {
                debug!("unusable w1 reading from {}", self.path.display());
                SENSOR_DISCONNECTED_C
            }),
            Err(err) => {
                debug!("w1 read failed for {}: {err}", self.path.display());
                SENSOR_DISCONNECTED_C
            }
        }
    }
}

/// Latest value published on the sensor topic.
pub struct MqttSensor {
    latest: Arc<AtomicU32>,
    _client: AsyncClient,
}

impl MqttSensor {
    pub fn spawn(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new("timetemp-controller", config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if !config.user.is_empty() {
            options.set_credentials(config.user.clone(), config.pass.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        let latest = Arc::new(AtomicU32::new(SENSOR_DISCONNECTED_C.to_bits()));

        let subscriber = client.clone();
        let sink = latest.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("mqtt connected");
                        if let Err(err) = subscriber.try_subscribe(TOPIC_SENSOR_TEMP, QoS::AtMostOnce)
                        {
                            warn!("sensor topic subscribe failed: {err}");
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(message))) => {
                        if message.topic == TOPIC_SENSOR_TEMP {
                            record_reading(&sink, &message.payload);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("mqtt poll error: {err}");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });

        Self {
            latest,
            _client: client,
        }
    }
}

impl TemperatureSensor for MqttSensor {
    fn read_celsius(&self) -> f32 {
        f32::from_bits(self.latest.load(Ordering::Relaxed))
    }
}

fn record_reading(sink: &AtomicU32, payload: &[u8]) {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!("dropping oversized sensor payload ({} bytes)", payload.len());
        return;
    }

    let parsed = std::str::from_utf8(payload)
        .ok()
        .and_then(|text| text.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite());

    match parsed {
        Some(celsius) => sink.store(celsius.to_bits(), Ordering::Relaxed),
        None => warn!("ignoring malformed sensor payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eeprom::tests::scratch_dir;

    #[test]
    fn w1_sensor_reads_sysfs_format() {
        let dir = scratch_dir("w1-ok");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("w1_slave");
        std::fs::write(
            &path,
            "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=19500\n",
        )
        .unwrap();

        assert_eq!(W1Sensor::from_path(&path).read_celsius(), 19.5);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_w1_device_reports_disconnected() {
        let sensor = W1Sensor::from_path(scratch_dir("w1-missing").join("w1_slave"));
        assert_eq!(sensor.read_celsius(), SENSOR_DISCONNECTED_C);
    }

    struct ThreadSensor(std::sync::Mutex<Option<std::thread::ThreadId>>);

    impl TemperatureSensor for ThreadSensor {
        fn read_celsius(&self) -> f32 {
            *self.0.lock().unwrap() = Some(std::thread::current().id());
            20.0
        }
    }

    #[tokio::test]
    async fn reads_run_on_the_blocking_pool() {
        let recorder = Arc::new(ThreadSensor(std::sync::Mutex::new(None)));
        let sensor: Arc<dyn TemperatureSensor> = recorder.clone();

        assert_eq!(read(&sensor).await, 20.0);

        let reader = recorder.0.lock().unwrap().expect("sensor was read");
        assert_ne!(reader, std::thread::current().id());
    }

    #[test]
    fn records_only_numeric_payloads() {
        let sink = AtomicU32::new(SENSOR_DISCONNECTED_C.to_bits());

        record_reading(&sink, b" 21.25\n");
        assert_eq!(f32::from_bits(sink.load(Ordering::Relaxed)), 21.25);

        record_reading(&sink, b"warm");
        record_reading(&sink, b"NaN");
        record_reading(&sink, &[b'1'; 100]);
        assert_eq!(f32::from_bits(sink.load(Ordering::Relaxed)), 21.25);
    }
}
