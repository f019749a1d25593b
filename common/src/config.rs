use serde::{Deserialize, Serialize};

use crate::store::MARKED_LEN;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub file: String,
    pub size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: "eeprom.bin".to_string(),
            size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SensorConfig {
    W1 { device: String },
    Mqtt(MqttConfig),
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::Mqtt(MqttConfig::default())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaterConfig {
    #[serde(default)]
    pub gpio_value_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub timezone: String,
    pub http_port: u16,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub heater: HeaterConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Berlin".to_string(),
            http_port: 8080,
            storage: StorageConfig::default(),
            sensor: SensorConfig::default(),
            heater: HeaterConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.storage.size = self.storage.size.max(MARKED_LEN);
        if self.storage.file.trim().is_empty() {
            self.storage.file = StorageConfig::default().file;
        }

        if self
            .heater
            .gpio_value_path
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            self.heater.gpio_value_path = None;
        }
    }
}
