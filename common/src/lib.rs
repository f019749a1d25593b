pub mod config;
pub mod form;
pub mod hysteresis;
pub mod schedule;
pub mod store;
pub mod thermostat;
pub mod topics;
pub mod types;
pub mod w1;

pub use config::{HeaterConfig, MqttConfig, RuntimeConfig, SensorConfig, StorageConfig};
pub use form::{parse_int_or_zero, schedule_from_params, FIELD_NAMES};
pub use hysteresis::next_state;
pub use schedule::{DayOfWeek, ScheduleSet, ScheduleWindow, WallClock};
pub use store::{ByteStorage, ConfigStore, LoadOrigin, Loaded, MemoryStorage, StoreError};
pub use thermostat::{CycleReport, Thermostat, ThermostatEngine, UpdateOutcome};
pub use topics::*;
pub use types::{whole_degrees, ActuatorState, WindowKind, SENSOR_DISCONNECTED_C};
