pub const TOPIC_SENSOR_TEMP: &str = "timetemp/sensor/temperature";
pub const TOPIC_SENSOR_STATUS: &str = "timetemp/sensor/status";
