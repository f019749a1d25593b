use std::collections::HashMap;

use crate::{
    form::schedule_from_params,
    hysteresis::next_state,
    schedule::{ScheduleSet, WallClock},
    store::{ByteStorage, ConfigStore, Loaded, StoreError},
    types::{whole_degrees, ActuatorState, WindowKind},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub time_label: String,
    pub window: WindowKind,
    pub on_threshold: i16,
    pub off_threshold: i16,
    pub temperature_c: i32,
    pub heater: ActuatorState,
    pub changed: bool,
}

// The heater state only changes through `cycle`.
#[derive(Debug, Clone)]
pub struct ThermostatEngine {
    schedule: ScheduleSet,
    heater: ActuatorState,
    last_reading_c: Option<f32>,
}

impl ThermostatEngine {
    pub fn new(schedule: ScheduleSet) -> Self {
        Self {
            schedule,
            heater: ActuatorState::Off,
            last_reading_c: None,
        }
    }

    pub fn schedule(&self) -> &ScheduleSet {
        &self.schedule
    }

    pub fn heater(&self) -> ActuatorState {
        self.heater
    }

    pub fn last_reading_c(&self) -> Option<f32> {
        self.last_reading_c
    }

    pub fn set_schedule(&mut self, schedule: ScheduleSet) {
        self.schedule = schedule;
    }

    pub fn cycle(&mut self, now: &WallClock, reading_c: f32) -> CycleReport {
        self.last_reading_c = Some(reading_c);

        let window = self.schedule.active_window(now.clock_value());
        let thresholds = *self.schedule.window(window);
        let temperature_c = whole_degrees(reading_c);

        let previous = self.heater;
        self.heater = next_state(temperature_c, &thresholds, previous);

        CycleReport {
            time_label: now.label(),
            window,
            on_threshold: thresholds.on_threshold,
            off_threshold: thresholds.off_threshold,
            temperature_c,
            heater: self.heater,
            changed: self.heater != previous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    ReadOnly,
    Applied(ScheduleSet),
}

#[derive(Debug)]
pub struct Thermostat<S> {
    engine: ThermostatEngine,
    store: ConfigStore<S>,
}

impl<S: ByteStorage> Thermostat<S> {
    // Only a region too small for the layout fails; a failed write-back of the
    // defaults or the marker is reported in `Loaded::commit_error`.
    pub fn boot(storage: S, defaults: &ScheduleSet) -> Result<(Self, Loaded), StoreError> {
        let mut store = ConfigStore::new(storage)?;
        let loaded = store.load(defaults);
        let thermostat = Self {
            engine: ThermostatEngine::new(loaded.schedule),
            store,
        };
        Ok((thermostat, loaded))
    }

    pub fn schedule(&self) -> &ScheduleSet {
        self.engine.schedule()
    }

    pub fn last_reading_c(&self) -> Option<f32> {
        self.engine.last_reading_c()
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn cycle(&mut self, now: &WallClock, reading_c: f32) -> CycleReport {
        self.engine.cycle(now, reading_c)
    }

    // The in-memory schedule is updated before the write, so a failed commit still
    // leaves the new values active.
    pub fn apply_update(
        &mut self,
        params: &HashMap<String, String>,
    ) -> Result<UpdateOutcome, StoreError> {
        let Some(schedule) = schedule_from_params(params) else {
            return Ok(UpdateOutcome::ReadOnly);
        };

        self.engine.set_schedule(schedule);
        self.store.save(&schedule)?;

        // The new schedule doubles as the defaults so a legacy-mode zero day hour
        // reads back as written.
        let reloaded = self.store.load(&schedule).schedule;
        self.engine.set_schedule(reloaded);
        Ok(UpdateOutcome::Applied(reloaded))
    }
}
