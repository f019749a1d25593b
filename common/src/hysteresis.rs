use crate::{schedule::ScheduleWindow, types::ActuatorState};

// Off is checked last, so it wins when the thresholds are inverted.
pub fn next_state(temp_c: i32, window: &ScheduleWindow, current: ActuatorState) -> ActuatorState {
    let mut next = current;

    if temp_c < i32::from(window.on_threshold) {
        next = ActuatorState::On;
    }
    if temp_c > i32::from(window.off_threshold) {
        next = ActuatorState::Off;
    }

    next
}
