use std::collections::HashMap;

use crate::schedule::ScheduleSet;

pub const DAY_HOUR: &str = "day_hour";
pub const DAY_MINUTE: &str = "day_minute";
pub const DAY_ON: &str = "day_on";
pub const DAY_OFF: &str = "day_off";
pub const NIGHT_HOUR: &str = "night_hour";
pub const NIGHT_MINUTE: &str = "night_minute";
pub const NIGHT_ON: &str = "night_on";
pub const NIGHT_OFF: &str = "night_off";

pub const FIELD_NAMES: [&str; 8] = [
    DAY_HOUR,
    DAY_MINUTE,
    DAY_ON,
    DAY_OFF,
    NIGHT_HOUR,
    NIGHT_MINUTE,
    NIGHT_ON,
    NIGHT_OFF,
];

// Leading digits only, 0 when there are none, saturated to the field width.
pub fn parse_int_or_zero(raw: &str) -> i16 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut magnitude: i32 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        magnitude = magnitude
            .saturating_mul(10)
            .saturating_add(i32::from(digit - b'0'));
    }

    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

pub fn schedule_from_params(params: &HashMap<String, String>) -> Option<ScheduleSet> {
    let mut fields = [0i16; 8];
    for (slot, name) in fields.iter_mut().zip(FIELD_NAMES) {
        *slot = parse_int_or_zero(params.get(name)?);
    }
    Some(ScheduleSet::from_fields(fields))
}
