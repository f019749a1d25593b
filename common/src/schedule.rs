use chrono::{Datelike, Timelike, Weekday};

use crate::types::WindowKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn name(self) -> &'static str {
        match self {
            Self::Mon => "Monday",
            Self::Tue => "Tuesday",
            Self::Wed => "Wednesday",
            Self::Thu => "Thursday",
            Self::Fri => "Friday",
            Self::Sat => "Saturday",
            Self::Sun => "Sunday",
        }
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub weekday: DayOfWeek,
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(weekday: DayOfWeek, hour: u8, minute: u8) -> Self {
        Self {
            weekday,
            hour,
            minute,
        }
    }

    pub fn from_chrono<T: Datelike + Timelike>(now: &T) -> Self {
        Self {
            weekday: DayOfWeek::from_chrono(now.weekday()),
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    // 18:05 -> 1805
    pub fn clock_value(&self) -> i32 {
        i32::from(self.hour) * 100 + i32::from(self.minute)
    }

    pub fn label(&self) -> String {
        format!("{}, {:02}:{:02}", self.weekday.name(), self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start_hour: i16,
    pub start_minute: i16,
    pub on_threshold: i16,
    pub off_threshold: i16,
}

impl ScheduleWindow {
    pub fn new(start_hour: i16, start_minute: i16, on_threshold: i16, off_threshold: i16) -> Self {
        Self {
            start_hour,
            start_minute,
            on_threshold,
            off_threshold,
        }
    }

    pub fn start_clock_value(&self) -> i32 {
        i32::from(self.start_hour) * 100 + i32::from(self.start_minute)
    }

    pub fn is_inverted(&self) -> bool {
        self.on_threshold > self.off_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSet {
    pub day: ScheduleWindow,
    pub night: ScheduleWindow,
}

impl Default for ScheduleSet {
    fn default() -> Self {
        Self {
            day: ScheduleWindow::new(8, 0, 15, 18),
            night: ScheduleWindow::new(20, 0, 10, 12),
        }
    }
}

impl ScheduleSet {
    pub fn window(&self, kind: WindowKind) -> &ScheduleWindow {
        match kind {
            WindowKind::Day => &self.day,
            WindowKind::Night => &self.night,
        }
    }

    // Day only strictly between the two starts; ties and inverted starts give Night.
    pub fn active_window(&self, clock_value: i32) -> WindowKind {
        let day_start = self.day.start_clock_value();
        let night_start = self.night.start_clock_value();

        if day_start < clock_value && clock_value < night_start {
            WindowKind::Day
        } else {
            WindowKind::Night
        }
    }

    pub fn inverted_windows(&self) -> Vec<WindowKind> {
        [WindowKind::Day, WindowKind::Night]
            .into_iter()
            .filter(|kind| self.window(*kind).is_inverted())
            .collect()
    }

    pub fn to_fields(&self) -> [i16; 8] {
        [
            self.day.start_hour,
            self.day.start_minute,
            self.day.on_threshold,
            self.day.off_threshold,
            self.night.start_hour,
            self.night.start_minute,
            self.night.on_threshold,
            self.night.off_threshold,
        ]
    }

    pub fn from_fields(fields: [i16; 8]) -> Self {
        let [dh, dm, don, doff, nh, nm, non, noff] = fields;
        Self {
            day: ScheduleWindow::new(dh, dm, don, doff),
            night: ScheduleWindow::new(nh, nm, non, noff),
        }
    }
}
