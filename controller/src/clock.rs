use chrono::Utc;
use chrono_tz::Tz;
use tracing::warn;

use timetemp_common::WallClock;

/// Local time in the configured zone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    pub fn from_name(timezone: &str) -> Self {
        let tz = timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!("unknown timezone {timezone:?}, using UTC");
            Tz::UTC
        });
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> WallClock {
        WallClock::from_chrono(&Utc::now().with_timezone(&self.tz))
    }
}
