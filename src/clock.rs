use core::time::Duration;
use spin::Lazy;
use std::time::Instant;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic uptime clock, anchored at first use.
pub struct Clock;

impl Clock {
    pub fn now() -> Duration {
        START.elapsed()
    }

    pub fn format() -> String {
        let now = Clock::now();
        let seconds = now.as_secs();
        let minutes = seconds / 60;
        let hours = minutes / 60;
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours % 60,
            minutes % 60,
            seconds % 60,
            now.subsec_millis()
        )
    }

    pub fn elapsed(instant: Instant) -> Duration {
        instant.elapsed()
    }
}
