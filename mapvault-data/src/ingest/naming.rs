//! Time-ordered storage names.

use std::sync::atomic::{AtomicU64, Ordering};

use mapvault_core::{StorageName, StorageNameError};
use time::OffsetDateTime;

/// Milliseconds since the Unix epoch from the system clock.
fn system_millis() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or(0)
}

/// Issues storage names prefixed by a strictly increasing millisecond stamp.
///
/// When the clock has not advanced (or went backwards) since the previous
/// name, the stamp is bumped one past the last one issued.
#[derive(Debug)]
pub struct StorageNamer {
    last: AtomicU64,
    clock: fn() -> u64,
}

impl Default for StorageNamer {
    fn default() -> Self {
        Self::with_clock(system_millis)
    }
}

impl StorageNamer {
    /// Namer driven by a custom millisecond clock.
    #[must_use]
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            last: AtomicU64::new(0),
            clock,
        }
    }

    /// Next stamp: the clock reading, or one past the previous stamp.
    pub fn next_stamp(&self) -> u64 {
        let now = (self.clock)();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous.saturating_add(1));
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }

    /// Storage name for an upload whose sanitised client name is `original`.
    pub fn name_for(&self, original: &str) -> Result<StorageName, StorageNameError> {
        StorageName::generate(self.next_stamp(), original)
    }
}
