//! PersistenceLog trait - durable row store interface

use serde::{Deserialize, Serialize};

use crate::{Reading, StoreError};

/// One row per accepted reading, immutable after insertion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub reading: Reading,

    /// Primary sink outcome for this cycle
    pub posted: bool,
}

impl PersistedRecord {
    pub fn new(reading: Reading, posted: bool) -> Self {
        Self { reading, posted }
    }

    /// Posted flag as stored (1/0)
    pub fn posted_flag(&self) -> i64 {
        i64::from(self.posted)
    }
}

/// Append-only store of accepted readings
///
/// Writes are synchronous and sequential; a single pipeline owns the log.
pub trait PersistenceLog: Send {
    /// Store name (used for logging)
    fn name(&self) -> &str;

    /// Append one record
    ///
    /// # Errors
    /// Store unavailable or insert rejected
    fn record(&mut self, record: &PersistedRecord) -> Result<(), StoreError>;
}

/// Log used when the store could not be opened
///
/// Every write fails with `StoreError::Unavailable`, so failures keep
/// surfacing in the operational log instead of being silently skipped.
#[derive(Debug, Clone)]
pub struct UnavailableLog {
    reason: String,
}

impl UnavailableLog {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PersistenceLog for UnavailableLog {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn record(&mut self, _record: &PersistedRecord) -> Result<(), StoreError> {
        Err(StoreError::unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MotionReading, StationCode};

    #[test]
    fn posted_flag_is_integer() {
        let reading = Reading::Motion(MotionReading {
            station: StationCode::from_code(0),
            motion: 1,
        });
        assert_eq!(PersistedRecord::new(reading, true).posted_flag(), 1);
        assert_eq!(PersistedRecord::new(reading, false).posted_flag(), 0);
    }

    #[test]
    fn unavailable_log_always_fails() {
        let mut log = UnavailableLog::new("no such file");
        let reading = Reading::Motion(MotionReading {
            station: StationCode::from_code(0),
            motion: 0,
        });
        let err = log.record(&PersistedRecord::new(reading, false)).unwrap_err();
        assert!(err.to_string().contains("no such file"));
    }
}
