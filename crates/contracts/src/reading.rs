//! Readings - Decoder output
//!
//! Raw radio codes and the typed readings decoded from them.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One radio reception event
///
/// Lives for a single pipeline cycle. A value of 0 is the receiver's
/// "unknown encoding" sentinel and never becomes a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCode {
    /// Bit-packed 32-bit payload
    pub value: u32,

    /// Monotonic receipt time
    pub received_at: Instant,
}

impl RawCode {
    /// Stamp a code with the current instant
    pub fn new(value: u32) -> Self {
        Self::at(value, Instant::now())
    }

    /// Stamp a code with an explicit instant
    pub fn at(value: u32, received_at: Instant) -> Self {
        Self { value, received_at }
    }

    /// Whether this is the unknown-encoding sentinel
    pub fn is_sentinel(&self) -> bool {
        self.value == 0
    }
}

/// 4-bit station identifier (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StationCode(u8);

impl StationCode {
    /// Highest station code that fits in 4 bits
    pub const MAX: u8 = 0x0F;

    /// Extract the station code from bits[31:28] of a raw code
    pub fn from_code(code: u32) -> Self {
        Self(((code >> 28) & 0x0F) as u8)
    }

    /// Station code as an integer
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StationCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            Err(format!("station code {value} does not fit in 4 bits"))
        } else {
            Ok(Self(value))
        }
    }
}

impl From<StationCode> for u8 {
    fn from(code: StationCode) -> Self {
        code.0
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Motion sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionReading {
    pub station: StationCode,

    /// Motion flag exactly as received (0 = off, non-zero = on)
    pub motion: u8,
}

impl MotionReading {
    /// Whether the flag is set
    pub fn is_active(&self) -> bool {
        self.motion != 0
    }
}

/// Temperature / humidity / battery reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub station: StationCode,

    /// °F, one decimal
    pub temperature_f: f64,

    /// %, one decimal
    pub humidity_pct: f64,

    /// mV, multiple of 50
    pub battery_millivolts: f64,
}

/// Decoded reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    Motion(MotionReading),
    Environment(EnvironmentReading),
}

impl Reading {
    /// Station the reading came from
    pub fn station(&self) -> StationCode {
        match self {
            Self::Motion(m) => m.station,
            Self::Environment(e) => e.station,
        }
    }

    /// Reading kind
    pub fn kind(&self) -> ReadingKind {
        match self {
            Self::Motion(_) => ReadingKind::Motion,
            Self::Environment(_) => ReadingKind::Environment,
        }
    }
}

/// Reading kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Motion,
    Environment,
}

impl ReadingKind {
    /// Last broker topic segment
    pub fn topic_segment(self) -> &'static str {
        match self {
            Self::Motion => "pir",
            Self::Environment => "dht",
        }
    }

    /// Durable store table
    pub fn table(self) -> &'static str {
        match self {
            Self::Motion => "pir",
            Self::Environment => "dht",
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion => write!(f, "motion"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// An accepted reading as handed to sinks
///
/// Carries the received code because the broker payload is the raw value,
/// not the decoded fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub code: u32,
    pub received_at: Instant,
    pub reading: Reading,
}

impl Observation {
    /// Pair a raw code with its decoded reading
    pub fn new(raw: RawCode, reading: Reading) -> Self {
        Self {
            code: raw.value,
            received_at: raw.received_at,
            reading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_code_masks_top_nibble() {
        assert_eq!(StationCode::from_code(0xF000_0000).get(), 15);
        assert_eq!(StationCode::from_code(0x1FFF_FFFF).get(), 1);
        assert_eq!(StationCode::from_code(0).get(), 0);
    }

    #[test]
    fn station_code_rejects_wide_values() {
        assert!(StationCode::try_from(15).is_ok());
        assert!(StationCode::try_from(16).is_err());
    }

    #[test]
    fn reading_serializes_with_kind_tag() {
        let reading = Reading::Motion(MotionReading {
            station: StationCode::from_code(0x3000_0000),
            motion: 1,
        });
        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["kind"], "motion");
        assert_eq!(json["station"], 3);
        assert_eq!(json["motion"], 1);
    }

    #[test]
    fn kind_names_match_tables_and_topics() {
        assert_eq!(ReadingKind::Motion.table(), "pir");
        assert_eq!(ReadingKind::Environment.topic_segment(), "dht");
    }

    #[test]
    fn sentinel_detection() {
        assert!(RawCode::new(0).is_sentinel());
        assert!(!RawCode::new(7).is_sentinel());
    }
}
