//! Bit-layout decoder
//!
//! Layout, MSB to LSB:
//!
//! ```text
//! 31    28 27          18 17           8 7        0
//! +-------+--------------+--------------+----------+
//! |station|   field A    |   field B    | field C  |
//! | 4 bit |    10 bit    |    10 bit    |  8 bit   |
//! +-------+--------------+--------------+----------+
//! ```
//!
//! Fields A and B both zero mark a motion reading (field C is the flag);
//! anything else is an environment reading (A = °F x10, B = % x10, C = mV / 50).

use contracts::{EnvironmentReading, MotionReading, Reading, StationCode};

use crate::error::DecodeError;

const TEN_BIT_MASK: u32 = 0x3FF;
const BATTERY_STEP_MV: f64 = 50.0;

/// The four bit fields of a raw code, before classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFields {
    pub station: u8,
    pub field_a: u16,
    pub field_b: u16,
    pub field_c: u8,
}

impl RawFields {
    /// Split a raw code into its fields
    pub fn split(code: u32) -> Self {
        Self {
            station: StationCode::from_code(code).get(),
            field_a: ((code >> 18) & TEN_BIT_MASK) as u16,
            field_b: ((code >> 8) & TEN_BIT_MASK) as u16,
            field_c: (code & 0xFF) as u8,
        }
    }

    /// Whether the fields classify as a motion reading
    pub fn is_motion(&self) -> bool {
        self.field_a == 0 && self.field_b == 0
    }
}

/// Decode a raw code into a reading
///
/// Total over every non-zero code; pure and free of shared state.
///
/// # Errors
/// `DecodeError::Unrecognized` for the 0 sentinel
pub fn decode(code: u32) -> Result<Reading, DecodeError> {
    if code == 0 {
        return Err(DecodeError::Unrecognized);
    }

    let fields = RawFields::split(code);
    let station = StationCode::from_code(code);

    let reading = if fields.is_motion() {
        Reading::Motion(MotionReading {
            station,
            motion: fields.field_c,
        })
    } else {
        Reading::Environment(EnvironmentReading {
            station,
            temperature_f: f64::from(fields.field_a) / 10.0,
            humidity_pct: f64::from(fields.field_b) / 10.0,
            battery_millivolts: f64::from(fields.field_c) * BATTERY_STEP_MV,
        })
    };

    Ok(reading)
}
