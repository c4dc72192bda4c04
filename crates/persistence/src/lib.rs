//! # Persistence
//!
//! SQLite-backed record of every accepted reading.
//!
//! Two append-only tables:
//!
//! ```sql
//! dht(station INTEGER, temp REAL, humidity REAL, voltage REAL, posted INTEGER)
//! pir(station INTEGER, motion INTEGER, posted INTEGER)
//! ```

use std::path::Path;

use contracts::{PersistedRecord, PersistenceLog, Reading, ReadingKind, StoreError};
use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dht (
    station  INTEGER,
    temp     REAL,
    humidity REAL,
    voltage  REAL,
    posted   INTEGER
);
CREATE TABLE IF NOT EXISTS pir (
    station INTEGER,
    motion  INTEGER,
    posted  INTEGER
);
";

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub dht: u64,
    pub pir: u64,
}

impl RowCounts {
    pub fn total(&self) -> u64 {
        self.dht + self.pir
    }
}

/// A row as stored
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRow {
    Pir {
        station: i64,
        motion: i64,
        posted: i64,
    },
    Dht {
        station: i64,
        temp: f64,
        humidity: f64,
        voltage: f64,
        posted: i64,
    },
}

/// SQLite persistence log
pub struct SqliteLog {
    conn: Connection,
    location: String,
}

impl SqliteLog {
    /// Open (or create) a database file
    #[instrument(name = "sqlite_log_open", fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::init(conn, path.display().to_string())
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::unavailable(format!("cannot open in-memory store: {e}")))?;
        Self::init(conn, ":memory:".to_string())
    }

    fn init(conn: Connection, location: String) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::unavailable(format!("cannot create tables: {e}")))?;
        info!(location = %location, "sqlite store ready");
        Ok(Self { conn, location })
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Number of rows in each table
    pub fn row_counts(&self) -> Result<RowCounts, StoreError> {
        Ok(RowCounts {
            dht: self.count(ReadingKind::Environment)?,
            pir: self.count(ReadingKind::Motion)?,
        })
    }

    /// All rows of one table in insertion order
    pub fn rows(&self, kind: ReadingKind) -> Result<Vec<StoredRow>, StoreError> {
        let table = kind.table();
        let read_err = |e: rusqlite::Error| store_error(table, e);

        let rows = match kind {
            ReadingKind::Motion => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT station, motion, posted FROM pir ORDER BY rowid")
                    .map_err(read_err)?;
                let mapped = stmt
                    .query_map([], |row| {
                        Ok(StoredRow::Pir {
                            station: row.get(0)?,
                            motion: row.get(1)?,
                            posted: row.get(2)?,
                        })
                    })
                    .map_err(read_err)?;
                mapped.collect::<Result<Vec<_>, _>>().map_err(read_err)?
            }
            ReadingKind::Environment => {
                let mut stmt = self
                    .conn
                    .prepare(
                        "SELECT station, temp, humidity, voltage, posted FROM dht ORDER BY rowid",
                    )
                    .map_err(read_err)?;
                let mapped = stmt
                    .query_map([], |row| {
                        Ok(StoredRow::Dht {
                            station: row.get(0)?,
                            temp: row.get(1)?,
                            humidity: row.get(2)?,
                            voltage: row.get(3)?,
                            posted: row.get(4)?,
                        })
                    })
                    .map_err(read_err)?;
                mapped.collect::<Result<Vec<_>, _>>().map_err(read_err)?
            }
        };

        Ok(rows)
    }

    fn count(&self, kind: ReadingKind) -> Result<u64, StoreError> {
        let table = kind.table();
        let sql = match kind {
            ReadingKind::Motion => "SELECT COUNT(*) FROM pir",
            ReadingKind::Environment => "SELECT COUNT(*) FROM dht",
        };
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| store_error(table, e))?;
        Ok(count.max(0) as u64)
    }
}

/// Round to one decimal, matching the precision the readings carry
fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn store_error(table: &'static str, e: rusqlite::Error) -> StoreError {
    StoreError::Write {
        table,
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

impl PersistenceLog for SqliteLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn record(&mut self, record: &PersistedRecord) -> Result<(), StoreError> {
        let posted = record.posted_flag();
        let table = record.reading.kind().table();

        match record.reading {
            Reading::Motion(motion) => self.conn.execute(
                "INSERT INTO pir (station, motion, posted) VALUES (?1, ?2, ?3)",
                params![motion.station.get(), motion.motion, posted],
            ),
            Reading::Environment(env) => self.conn.execute(
                "INSERT INTO dht (station, temp, humidity, voltage, posted) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    env.station.get(),
                    one_decimal(env.temperature_f),
                    one_decimal(env.humidity_pct),
                    one_decimal(env.battery_millivolts),
                    posted
                ],
            ),
        }
        .map_err(|e| store_error(table, e))?;

        debug!(table, posted, "row inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EnvironmentReading, MotionReading, StationCode};

    fn environment() -> Reading {
        Reading::Environment(EnvironmentReading {
            station: StationCode::from_code(0xF000_0000),
            temperature_f: 102.3,
            humidity_pct: 99.9,
            battery_millivolts: 10_050.0,
        })
    }

    fn motion(flag: u8) -> Reading {
        Reading::Motion(MotionReading {
            station: StationCode::from_code(0x2000_0000),
            motion: flag,
        })
    }

    #[test]
    fn environment_record_writes_one_dht_row() {
        let mut log = SqliteLog::open_in_memory().unwrap();
        log.record(&PersistedRecord::new(environment(), true)).unwrap();

        assert_eq!(log.row_counts().unwrap(), RowCounts { dht: 1, pir: 0 });
        assert_eq!(
            log.rows(ReadingKind::Environment).unwrap(),
            vec![StoredRow::Dht {
                station: 15,
                temp: 102.3,
                humidity: 99.9,
                voltage: 10_050.0,
                posted: 1,
            }]
        );
    }

    #[test]
    fn motion_record_keeps_raw_flag() {
        let mut log = SqliteLog::open_in_memory().unwrap();
        log.record(&PersistedRecord::new(motion(0xFE), false)).unwrap();

        assert_eq!(
            log.rows(ReadingKind::Motion).unwrap(),
            vec![StoredRow::Pir {
                station: 2,
                motion: 254,
                posted: 0,
            }]
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.db");

        {
            let mut log = SqliteLog::open(&path).unwrap();
            log.record(&PersistedRecord::new(motion(1), true)).unwrap();
            log.record(&PersistedRecord::new(environment(), false)).unwrap();
        }

        let log = SqliteLog::open(&path).unwrap();
        assert_eq!(log.row_counts().unwrap().total(), 2);
        assert!(log.location().ends_with("sensors.db"));
    }

    #[test]
    fn unopenable_path_is_unavailable() {
        let result = SqliteLog::open(Path::new("/nonexistent-dir/sub/sensors.db"));
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn values_are_rounded_to_one_decimal() {
        assert_eq!(one_decimal(72.449_999), 72.4);
        assert_eq!(one_decimal(3300.0), 3300.0);
    }
}
