//! Pipeline - one code in, at most one persisted row out

use std::future::Future;
use std::time::Instant;

use async_channel::Receiver;
use contracts::{Observation, PersistedRecord, PersistenceLog, RawCode, Reading};
use dispatcher::{Dispatch, SinkDispatcher};
use ingestion::{decode, Deduplicator, RawFields};
use observability::{
    record_code_received, record_code_unrecognized, record_delivery, record_duplicate,
    record_intake_depth, record_persisted, record_store_failure,
};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::stats::PipelineStats;

/// Limits for a pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop after this many accepted readings (None = unlimited)
    pub max_readings: Option<u64>,
}

impl RunLimits {
    fn reached(&self, accepted: u64) -> bool {
        self.max_readings.is_some_and(|max| accepted >= max)
    }
}

/// What happened to one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub observation: Observation,

    /// Per-sink reports and the posted flag
    pub dispatch: Dispatch,

    /// Whether the row reached the store
    pub persisted: bool,
}

/// Terminal state of one cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Sentinel code; nothing downstream ran
    Unrecognized,
    /// Repeat within the dedup window; nothing downstream ran
    Duplicate,
    /// Dispatched and (attempted to be) persisted
    Completed(CycleReport),
}

impl CycleOutcome {
    /// The report of a completed cycle
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// The relay pipeline
///
/// Owns the dedup state, the dispatcher and the store. A single instance is
/// the only writer of all three.
pub struct Pipeline {
    dedup: Deduplicator,
    dispatcher: SinkDispatcher,
    store: Box<dyn PersistenceLog>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        dedup: Deduplicator,
        dispatcher: SinkDispatcher,
        store: Box<dyn PersistenceLog>,
    ) -> Self {
        let stats = PipelineStats {
            active_sinks: dispatcher.sink_names().len(),
            ..Default::default()
        };
        Self {
            dedup,
            dispatcher,
            store,
            stats,
        }
    }

    /// Statistics so far
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn dispatcher(&self) -> &SinkDispatcher {
        &self.dispatcher
    }

    /// Run one cycle for a received code
    ///
    /// Never fails: unrecognized codes, sink failures and store failures are
    /// logged and counted, and the pipeline is ready for the next code.
    #[instrument(
        level = "trace",
        name = "pipeline_process",
        skip(self, raw),
        fields(code = raw.value)
    )]
    pub async fn process(&mut self, raw: RawCode) -> CycleOutcome {
        self.stats.received += 1;
        record_code_received();

        let reading = match decode(raw.value) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.unrecognized += 1;
                record_code_unrecognized();
                warn!(code = raw.value, error = %e, "Unrecognized code");
                return CycleOutcome::Unrecognized;
            }
        };

        if !self.dedup.accept_code(&raw) {
            self.stats.duplicates += 1;
            record_duplicate();
            trace!(code = raw.value, "duplicate discarded");
            return CycleOutcome::Duplicate;
        }
        self.stats.accepted += 1;

        let fields = RawFields::split(raw.value);
        debug!(
            station = fields.station,
            field_a = fields.field_a,
            field_b = fields.field_b,
            field_c = fields.field_c,
            "raw fields"
        );
        log_reading(raw.value, &reading);

        let observation = Observation::new(raw, reading);
        let dispatch = self.dispatcher.dispatch(&observation).await;
        self.account_dispatch(&dispatch);

        let record = PersistedRecord::new(reading, dispatch.posted);
        let persisted = match self.store.record(&record) {
            Ok(()) => {
                record_persisted(reading.kind(), dispatch.posted);
                true
            }
            Err(e) => {
                self.stats.store_failures += 1;
                record_store_failure();
                error!(
                    store = self.store.name(),
                    table = reading.kind().table(),
                    error = %e,
                    "Failed to persist reading"
                );
                false
            }
        };

        CycleOutcome::Completed(CycleReport {
            observation,
            dispatch,
            persisted,
        })
    }

    fn account_dispatch(&mut self, dispatch: &Dispatch) {
        for report in &dispatch.reports {
            record_delivery(&report.outcome, report.elapsed);
            self.stats.deliveries.update(&report.outcome, report.elapsed);
        }
        self.stats.deliveries.finish_dispatch(dispatch.posted);
        if dispatch.posted {
            self.stats.posted += 1;
        }
    }

    /// Drain the intake until it closes or the limit is reached
    pub async fn run(self, rx: Receiver<RawCode>, limits: RunLimits) -> PipelineStats {
        self.run_until(rx, limits, std::future::pending()).await
    }

    /// Like `run`, but also stops when `shutdown` resolves
    ///
    /// Shutdown is only observed between cycles; a cycle in flight completes.
    /// Sink workers are shut down before returning.
    pub async fn run_until<F>(
        mut self,
        rx: Receiver<RawCode>,
        limits: RunLimits,
        shutdown: F,
    ) -> PipelineStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let started = Instant::now();
        info!(max_readings = ?limits.max_readings, sinks = self.stats.active_sinks, "Pipeline running");

        loop {
            let raw = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping intake");
                    break;
                }
                received = rx.recv() => match received {
                    Ok(raw) => raw,
                    Err(_) => {
                        info!("Intake closed");
                        break;
                    }
                },
            };

            record_intake_depth(rx.len());
            self.process(raw).await;

            if limits.reached(self.stats.accepted) {
                info!(readings = self.stats.accepted, "Reached max readings limit");
                break;
            }
        }

        let Self {
            dispatcher,
            mut stats,
            ..
        } = self;
        stats.duration = started.elapsed();
        dispatcher.shutdown().await;

        info!(
            received = stats.received,
            accepted = stats.accepted,
            posted = stats.posted,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline stopped"
        );
        stats
    }
}

fn log_reading(code: u32, reading: &Reading) {
    match reading {
        Reading::Motion(motion) => info!(
            code,
            station = %motion.station,
            motion = motion.motion,
            "Motion reading"
        ),
        Reading::Environment(env) => info!(
            code,
            station = %env.station,
            temperature_f = env.temperature_f,
            humidity_pct = env.humidity_pct,
            battery_mv = env.battery_millivolts,
            "Environment reading"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ContractError, DeliveryReceipt, DeliverySink, StoreError, UnavailableLog,
    };
    use dispatcher::SinkHandle;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const MOTION_15: u32 = 4_026_531_841;
    const ENV_15: u32 = 4_294_961_097;

    /// Sink that succeeds or fails and remembers what it saw
    struct TestSink {
        name: String,
        succeed: bool,
        seen: Arc<Mutex<Vec<u32>>>,
    }

    impl TestSink {
        fn new(name: &str, succeed: bool) -> (Self, Arc<Mutex<Vec<u32>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Self {
                name: name.to_string(),
                succeed,
                seen: Arc::clone(&seen),
            };
            (sink, seen)
        }
    }

    impl DeliverySink for TestSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(
            &mut self,
            observation: &Observation,
        ) -> Result<DeliveryReceipt, ContractError> {
            self.seen.lock().unwrap().push(observation.code);
            if self.succeed {
                Ok(DeliveryReceipt::with_status(200))
            } else {
                Err(ContractError::sink_transport(&self.name, "connection refused"))
            }
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Store that keeps records in memory
    #[derive(Clone, Default)]
    struct MemoryLog(Arc<Mutex<Vec<PersistedRecord>>>);

    impl PersistenceLog for MemoryLog {
        fn name(&self) -> &str {
            "memory"
        }

        fn record(&mut self, record: &PersistedRecord) -> Result<(), StoreError> {
            self.0.lock().unwrap().push(*record);
            Ok(())
        }
    }

    fn handle(sink: TestSink) -> SinkHandle {
        SinkHandle::spawn(sink, 8, Duration::from_millis(500))
    }

    fn pipeline_with(
        sinks: Vec<TestSink>,
        primary: Option<&str>,
    ) -> (Pipeline, Arc<Mutex<Vec<PersistedRecord>>>) {
        let log = MemoryLog::default();
        let rows = Arc::clone(&log.0);
        let dispatcher =
            SinkDispatcher::with_handles(sinks.into_iter().map(handle).collect(), primary);
        let pipeline = Pipeline::new(Deduplicator::default(), dispatcher, Box::new(log));
        (pipeline, rows)
    }

    #[tokio::test]
    async fn test_sentinel_stops_before_dedup() {
        let (sink, seen) = TestSink::new("primary", true);
        let (mut pipeline, rows) = pipeline_with(vec![sink], Some("primary"));

        let outcome = pipeline.process(RawCode::new(0)).await;
        assert!(matches!(outcome, CycleOutcome::Unrecognized));
        assert!(seen.lock().unwrap().is_empty());
        assert!(rows.lock().unwrap().is_empty());
        assert_eq!(pipeline.stats().unrecognized, 1);

        // The sentinel did not arm the dedup window.
        assert!(pipeline.process(RawCode::new(MOTION_15)).await.report().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_writes_no_row() {
        let (sink, seen) = TestSink::new("primary", true);
        let (mut pipeline, rows) = pipeline_with(vec![sink], Some("primary"));
        let t0 = Instant::now();

        let first = pipeline.process(RawCode::at(ENV_15, t0)).await;
        let second = pipeline
            .process(RawCode::at(ENV_15, t0 + Duration::from_secs(10)))
            .await;
        let third = pipeline
            .process(RawCode::at(ENV_15, t0 + Duration::from_secs(31)))
            .await;

        assert!(first.report().is_some());
        assert!(matches!(second, CycleOutcome::Duplicate));
        assert!(third.report().is_some());
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(rows.lock().unwrap().len(), 2);
        assert_eq!(pipeline.stats().duplicates, 1);
    }

    #[tokio::test]
    async fn test_posted_flag_comes_from_primary() {
        let (a, _) = TestSink::new("a", false);
        let (b, _) = TestSink::new("b", true);
        let (c, _) = TestSink::new("c", true);
        let (mut pipeline, rows) = pipeline_with(vec![a, b, c], Some("c"));

        let outcome = pipeline.process(RawCode::new(ENV_15)).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.dispatch.reports.len(), 3);
        assert!(report.dispatch.posted);
        assert!(report.persisted);

        let rows = rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].posted);
        match rows[0].reading {
            Reading::Environment(env) => {
                assert_eq!(env.station.get(), 15);
                assert_eq!(env.temperature_f, 102.3);
                assert_eq!(env.humidity_pct, 99.9);
                assert_eq!(env.battery_millivolts, 10_050.0);
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_primary_stores_unposted_row() {
        let (a, _) = TestSink::new("a", true);
        let (b, _) = TestSink::new("b", true);
        let (c, _) = TestSink::new("c", false);
        let (mut pipeline, rows) = pipeline_with(vec![a, b, c], Some("c"));

        pipeline.process(RawCode::new(MOTION_15)).await;
        assert!(!rows.lock().unwrap()[0].posted);
        assert_eq!(pipeline.stats().posted, 0);

        let summary = pipeline.stats().deliveries.summary();
        assert_eq!(summary.total_dispatches, 1);
        assert_eq!(summary.sinks.len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let (sink, seen) = TestSink::new("primary", true);
        let dispatcher = SinkDispatcher::with_handles(vec![handle(sink)], Some("primary"));
        let mut pipeline = Pipeline::new(
            Deduplicator::default(),
            dispatcher,
            Box::new(UnavailableLog::new("disk gone")),
        );

        let first = pipeline.process(RawCode::new(MOTION_15)).await;
        let second = pipeline.process(RawCode::new(ENV_15)).await;

        assert!(!first.report().unwrap().persisted);
        assert!(second.report().unwrap().dispatch.posted);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(pipeline.stats().store_failures, 2);
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        let (sink, seen) = TestSink::new("primary", true);
        let (pipeline, rows) = pipeline_with(vec![sink], Some("primary"));
        let (tx, rx) = async_channel::bounded(16);

        let t0 = Instant::now();
        for code in [MOTION_15, MOTION_15, 0, ENV_15] {
            tx.send(RawCode::at(code, t0)).await.unwrap();
        }
        drop(tx);

        let stats = pipeline.run(rx, RunLimits::default()).await;
        assert_eq!(stats.received, 4);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.unrecognized, 1);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.posted, 2);
        assert_eq!(*seen.lock().unwrap(), vec![MOTION_15, ENV_15]);
        assert_eq!(rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_at_max_readings() {
        let (sink, _) = TestSink::new("primary", true);
        let (pipeline, rows) = pipeline_with(vec![sink], Some("primary"));
        let (tx, rx) = async_channel::bounded(16);

        for station in 1..=5u32 {
            tx.send(RawCode::new((station << 28) | 1)).await.unwrap();
        }

        let limits = RunLimits {
            max_readings: Some(3),
        };
        let stats = pipeline.run(rx, limits).await;
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.received, 3);
        assert_eq!(rows.lock().unwrap().len(), 3);
        drop(tx);
    }

    #[tokio::test]
    async fn test_run_until_honours_shutdown() {
        let (pipeline, _) = pipeline_with(Vec::new(), None);
        let (_tx, rx) = async_channel::bounded::<RawCode>(4);

        let stats = tokio::time::timeout(
            Duration::from_secs(2),
            pipeline.run_until(rx, RunLimits::default(), async {}),
        )
        .await
        .expect("shutdown future should stop the run");
        assert_eq!(stats.received, 0);
    }

    #[tokio::test]
    async fn test_sqlite_store_gets_one_row_per_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");

        let (sink, _) = TestSink::new("primary", true);
        let dispatcher = SinkDispatcher::with_handles(vec![handle(sink)], Some("primary"));
        let store = persistence::SqliteLog::open(&path).unwrap();
        let mut pipeline = Pipeline::new(Deduplicator::default(), dispatcher, Box::new(store));

        pipeline.process(RawCode::new(ENV_15)).await;
        pipeline.process(RawCode::new(ENV_15)).await;
        pipeline.process(RawCode::new(MOTION_15)).await;
        drop(pipeline);

        let store = persistence::SqliteLog::open(&path).unwrap();
        let counts = store.row_counts().unwrap();
        assert_eq!((counts.dht, counts.pir), (1, 1));
    }
}
