//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! - Contract snapshots (decode examples, wire formats)
//! - Source -> intake -> pipeline -> sinks -> SQLite runs against local HTTP mocks

#[cfg(test)]
mod contract_tests {
    use contracts::{ReadingKind, RawCode};
    use ingestion::{decode, RawFields};

    #[test]
    fn test_environment_example() {
        let code = 4_294_961_097;
        let fields = RawFields::split(code);
        assert_eq!(
            (fields.station, fields.field_a, fields.field_b, fields.field_c),
            (15, 1023, 999, 201)
        );

        match decode(code).unwrap() {
            contracts::Reading::Environment(env) => {
                assert_eq!(env.station.get(), 15);
                assert_eq!(env.temperature_f, 102.3);
                assert_eq!(env.humidity_pct, 99.9);
                assert_eq!(env.battery_millivolts, 10_050.0);
            }
            other => panic!("expected environment reading, got {other:?}"),
        }
    }

    #[test]
    fn test_motion_example() {
        let reading = decode(4_026_531_841).unwrap();
        assert_eq!(reading.kind(), ReadingKind::Motion);
        assert_eq!(reading.station().get(), 15);
    }

    #[test]
    fn test_sentinel_is_unrecognized() {
        assert!(RawCode::new(0).is_sentinel());
        assert!(decode(0).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ReadingKind, SinkConfig, SinkType};
    use dispatcher::{create_dispatcher, SinkDispatcher};
    use ingestion::{Deduplicator, IntakeChannel, ReplayConfig, ReplaySource, ScriptedSource};
    use persistence::{SqliteLog, StoredRow};
    use pipeline::{Pipeline, RunLimits};
    use wiremock::matchers::{method, path, query_param};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOTION_15: u32 = 4_026_531_841;
    const ENV_15: u32 = 4_294_961_097;

    fn telemetry_sink(name: &str, base_url: &str, primary: bool) -> SinkConfig {
        let params: HashMap<String, String> = [
            ("base_url", base_url),
            ("public_key_motion", "PUBM"),
            ("private_key_motion", "PRIVM"),
            ("public_key_environment", "PUBE"),
            ("private_key_environment", "PRIVE"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Telemetry,
            primary,
            queue_capacity: 8,
            timeout_ms: 2000,
            params,
        }
    }

    fn log_sink(name: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Log,
            primary: false,
            queue_capacity: 8,
            timeout_ms: 1000,
            params: HashMap::new(),
        }
    }

    fn mqtt_sink(name: &str, port: u16, primary: bool) -> SinkConfig {
        let params: HashMap<String, String> = [
            ("host".to_string(), "127.0.0.1".to_string()),
            ("port".to_string(), port.to_string()),
            ("reconnect_delay_secs".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();

        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Mqtt,
            primary,
            queue_capacity: 8,
            timeout_ms: 1000,
            params,
        }
    }

    /// Minimal broker: acknowledges one connection and reads until it closes
    async fn serve_one_client(listener: TcpListener) {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 1024];
        if stream.read(&mut buf).await.unwrap_or(0) == 0 {
            return;
        }
        if stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.is_err() {
            return;
        }
        while stream.read(&mut buf).await.unwrap_or(0) > 0 {}
    }

    async fn run_codes(
        sinks: &[SinkConfig],
        codes: Vec<u32>,
        db: &Path,
    ) -> pipeline::PipelineStats {
        let dispatcher = create_dispatcher(sinks).await.unwrap();
        run_with_dispatcher(dispatcher, codes, db).await
    }

    async fn run_with_dispatcher(
        dispatcher: SinkDispatcher,
        codes: Vec<u32>,
        db: &Path,
    ) -> pipeline::PipelineStats {
        let store = SqliteLog::open(db).unwrap();
        let pipeline = Pipeline::new(Deduplicator::default(), dispatcher, Box::new(store));

        let mut intake = IntakeChannel::new(32);
        intake.register_source(Box::new(ScriptedSource::immediate("scripted", codes)));
        intake.start_all();
        let rx = intake.take_receiver().unwrap();

        let stats = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline.run(rx, RunLimits::default()),
        )
        .await
        .expect("pipeline should finish when the source ends");
        intake.stop_all();
        stats
    }

    /// Scripted codes -> telemetry primary + log sink -> SQLite
    #[tokio::test]
    async fn test_e2e_posted_rows_follow_primary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/input/PUBM"))
            .and(query_param("private_key", "PRIVM"))
            .and(query_param("station", "15"))
            .and(query_param("motion", "1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/input/PUBE"))
            .and(query_param("humidity", "99.9"))
            .and(query_param("temp", "102.3"))
            .and(query_param("voltage", "10050.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relay.db");
        let sinks = vec![log_sink("console"), telemetry_sink("cloud", &server.uri(), true)];

        // Burst repeats and a sentinel between the two readings.
        let codes = vec![MOTION_15, MOTION_15, MOTION_15, 0, ENV_15, ENV_15];
        let stats = run_codes(&sinks, codes, &db).await;

        assert_eq!(stats.received, 6);
        assert_eq!(stats.unrecognized, 1);
        assert_eq!(stats.duplicates, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.posted, 2);

        let store = SqliteLog::open(&db).unwrap();
        assert_eq!(
            store.rows(ReadingKind::Motion).unwrap(),
            vec![StoredRow::Pir {
                station: 15,
                motion: 1,
                posted: 1
            }]
        );
        assert_eq!(
            store.rows(ReadingKind::Environment).unwrap(),
            vec![StoredRow::Dht {
                station: 15,
                temp: 102.3,
                humidity: 99.9,
                voltage: 10_050.0,
                posted: 1
            }]
        );
        server.verify().await;
    }

    /// A failing primary marks rows unposted while other sinks still succeed
    #[tokio::test]
    async fn test_e2e_primary_failure_is_isolated() {
        let primary = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;
        let secondary = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&secondary)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relay.db");
        let sinks = vec![
            telemetry_sink("backup", &secondary.uri(), false),
            telemetry_sink("cloud", &primary.uri(), true),
        ];

        let stats = run_codes(&sinks, vec![MOTION_15, ENV_15], &db).await;
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.posted, 0);

        let summary = stats.deliveries.summary();
        let backup = summary.sinks.iter().find(|s| s.name == "backup").unwrap();
        let cloud = summary.sinks.iter().find(|s| s.name == "cloud").unwrap();
        assert_eq!((backup.successes, backup.failures), (2, 0));
        assert_eq!((cloud.successes, cloud.failures), (0, 2));

        let store = SqliteLog::open(&db).unwrap();
        let rows = store.rows(ReadingKind::Motion).unwrap();
        assert!(matches!(rows[0], StoredRow::Pir { posted: 0, .. }));
        secondary.verify().await;
    }

    /// Replay file -> pipeline with sinks built from a TOML blueprint
    #[tokio::test]
    async fn test_e2e_replay_with_loaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("codes.txt");
        std::fs::write(
            &replay,
            "# recorded burst\n4026531841\n+5 4026531841\n\n+5 4294961097\n",
        )
        .unwrap();
        let db = dir.path().join("relay.db");

        let toml = format!(
            r#"
[receiver]
source = "replay"
path = "{}"
speed = 10.0

[dedup]
window_secs = 30.0

[[sinks]]
name = "console"
sink_type = "log"
primary = true

[store]
path = "{}"
"#,
            replay.display(),
            db.display()
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let source = ReplaySource::load(
            blueprint.receiver.path.as_deref().unwrap(),
            ReplayConfig {
                speed_multiplier: blueprint.receiver.speed,
            },
        )
        .unwrap();
        assert_eq!(source.len(), 3);

        let dispatcher = create_dispatcher(&blueprint.sinks).await.unwrap();
        let store = SqliteLog::open(&blueprint.store.path).unwrap();
        let pipeline = Pipeline::new(
            Deduplicator::new(&blueprint.dedup),
            dispatcher,
            Box::new(store),
        );

        let mut intake = IntakeChannel::new(8);
        intake.register_source(Box::new(source));
        intake.start_all();
        let stats = pipeline
            .run(intake.take_receiver().unwrap(), RunLimits::default())
            .await;

        assert_eq!(stats.received, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.posted, 2);

        let counts = SqliteLog::open(&db).unwrap().row_counts().unwrap();
        assert_eq!(counts.total(), 2);
    }

    /// Every sink type in one blueprint builds a dispatcher
    #[tokio::test]
    async fn test_blueprint_with_every_sink_type() {
        let json = r#"{
            "sinks": [
                { "name": "console", "sink_type": "log" },
                { "name": "telemetry", "sink_type": "telemetry", "primary": true,
                  "params": { "base_url": "http://127.0.0.1:9",
                              "public_key_motion": "a", "private_key_motion": "b",
                              "public_key_environment": "c", "private_key_environment": "d" } },
                { "name": "things", "sink_type": "named_thing",
                  "params": { "base_url": "http://127.0.0.1:9/things/",
                              "thing_motion": "pir", "thing_environment": "dht" } },
                { "name": "fields", "sink_type": "indexed_field",
                  "params": { "base_url": "http://127.0.0.1:9",
                              "api_key_motion": "k1", "api_key_environment": "k2" } },
                { "name": "broker", "sink_type": "mqtt",
                  "params": { "host": "127.0.0.1", "port": "1" } }
            ]
        }"#;
        let blueprint = ConfigLoader::load_from_str(json, ConfigFormat::Json).unwrap();
        assert_eq!(blueprint.primary_sink().unwrap().name, "telemetry");

        let dispatcher = create_dispatcher(&blueprint.sinks).await.unwrap();
        assert_eq!(
            dispatcher.sink_names(),
            vec!["console", "telemetry", "things", "fields", "broker"]
        );
        dispatcher.shutdown().await;
    }

    /// An unopenable store never stops delivery
    #[tokio::test]
    async fn test_unavailable_store_keeps_relaying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let store_err = SqliteLog::open(Path::new("/nonexistent-dir/relay.db"))
            .err()
            .expect("store should not open");
        let dispatcher = create_dispatcher(&[telemetry_sink("cloud", &server.uri(), true)])
            .await
            .unwrap();
        let mut pipeline = Pipeline::new(
            Deduplicator::default(),
            dispatcher,
            Box::new(contracts::UnavailableLog::new(store_err.to_string())),
        );

        for code in [MOTION_15, ENV_15] {
            let outcome = pipeline.process(contracts::RawCode::new(code)).await;
            let report = outcome.report().unwrap();
            assert!(report.dispatch.posted);
            assert!(!report.persisted);
        }
        assert_eq!(pipeline.stats().store_failures, 2);
        server.verify().await;
    }

    /// An unreachable broker as primary leaves every row unposted
    #[tokio::test]
    async fn test_e2e_unreachable_broker_primary_stores_unposted() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relay.db");
        let sinks = vec![log_sink("console"), mqtt_sink("broker", 1, true)];

        let stats = run_codes(&sinks, vec![MOTION_15, ENV_15], &db).await;

        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.posted, 0);

        let store = SqliteLog::open(&db).unwrap();
        assert_eq!(
            store.rows(ReadingKind::Motion).unwrap(),
            vec![StoredRow::Pir {
                station: 15,
                motion: 1,
                posted: 0
            }]
        );
        assert!(matches!(
            store.rows(ReadingKind::Environment).unwrap().as_slice(),
            [StoredRow::Dht { posted: 0, .. }]
        ));
    }

    /// A connected broker as primary marks rows posted
    #[tokio::test]
    async fn test_e2e_connected_broker_primary_stores_posted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let broker = tokio::spawn(serve_one_client(listener));

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relay.db");
        let dispatcher = create_dispatcher(&[mqtt_sink("broker", port, true)])
            .await
            .unwrap();
        // Let the client finish its handshake before the first reading.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let stats = run_with_dispatcher(dispatcher, vec![MOTION_15], &db).await;

        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.posted, 1);
        let store = SqliteLog::open(&db).unwrap();
        assert_eq!(
            store.rows(ReadingKind::Motion).unwrap(),
            vec![StoredRow::Pir {
                station: 15,
                motion: 1,
                posted: 1
            }]
        );
        broker.abort();
    }
}
