//! End-to-end sidecar runtime: source → user code → sink fan-out, with
//! counters reported into the step status.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use streamgrid_metrics::Registry;
use streamgrid_scheduler::{LocalScheduler, SchedulerClient};
use streamgrid_sidecar::{Sidecar, SidecarConfig, SidecarOptions, UserProcessor};
use streamgrid_types::{
    HttpConfig, KafkaConfig, LogConfig, ObjectMeta, Sink, Source, Step, StepKey, StepSpec,
};

struct EchoProcessor;

#[async_trait]
impl UserProcessor for EchoProcessor {
    async fn process(&self, msg: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(Some(msg.to_ascii_uppercase()))
    }
}

struct FailingProcessor;

#[async_trait]
impl UserProcessor for FailingProcessor {
    async fn process(&self, _msg: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        anyhow::bail!("user code exploded")
    }
}

fn test_spec() -> StepSpec {
    StepSpec {
        name: "map".to_string(),
        sources: vec![Source {
            name: "in".to_string(),
            http: Some(HttpConfig::default()),
            ..Default::default()
        }],
        sinks: vec![Sink {
            name: "out".to_string(),
            log: Some(LogConfig::default()),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn test_config(spec: StepSpec) -> SidecarConfig {
    SidecarConfig {
        namespace: "default".to_string(),
        pipeline_name: "pl".to_string(),
        replica: 0,
        spec,
    }
}

fn apply_step(scheduler: &LocalScheduler) -> StepKey {
    let step = Step {
        metadata: ObjectMeta {
            namespace: "default".to_string(),
            name: "map".to_string(),
            ..Default::default()
        },
        spec: test_spec(),
        status: None,
    };
    scheduler.apply_step(step).unwrap().key()
}

#[tokio::test]
async fn messages_flow_from_source_through_user_code_to_sinks() {
    let scheduler = Arc::new(LocalScheduler::open_in_memory().unwrap());
    let key = apply_step(&scheduler);
    let registry = Registry::new();

    let sidecar = Sidecar::start(
        test_config(test_spec()),
        registry.clone(),
        Arc::new(EchoProcessor),
        Some(scheduler.clone() as Arc<dyn SchedulerClient>),
        SidecarOptions {
            report_interval: Duration::from_millis(20),
            drain_timeout: Duration::from_secs(5),
        },
    )
    .await
    .unwrap();

    let senders = sidecar.http_senders();
    let tx = senders.get("in").unwrap();
    for i in 0..3 {
        tx.send(format!("msg-{i}").into_bytes()).await.unwrap();
    }

    let sinks_total = registry.counter_vec("sinks_total", "", &["sinkName", "replica"]);
    while sinks_total.with_label_values(&["out", "0"]).get() < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let failures = sidecar.shutdown().await;
    assert!(failures.is_empty());

    let sources_total = registry.counter_vec("sources_total", "", &["sourceName", "replica"]);
    assert_eq!(sources_total.with_label_values(&["in", "0"]).get(), 3);
    assert_eq!(sinks_total.with_label_values(&["out", "0"]).get(), 3);

    // The final flush patched the sidecar-owned counter maps.
    let stored = scheduler.get_step(&key).await.unwrap().unwrap();
    let status = stored.status.unwrap();
    assert_eq!(status.source_statuses.get("in", 0).total, 3);
    assert_eq!(status.sink_statuses.get("out", 0).total, 3);
    assert_eq!(status.source_statuses.get("in", 0).errors, 0);
}

#[tokio::test]
async fn duplicate_sink_names_fail_startup() {
    let mut spec = test_spec();
    spec.sinks = vec![
        Sink {
            name: "a".to_string(),
            kafka: Some(KafkaConfig {
                brokers: vec!["localhost:9092".to_string()],
                topic: "t".to_string(),
                group_id: None,
            }),
            ..Default::default()
        },
        Sink {
            name: "a".to_string(),
            log: Some(LogConfig::default()),
            ..Default::default()
        },
    ];

    let err = Sidecar::start(
        test_config(spec),
        Registry::new(),
        Arc::new(EchoProcessor),
        None,
        SidecarOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("duplicate sink named \"a\""));
}

#[tokio::test]
async fn user_code_failures_count_against_the_source() {
    let registry = Registry::new();
    let sidecar = Sidecar::start(
        test_config(test_spec()),
        registry.clone(),
        Arc::new(FailingProcessor),
        None,
        SidecarOptions::default(),
    )
    .await
    .unwrap();

    let senders = sidecar.http_senders();
    senders
        .get("in")
        .unwrap()
        .send(b"doomed".to_vec())
        .await
        .unwrap();

    let sources_total = registry.counter_vec("sources_total", "", &["sourceName", "replica"]);
    while sources_total.with_label_values(&["in", "0"]).get() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Give the error accounting a moment to land, then check counters.
    let status = sidecar.status();
    loop {
        let (sources, sinks) = status.snapshot();
        if sources.get("in", 0).errors == 1 {
            // The sink was never reached.
            assert_eq!(sinks.get("out", 0).total, 0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    sidecar.shutdown().await;
}
