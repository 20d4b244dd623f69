use routewatch::collectors::{MonitorError, MonitoringScheduler};
use routewatch::inventory::Inventory;
use routewatch::models::DeviceDescriptor;
use routewatch::snmp::memory::{MemoryAgent, MemoryNetwork};
use routewatch::snmp::{Value, mib};
use routewatch::storage::{JsonFileStore, TelemetryStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Integration tests for the monitoring scheduler
/// Time is paused, so interval/duration arithmetic runs on tokio's virtual clock

struct Fixture {
    scheduler: MonitoringScheduler,
    agent: Arc<MemoryAgent>,
    store: Arc<JsonFileStore>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let inventory = Arc::new(Inventory::new(vec![DeviceDescriptor::new("10.0.0.1", "R1")]));
    let network = MemoryNetwork::new();
    let agent = network.add(
        "10.0.0.1",
        MemoryAgent::new("R1")
            .with(
                mib::instance(mib::IF_NAME, 3),
                Value::OctetString("Gi0/1".into()),
            )
            .with(mib::instance(mib::IF_IN_OCTETS, 3), Value::Counter32(1_000)),
    );
    let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let scheduler = MonitoringScheduler::new(inventory, Arc::new(network), store.clone());
    Fixture {
        scheduler,
        agent,
        store,
        _dir: dir,
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_runs_for_duration_then_deregisters() {
    let f = fixture();
    f.scheduler.start("10.0.0.1", "Gi0/1", 1, 3).await.unwrap();
    assert_eq!(f.scheduler.active_sessions().len(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;

    let samples = f.scheduler.read("10.0.0.1", "Gi0/1").unwrap();
    assert!(
        (2..=4).contains(&samples.len()),
        "expected 2-4 samples, got {}",
        samples.len()
    );
    assert!(samples.iter().all(|s| s.value == 1_000));
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(f.scheduler.active_sessions().is_empty());

    // Identity is free again
    f.scheduler.start("10.0.0.1", "Gi0/1", 1, 3).await.unwrap();
    f.scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_conflicting_start_leaves_series_untouched() {
    let f = fixture();
    f.scheduler.start("R1", "Gi0/1", 10, 60).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let before = f.scheduler.read("R1", "Gi0/1").unwrap();

    let err = f.scheduler.start("10.0.0.1", "Gi0/1", 1, 5).await.unwrap_err();
    assert!(matches!(err, MonitorError::AlreadyActive(_)));

    let after = f.scheduler.read("R1", "Gi0/1").unwrap();
    assert_eq!(before, after);
    let active = f.scheduler.active_sessions();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].interval_secs, 10);

    f.scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_polling() {
    let f = fixture();
    f.scheduler.start("10.0.0.1", "Gi0/1", 1, 60).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let stopped = f.scheduler.stop("10.0.0.1", "Gi0/1").unwrap();
    assert_eq!(stopped.duration_secs, 60);
    assert!(matches!(
        f.scheduler.stop("10.0.0.1", "Gi0/1"),
        Err(MonitorError::NotActive(_))
    ));

    let count = f.scheduler.read("10.0.0.1", "Gi0/1").unwrap().len();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(f.scheduler.read("10.0.0.1", "Gi0/1").unwrap().len(), count);
}

#[tokio::test(start_paused = true)]
async fn test_absent_counter_skips_ticks() {
    let f = fixture();
    f.agent.remove(&mib::instance(mib::IF_IN_OCTETS, 3));

    f.scheduler.start("10.0.0.1", "Gi0/1", 1, 3).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(matches!(
        f.scheduler.read("10.0.0.1", "Gi0/1"),
        Err(MonitorError::NoData(_))
    ));
    assert!(f.scheduler.active_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_samples_persisted_under_inventory_address() {
    let f = fixture();
    f.scheduler.start("R1", "Gi0/1", 1, 2).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let key = routewatch::models::SeriesKey::new("10.0.0.1", "Gi0/1");
    assert!(f.store.samples_path(&key).ends_with("10_0_0_1_Gi0_1.json"));
    assert!(f.store.read_samples(&key).unwrap().is_some());
}
