//! Integration tests for radoneye-core
//!
//! These run against [`MockLink`] and need no hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use radoneye_core::{
    DeviceRegistration, DeviceType, DualReading, MockLink, PollConfig, PollScheduler, Registry,
    Unit, WINDOW_CAPACITY, WindowStore,
};
use tokio::sync::watch;

const LIVING: &str = "C4:7C:8D:00:00:01";
const BASEMENT: &str = "C4:7C:8D:00:00:02";

fn registry() -> Arc<Registry> {
    Arc::new(
        Registry::new(vec![
            DeviceRegistration::new(LIVING, "Living room", DeviceType::Rd200V2),
            DeviceRegistration::new(BASEMENT, "Basement", DeviceType::Rd200),
        ])
        .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_windows_fill_over_many_rounds() {
    let registry = registry();
    let windows = Arc::new(WindowStore::new(&registry));
    let link = Arc::new(MockLink::new());
    for i in 1..=12 {
        link.push_reading(LIVING, DualReading::from_becquerel(f64::from(i) * 10.0));
    }
    link.set_default(Some(DualReading::from_becquerel(50.0)));

    let scheduler = PollScheduler::new(
        Arc::clone(&registry),
        Arc::clone(&windows),
        Arc::clone(&link),
        PollConfig::default().unit(Unit::Becquerel),
    );
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = scheduler.spawn(stop_rx);

    // Rounds at t = 0, 60, ..., 660: twelve rounds.
    tokio::time::sleep(Duration::from_secs(11 * 60 + 30)).await;
    stop_tx.send(true).unwrap();
    handle.await.unwrap();

    let expected: Vec<f64> = (3..=12).map(|i| f64::from(i) * 10.0).collect();
    assert_eq!(windows.values(LIVING).unwrap(), expected);
    assert_eq!(windows.current(LIVING).unwrap(), 120.0);
    assert_eq!(windows.previous(LIVING).unwrap(), 110.0);
    assert_eq!(windows.average(LIVING).unwrap(), 75.0);
    assert_eq!(windows.len(BASEMENT).unwrap(), WINDOW_CAPACITY);
}

#[tokio::test(start_paused = true)]
async fn test_offline_device_does_not_block_others() {
    let registry = registry();
    let windows = Arc::new(WindowStore::new(&registry));
    let link = Arc::new(MockLink::new());
    link.fail_times(LIVING, 6);
    link.push_reading(BASEMENT, DualReading::from_becquerel(37.0));
    link.push_reading(BASEMENT, DualReading::from_becquerel(74.0));

    let scheduler = PollScheduler::new(
        Arc::clone(&registry),
        Arc::clone(&windows),
        Arc::clone(&link),
        PollConfig::default(),
    );
    let stats = scheduler.stats();
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = scheduler.spawn(stop_rx);

    tokio::time::sleep(Duration::from_secs(90)).await;
    stop_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(link.calls(LIVING), 6);
    assert_eq!(windows.len(LIVING).unwrap(), 0);
    assert_eq!(windows.values(BASEMENT).unwrap(), vec![1.0, 2.0]);

    let stats = stats.snapshot();
    assert_eq!(stats[0].failure_count, 6);
    assert_eq!(stats[0].exhausted_count, 2);
    assert_eq!(stats[0].success_count, 0);
    assert_eq!(stats[1].success_count, 2);
    assert!(stats[1].last_error.is_none());
}

#[test]
fn test_concurrent_readers_never_see_torn_state() {
    let registry = registry();
    let windows = Arc::new(WindowStore::new(&registry));
    let done = Arc::new(AtomicBool::new(false));

    // Every committed value is an integer in 1..=1000.
    let writer = {
        let windows = Arc::clone(&windows);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            for i in 1..=1000 {
                windows.append(LIVING, f64::from(i)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let windows = Arc::clone(&windows);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let summary = windows.summary(LIVING).unwrap();
                    assert!(summary.samples <= WINDOW_CAPACITY);
                    assert_eq!(summary.current.fract(), 0.0);
                    assert!((0.0..=1000.0).contains(&summary.current));
                    if summary.samples >= 2 {
                        assert_eq!(summary.previous, summary.current - 1.0);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(windows.current(LIVING).unwrap(), 1000.0);
    assert_eq!(windows.len(LIVING).unwrap(), WINDOW_CAPACITY);
}
