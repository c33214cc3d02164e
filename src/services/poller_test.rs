use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn config(interval_ms: u64, max_ms: u64) -> PollConfig {
    PollConfig::new(Duration::from_millis(interval_ms), Duration::from_millis(max_ms))
}

fn counting_poller(counter: &Arc<AtomicUsize>, cfg: PollConfig) -> PollHandle {
    let counter = Arc::clone(counter);
    spawn_poll("test", cfg, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        }
    })
}

// =============================================================================
// next_delay
// =============================================================================

#[test]
fn next_delay_without_failures_is_interval() {
    assert_eq!(next_delay(config(10_000, 300_000), 0), Duration::from_secs(10));
}

#[test]
fn next_delay_doubles_per_failure() {
    let cfg = config(10_000, 300_000);
    assert_eq!(next_delay(cfg, 1), Duration::from_secs(20));
    assert_eq!(next_delay(cfg, 2), Duration::from_secs(40));
    assert_eq!(next_delay(cfg, 3), Duration::from_secs(80));
}

#[test]
fn next_delay_is_capped() {
    let cfg = config(10_000, 300_000);
    assert_eq!(next_delay(cfg, 5), Duration::from_secs(300));
    assert_eq!(next_delay(cfg, 40), Duration::from_secs(300));
}

#[test]
fn next_delay_cap_never_below_interval() {
    let cfg = config(60_000, 1_000);
    assert_eq!(next_delay(cfg, 3), Duration::from_secs(60));
}

// =============================================================================
// spawn_poll
// =============================================================================

#[tokio::test]
async fn poller_ticks_immediately_and_repeats() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = counting_poller(&counter, config(10, 1_000));
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(counter.load(Ordering::SeqCst) >= 2);
    handle.stop();
}

#[tokio::test]
async fn stop_ends_the_task() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = counting_poller(&counter, config(10, 1_000));
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.stop();
    handle.stop();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(handle.is_finished());

    let seen = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), seen);
}

#[tokio::test]
async fn dropping_the_handle_stops_polling() {
    let counter = Arc::new(AtomicUsize::new(0));
    drop(counting_poller(&counter, config(10, 1_000)));
    tokio::time::sleep(Duration::from_millis(30)).await;
    let seen = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), seen);
    assert!(seen <= 1);
}

#[tokio::test]
async fn failing_ticks_back_off() {
    let counter = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::clone(&counter);
    let handle = spawn_poll("failing", config(20, 10_000), move || {
        let ticks = Arc::clone(&ticks);
        async move {
            ticks.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("store unavailable")
        }
    });
    // Ticks at 0, 40, 120 ms, then 280 ms: at most three within 200 ms.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let seen = counter.load(Ordering::SeqCst);
    assert!((2..=3).contains(&seen), "unexpected tick count {seen}");
    handle.stop();
}
