//! Trigger Provider Integration Tests
//!
//! Drives the provider with a virtual scheduler and checks pulse counts:
//! - Every frequency alone
//! - Several subscribers sharing one frequency
//! - Pairs of frequencies running side by side
//! - Unsubscribe, scheduler shutdown and channel consumers

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use triggers::{
    Frequency, Pulse, SchedulerError, SubscriptionState, TokioScheduler, Trigger, TriggerConfig,
    TriggerError, TriggerProvider, VirtualScheduler,
};

fn setup() -> (VirtualScheduler, TriggerProvider) {
    let _ = env_logger::try_init();
    let scheduler = VirtualScheduler::new();
    let provider = TriggerProvider::new(Arc::new(scheduler.clone()));
    (scheduler, provider)
}

fn counter() -> (Arc<AtomicU64>, impl FnMut(Pulse) + Send + 'static) {
    let count = Arc::new(AtomicU64::new(0));
    let inner = count.clone();
    (count, move |_| {
        inner.fetch_add(1, Ordering::SeqCst);
    })
}

fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// (frequency, seconds to advance, expected pulses)
const SINGLE_CASES: [(Frequency, u64, u64); 12] = [
    (Frequency::At50Hz, 1, 50),
    (Frequency::At25Hz, 1, 25),
    (Frequency::At10Hz, 1, 10),
    (Frequency::At5Hz, 1, 5),
    (Frequency::At2Hz, 1, 2),
    (Frequency::EverySecond, 10, 10),
    (Frequency::Every5Seconds, 30, 6),
    (Frequency::Every10Seconds, 60, 6),
    (Frequency::Every30Seconds, 60, 2),
    (Frequency::EveryMinute, 600, 10),
    (Frequency::Every5Minutes, 3600, 12),
    (Frequency::Every10Minutes, 3600, 6),
];

#[test]
fn test_emits_at_requested_frequency() {
    for (frequency, secs, expected) in SINGLE_CASES {
        let (scheduler, provider) = setup();
        let (count, on_pulse) = counter();
        let _subscription = provider
            .on_frequency(frequency)
            .unwrap()
            .subscribe(on_pulse)
            .unwrap();

        scheduler.advance_to(seconds(secs));

        assert_eq!(count.load(Ordering::SeqCst), expected, "{}", frequency);
    }
}

#[test]
fn test_never_emits() {
    let (scheduler, provider) = setup();
    let (count, on_pulse) = counter();
    let subscription = provider
        .on_frequency(Frequency::Never)
        .unwrap()
        .subscribe(on_pulse)
        .unwrap();

    scheduler.advance_to(seconds(3600));

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(subscription.state(), SubscriptionState::Silent);
    assert_eq!(scheduler.pending_timers(), 0);

    subscription.unsubscribe();
}

#[test]
fn test_emits_at_requested_frequency_when_shared() {
    for (frequency, secs, expected) in SINGLE_CASES {
        let (scheduler, provider) = setup();

        let (first, on_first) = counter();
        let _first = provider
            .on_frequency(frequency)
            .unwrap()
            .subscribe(on_first)
            .unwrap();

        let (second, on_second) = counter();
        let _second = provider
            .on_frequency(frequency)
            .unwrap()
            .subscribe(on_second)
            .unwrap();

        // Step one base tick at a time: the counts must agree at every instant
        let base = provider.base_interval();
        let mut now = Duration::ZERO;
        while now < seconds(secs) {
            now += base;
            scheduler.advance_to(now);
            assert_eq!(
                first.load(Ordering::SeqCst),
                second.load(Ordering::SeqCst),
                "{} at {:?}",
                frequency,
                now
            );
        }

        assert_eq!(first.load(Ordering::SeqCst), expected, "{}", frequency);
        assert_eq!(second.load(Ordering::SeqCst), expected, "{}", frequency);
        assert_eq!(provider.recipes_built(), 1);
    }
}

#[test]
fn test_emits_at_multiple_requested_frequencies() {
    // (first, first expected, second, second expected, seconds)
    let cases = [
        (Frequency::At50Hz, 50, Frequency::At25Hz, 25, 1),
        (Frequency::At50Hz, 50, Frequency::At10Hz, 10, 1),
        (Frequency::At50Hz, 50, Frequency::At5Hz, 5, 1),
        (Frequency::At50Hz, 50, Frequency::At2Hz, 2, 1),
        (Frequency::At50Hz, 500, Frequency::EverySecond, 10, 10),
        (Frequency::EverySecond, 60, Frequency::Every5Seconds, 12, 60),
        (Frequency::EverySecond, 60, Frequency::Every10Seconds, 6, 60),
        (Frequency::EverySecond, 60, Frequency::Every30Seconds, 2, 60),
        (Frequency::EveryMinute, 60, Frequency::Every5Minutes, 12, 3600),
        (Frequency::EveryMinute, 60, Frequency::Every10Minutes, 6, 3600),
    ];

    for (first_frequency, first_expected, second_frequency, second_expected, secs) in cases {
        let (scheduler, provider) = setup();

        let (first, on_first) = counter();
        let _first = provider
            .on_frequency(first_frequency)
            .unwrap()
            .subscribe(on_first)
            .unwrap();

        let (second, on_second) = counter();
        let _second = provider
            .on_frequency(second_frequency)
            .unwrap()
            .subscribe(on_second)
            .unwrap();

        scheduler.advance_to(seconds(secs));

        assert_eq!(first.load(Ordering::SeqCst), first_expected);
        assert_eq!(second.load(Ordering::SeqCst), second_expected);
    }
}

#[test]
fn test_k_periods_yield_k_pulses() {
    for frequency in Frequency::ALL.into_iter().filter(|f| !f.is_never()) {
        let (scheduler, provider) = setup();
        let period = frequency.period().unwrap();
        let base = provider.base_interval();

        let (count, on_pulse) = counter();
        let _subscription = provider
            .on_frequency(frequency)
            .unwrap()
            .subscribe(on_pulse)
            .unwrap();

        for k in 1..=4u32 {
            // One base tick short of the k-th pulse
            scheduler.advance_to(period * k - base);
            assert_eq!(count.load(Ordering::SeqCst), u64::from(k - 1), "{}", frequency);

            scheduler.advance_to(period * k);
            assert_eq!(count.load(Ordering::SeqCst), u64::from(k), "{}", frequency);
        }
    }
}

#[test]
fn test_counting_starts_at_subscription() {
    let (scheduler, provider) = setup();
    scheduler.advance_to(Duration::from_millis(10));

    let subscription = provider
        .on_frequency(Frequency::At10Hz)
        .unwrap()
        .subscribe(|_| {})
        .unwrap();

    scheduler.advance_to(Duration::from_millis(109));
    assert_eq!(subscription.pulses(), 0);

    scheduler.advance_to(Duration::from_millis(110));
    assert_eq!(subscription.pulses(), 1);
}

#[test]
fn test_late_subscriber_keeps_its_own_window() {
    let (scheduler, provider) = setup();
    let trigger = provider.on_frequency(Frequency::EverySecond).unwrap();

    let early = trigger.subscribe(|_| {}).unwrap();
    scheduler.advance_to(Duration::from_millis(500));
    let late = trigger.subscribe(|_| {}).unwrap();

    scheduler.advance_to(seconds(1));
    assert_eq!((early.pulses(), late.pulses()), (1, 0));

    scheduler.advance_to(Duration::from_millis(1_500));
    assert_eq!((early.pulses(), late.pulses()), (1, 1));
}

#[test]
fn test_same_frequency_reuses_recipe() {
    let (_scheduler, provider) = setup();

    let first = provider.on_frequency(Frequency::At25Hz).unwrap();
    let second = provider.on_frequency(Frequency::At25Hz).unwrap();

    assert!(Trigger::same_recipe(&first, &second));
    assert_eq!(provider.recipes_built(), 1);
    assert_eq!(provider.cached_frequencies(), vec![Frequency::At25Hz]);
}

#[test]
fn test_unsubscribe_leaves_other_subscribers_running() {
    let (scheduler, provider) = setup();
    let trigger = provider.on_frequency(Frequency::At25Hz).unwrap();

    let (first, on_first) = counter();
    let first_subscription = trigger.subscribe(on_first).unwrap();
    let (second, on_second) = counter();
    let second_subscription = trigger.subscribe(on_second).unwrap();
    assert_eq!(scheduler.pending_timers(), 2);

    scheduler.advance_to(seconds(1));
    first_subscription.unsubscribe();
    scheduler.advance_to(seconds(2));

    assert_eq!(first.load(Ordering::SeqCst), 25);
    assert_eq!(second.load(Ordering::SeqCst), 50);
    assert_eq!(second_subscription.state(), SubscriptionState::Counting);
    assert_eq!(scheduler.pending_timers(), 1);

    // The recipe survives its subscribers
    drop(second_subscription);
    assert_eq!(scheduler.pending_timers(), 0);
    let again = provider.on_frequency(Frequency::At25Hz).unwrap();
    assert!(Trigger::same_recipe(&trigger, &again));
}

#[test]
fn test_shutdown_terminates_subscriptions() {
    let (scheduler, provider) = setup();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let subscription = {
        let errors = errors.clone();
        provider
            .on_frequency(Frequency::At10Hz)
            .unwrap()
            .subscribe_with(|_| {}, move |err| errors.lock().push(err))
            .unwrap()
    };

    scheduler.advance_to(seconds(1));
    scheduler.shutdown();
    scheduler.advance_to(seconds(2));

    assert_eq!(subscription.pulses(), 10);
    assert_eq!(subscription.state(), SubscriptionState::Terminated);
    assert!(!subscription.is_active());
    assert_eq!(*errors.lock(), vec![SchedulerError::ShutDown]);

    let result = provider
        .on_frequency(Frequency::At10Hz)
        .unwrap()
        .subscribe(|_| {});
    assert_eq!(
        result.unwrap_err(),
        TriggerError::Scheduler(SchedulerError::ShutDown)
    );
}

#[test]
fn test_misaligned_base_interval() {
    let _ = env_logger::try_init();
    let scheduler = VirtualScheduler::new();
    let provider =
        TriggerProvider::with_base_interval(Arc::new(scheduler.clone()), Duration::from_millis(30))
            .unwrap();

    let result = provider.on_frequency(Frequency::At50Hz);
    assert!(matches!(result, Err(TriggerError::Misconfigured(_))));
    assert!(provider.cached_frequencies().is_empty());
}

#[test]
fn test_from_config_warms_up_recipes() {
    let (scheduler, _) = setup();
    let config = TriggerConfig::from_json(
        r#"{ "name": "warm", "warm_up": ["At10Hz", "EverySecond", "Never"] }"#,
    )
    .unwrap();

    let provider = TriggerProvider::from_config(&config, Arc::new(scheduler.clone())).unwrap();

    assert_eq!(provider.name(), "warm");
    assert_eq!(provider.recipes_built(), 2);
    assert_eq!(
        provider.cached_frequencies(),
        vec![Frequency::At10Hz, Frequency::EverySecond]
    );
    // Warm-up builds recipes only, nothing is ticking yet
    assert_eq!(scheduler.pending_timers(), 0);
}

#[test]
fn test_from_config_rejects_misaligned_warm_up() {
    let (scheduler, _) = setup();
    let config = TriggerConfig {
        base_interval_ms: 30,
        warm_up: vec![Frequency::At25Hz],
        ..Default::default()
    };

    let result = TriggerProvider::from_config(&config, Arc::new(scheduler));
    assert!(matches!(result, Err(TriggerError::Config(_))));
}

#[tokio::test]
async fn test_channel_subscription() {
    let (scheduler, provider) = setup();
    let (subscription, mut rx) = provider
        .on_frequency(Frequency::At10Hz)
        .unwrap()
        .subscribe_channel()
        .unwrap();

    scheduler.advance_to(seconds(1));

    let mut received = 0;
    while let Ok(Pulse) = rx.try_recv() {
        received += 1;
    }
    assert_eq!(received, 10);

    // Unsubscribing closes the channel
    subscription.unsubscribe();
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_never_channel_stays_open() {
    let (scheduler, provider) = setup();
    let (subscription, mut rx) = provider
        .on_frequency(Frequency::Never)
        .unwrap()
        .subscribe_channel()
        .unwrap();

    scheduler.advance_to(seconds(3600));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    drop(subscription);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn test_real_time_provider() {
    let _ = env_logger::try_init();
    let provider = TriggerProvider::with_tokio().unwrap();

    let (_fast, mut fast_rx) = provider
        .on_frequency(Frequency::At10Hz)
        .unwrap()
        .subscribe_channel()
        .unwrap();
    let (_slow, mut slow_rx) = provider
        .on_frequency(Frequency::EverySecond)
        .unwrap()
        .subscribe_channel()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2_010)).await;

    let mut fast = 0;
    while fast_rx.try_recv().is_ok() {
        fast += 1;
    }
    let mut slow = 0;
    while slow_rx.try_recv().is_ok() {
        slow += 1;
    }

    assert_eq!(fast, 20);
    assert_eq!(slow, 2);
}

#[test]
fn test_subscribe_after_runtime_shutdown_fails() {
    let _ = env_logger::try_init();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let scheduler = TokioScheduler::new(runtime.handle().clone());
    let provider = TriggerProvider::new(Arc::new(scheduler));
    let trigger = provider.on_frequency(Frequency::At10Hz).unwrap();
    drop(runtime);

    let terminated = Arc::new(AtomicU64::new(0));
    let seen = terminated.clone();
    let result = trigger.subscribe_with(
        |_| {},
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert_eq!(
        result.unwrap_err(),
        TriggerError::Scheduler(SchedulerError::RuntimeShutdown)
    );
    assert_eq!(terminated.load(Ordering::SeqCst), 0);
}

#[test]
fn test_tokio_provider_needs_runtime() {
    let result = TriggerProvider::with_tokio();
    assert!(matches!(
        result,
        Err(TriggerError::Scheduler(SchedulerError::NoRuntime))
    ));
}
