//! Timing tests for the async playback driver.
//!
//! Every test runs on a paused tokio clock, so sleeps resolve instantly and
//! phase boundaries can be hit to the millisecond.

#![allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;
use std::time::Duration;

use biosim_core::topics::{TopicLibrary, heredity};
use biosim_core::{Playback, PlaybackError, PlaybackSettings};
use biosim_types::AdvancePolicy;
use tokio::time::{Instant, sleep, sleep_until};

fn settings() -> PlaybackSettings {
    PlaybackSettings {
        seed: Some(42),
        ..PlaybackSettings::default()
    }
}

fn playback(id: &str, settings: PlaybackSettings) -> Playback {
    let library = TopicLibrary::builtin().unwrap();
    Playback::new(library.get(id).unwrap(), settings).unwrap()
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_phase_dwell() {
    let playback = playback("heart-circulation", settings());
    let t0 = Instant::now();
    playback.set_running(true).unwrap();
    assert!(playback.is_running());
    assert!(playback.started_at().is_some());

    sleep_until(t0 + Duration::from_millis(999)).await;
    assert_eq!(playback.snapshot().elapsed_ticks, 0);

    sleep_until(t0 + Duration::from_millis(1001)).await;
    let snap = playback.snapshot();
    assert_eq!(snap.elapsed_ticks, 1);
    assert_eq!(snap.phase.name, "systole");

    sleep_until(t0 + Duration::from_millis(2500)).await;
    assert_eq!(playback.snapshot().elapsed_ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn each_phase_uses_its_own_dwell() {
    let playback = playback("digestive-system", settings());
    let t0 = Instant::now();
    playback.set_running(true).unwrap();

    let at = |ms| t0 + Duration::from_millis(ms);

    sleep_until(at(1999)).await;
    assert_eq!(playback.snapshot().phase.index, 0);
    sleep_until(at(2001)).await;
    assert_eq!(playback.snapshot().phase.index, 1);

    // Stomach dwells 3000 ms.
    sleep_until(at(4999)).await;
    assert_eq!(playback.snapshot().phase.index, 1);
    sleep_until(at(5001)).await;
    assert_eq!(playback.snapshot().phase.index, 2);

    // Small intestine dwells 4000 ms.
    sleep_until(at(8999)).await;
    assert_eq!(playback.snapshot().phase.index, 2);
    sleep_until(at(9001)).await;
    let snap = playback.snapshot();
    assert_eq!(snap.phase.index, 3);
    assert_eq!(snap.counter("carbs"), Some(85.0));
}

#[tokio::test(start_paused = true)]
async fn time_scale_shortens_dwell() {
    let playback = playback(
        "heart-circulation",
        PlaybackSettings {
            time_scale: 0.5,
            ..settings()
        },
    );
    let t0 = Instant::now();
    playback.set_running(true).unwrap();
    sleep_until(t0 + Duration::from_millis(1100)).await;
    assert_eq!(playback.snapshot().elapsed_ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn no_tick_lands_after_stop() {
    let playback = playback("heart-circulation", settings());
    let initial = playback.snapshot();
    let mut rx = playback.subscribe();

    playback.set_running(true).unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(playback.snapshot().elapsed_ticks, 2);

    playback.set_running(false).unwrap();
    assert!(!playback.is_running());
    assert!(playback.started_at().is_none());
    assert_eq!(playback.snapshot(), initial);
    assert_eq!(*rx.borrow_and_update(), initial);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(playback.snapshot(), initial);
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn set_running_is_idempotent() {
    let playback = playback("heart-circulation", settings());
    playback.set_running(true).unwrap();
    playback.set_running(true).unwrap();
    sleep(Duration::from_millis(2500)).await;
    // A second timer would have doubled the tick count.
    assert_eq!(playback.snapshot().elapsed_ticks, 2);

    playback.set_running(false).unwrap();
    playback.set_running(false).unwrap();
    assert!(!playback.is_running());
}

#[tokio::test(start_paused = true)]
async fn restart_begins_from_initial_state() {
    let playback = playback("cell-division", settings());
    playback.set_running(true).unwrap();
    sleep(Duration::from_millis(5500)).await;
    assert_eq!(playback.snapshot().phase.name, "metaphase");

    playback.set_running(false).unwrap();
    let t0 = Instant::now();
    playback.set_running(true).unwrap();
    sleep_until(t0 + Duration::from_millis(2999)).await;
    let snap = playback.snapshot();
    assert_eq!(snap.phase.name, "interphase");
    assert_eq!(snap.elapsed_ticks, 0);
    sleep_until(t0 + Duration::from_millis(3001)).await;
    assert_eq!(playback.snapshot().phase.name, "prophase");
}

#[tokio::test(start_paused = true)]
async fn terminal_topic_parks_on_last_phase() {
    let topic = heredity::genetic_engineering()
        .unwrap()
        .with_policy(AdvancePolicy::Terminal);
    let playback = Playback::new(Arc::new(topic), settings()).unwrap();
    let mut rx = playback.subscribe();
    playback.set_running(true).unwrap();

    sleep(Duration::from_secs(60)).await;
    let snap = playback.snapshot();
    assert!(snap.completed);
    assert!(snap.running);
    assert_eq!(snap.phase.index, snap.phase_count - 1);
    assert_eq!(snap.elapsed_ticks, 4);
    assert!(playback.is_running());

    let _ = rx.borrow_and_update();
    sleep(Duration::from_secs(60)).await;
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_every_tick() {
    let playback = playback("asexual-reproduction", settings());
    let mut rx = playback.subscribe();
    playback.set_running(true).unwrap();

    let mut seen = Vec::new();
    while seen.len() < 4 {
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        if snap.elapsed_ticks > 0 {
            seen.push(snap.phase.index);
        }
    }
    assert_eq!(seen, vec![1, 2, 3, 0]);
    assert_eq!(rx.borrow().counter("population"), Some(2.0));
}

#[tokio::test(start_paused = true)]
async fn dropping_playback_cancels_timer() {
    let playback = playback("heart-circulation", settings());
    let rx = playback.subscribe();
    playback.set_running(true).unwrap();
    sleep(Duration::from_millis(1500)).await;
    drop(playback);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(rx.borrow().elapsed_ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn independent_instances_share_a_topic() {
    let topic = Arc::new(heredity::mendel_experiments().unwrap());
    let a = Playback::new(Arc::clone(&topic), settings()).unwrap();
    let b = Playback::new(topic, settings()).unwrap();
    assert_ne!(a.id(), b.id());

    a.set_running(true).unwrap();
    sleep(Duration::from_millis(3500)).await;
    assert_eq!(a.snapshot().elapsed_ticks, 1);
    assert_eq!(b.snapshot().elapsed_ticks, 0);
    assert!(!b.is_running());
}

#[test]
fn starting_outside_runtime_fails() {
    let playback = playback("heart-circulation", settings());
    assert!(matches!(
        playback.set_running(true),
        Err(PlaybackError::NoRuntime)
    ));
    assert!(!playback.is_running());
    // Stopping needs no runtime.
    playback.set_running(false).unwrap();
}

#[test]
fn invalid_settings_are_rejected() {
    let library = TopicLibrary::builtin().unwrap();
    let err = Playback::new(
        library.get("heart-circulation").unwrap(),
        PlaybackSettings {
            time_scale: 0.0,
            ..settings()
        },
    )
    .unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidSettings { .. }));
}
