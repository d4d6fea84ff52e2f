//! Tests for batch splitting, sequential batch execution and request pacing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sp_ranking_sdk::batching::{get_batches, run_sequential, Pacer};
use sp_ranking_sdk::RankingError;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// get_batches
// ---------------------------------------------------------------------------

#[test]
fn splits_into_chunks_with_short_tail() {
    let items: Vec<u32> = (0..120).collect();
    let batches = get_batches(&items, 50).unwrap();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(batches[2][0], 100);
    assert_eq!(batches.concat(), items);
}

#[test]
fn exact_multiple_has_no_empty_tail() {
    let items: Vec<u32> = (0..100).collect();
    assert_eq!(get_batches(&items, 50).unwrap().len(), 2);
}

#[test]
fn empty_input_gives_no_batches() {
    let items: Vec<u32> = Vec::new();
    assert!(get_batches(&items, 50).unwrap().is_empty());
}

#[test]
fn zero_size_is_rejected() {
    let err = get_batches(&[1, 2, 3], 0).unwrap_err();
    assert!(matches!(err, RankingError::InvalidArgument(_)));
}

// ---------------------------------------------------------------------------
// run_sequential
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn batches_run_in_order_with_pause_between() {
    let batches = get_batches(&(0..120).collect::<Vec<u32>>(), 50).unwrap();
    let started = Instant::now();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    let mut delivered = Vec::new();
    run_sequential(
        batches,
        Duration::from_millis(300),
        move |batch: Vec<u32>| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push((batch[0], Instant::now()));
                Ok(batch.len())
            }
        },
        |idx, len| delivered.push((idx, len)),
    )
    .await
    .unwrap();

    assert_eq!(delivered, vec![(0, 50), (1, 50), (2, 20)]);
    let seen = seen.lock().unwrap();
    let firsts: Vec<u32> = seen.iter().map(|(first, _)| *first).collect();
    assert_eq!(firsts, vec![0, 50, 100]);
    // Pause between batches, not after the last one.
    assert!(seen[1].1 - seen[0].1 >= Duration::from_millis(300));
    assert!(seen[2].1 - seen[1].1 >= Duration::from_millis(300));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600));
    assert!(elapsed < Duration::from_millis(900));
}

#[tokio::test(start_paused = true)]
async fn first_error_stops_the_sequence() {
    let batches = vec![vec![1], vec![2], vec![3]];
    let mut delivered = Vec::new();
    let result = run_sequential(
        batches,
        Duration::from_millis(10),
        |batch: Vec<u32>| async move {
            if batch[0] == 2 {
                Err(RankingError::InvalidArgument("batch 2 failed".into()))
            } else {
                Ok(batch[0])
            }
        },
        |_, out| delivered.push(out),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(delivered, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn zero_pause_does_not_sleep() {
    let started = Instant::now();
    run_sequential(
        vec![vec![1], vec![2]],
        Duration::ZERO,
        |batch: Vec<u32>| async move { Ok(batch) },
        |_, _| {},
    )
    .await
    .unwrap();
    assert_eq!(started.elapsed(), Duration::ZERO);
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

#[test]
fn pacer_gap_from_rate() {
    assert_eq!(Pacer::per_second("q", 10.0).gap(), Duration::from_millis(100));
    // Floored at 0.1 calls per second.
    assert_eq!(Pacer::per_second("q", 0.0).gap(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn pacer_spaces_consecutive_calls() {
    let pacer = Pacer::per_second("quotes", 10.0);
    let started = Instant::now();
    pacer.wait().await;
    assert_eq!(started.elapsed(), Duration::ZERO);
    pacer.wait().await;
    pacer.wait().await;
    assert!(started.elapsed() >= Duration::from_millis(200));
}
