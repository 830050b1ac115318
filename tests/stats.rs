//! Frame stats ring behaviour as seen through the public reader API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use frame_pacer::{FrameStatsStorage, LatencySummary};
use proptest::prelude::*;

fn micros(value: u64) -> Duration {
    Duration::from_micros(value)
}

#[test]
fn two_frames_on_a_four_slot_ring() {
    let storage = Arc::new(FrameStatsStorage::with_capacity(4).unwrap());
    let mut reader = storage.reader();
    let t0 = Instant::now();

    storage.register_frame_start_at(1, t0);
    assert_eq!(reader.next_record(), None);
    storage.register_frame_end_at(1, t0 + micros(5_000));

    let first = reader.next_record().unwrap();
    assert_eq!(first.frame_id, 1);
    assert_eq!(first.latency_micros, 5_000);
    assert_eq!(first.frametime_micros, 0);
    assert_eq!(first.start, t0);
    assert_eq!(first.end, t0 + micros(5_000));

    storage.register_frame_start_at(2, t0 + micros(6_000));
    storage.register_frame_end_at(2, t0 + micros(20_000));

    let second = reader.next_record().unwrap();
    assert_eq!(second.frame_id, 2);
    assert_eq!(second.latency_micros, 14_000);
    assert_eq!(second.frametime_micros, 15_000);
    assert_eq!(reader.next_record(), None);
    assert_eq!(storage.last_confirmed(), 2);
}

#[test]
fn three_submitted_two_confirmed_on_a_four_slot_ring() {
    let storage = Arc::new(FrameStatsStorage::with_capacity(4).unwrap());
    let mut reader = storage.reader();
    let t0 = Instant::now();

    for id in 1..=3u64 {
        storage.register_frame_start_at(id, t0 + micros((id - 1) * 1_000));
    }
    assert_eq!(reader.next_record(), None);

    storage.register_frame_end_at(1, t0 + micros(5_000));
    let first = reader.next_record().unwrap();
    assert_eq!(first.frame_id, 1);
    assert_eq!(first.latency_micros, 5_000);

    storage.register_frame_end_at(2, t0 + micros(9_000));
    let second = reader.next_record().unwrap();
    assert_eq!(second.frame_id, 2);
    assert_eq!(second.latency_micros, 8_000);
    assert_eq!(second.frametime_micros, 4_000);

    let begin = Instant::now();
    assert_eq!(reader.next_record(), None);
    assert!(begin.elapsed() < Duration::from_millis(100));
    assert_eq!(reader.dropped(), 0);
}

#[test]
fn confirmations_before_the_first_poll_are_all_delivered() {
    let storage = Arc::new(FrameStatsStorage::with_capacity(4).unwrap());
    let mut reader = storage.reader();
    let t0 = Instant::now();

    for id in 1..=3u64 {
        storage.register_frame_start_at(id, t0 + micros((id - 1) * 1_000));
    }
    storage.register_frame_end_at(1, t0 + micros(5_000));
    storage.register_frame_end_at(2, t0 + micros(9_000));

    let records: Vec<_> = std::iter::from_fn(|| reader.next_record()).collect();
    let summary: Vec<(u64, u32)> = records
        .iter()
        .map(|r| (r.frame_id, r.latency_micros))
        .collect();
    assert_eq!(summary, vec![(1, 5_000), (2, 8_000)]);
}

#[test]
#[should_panic(expected = "out of order")]
fn skipping_a_frame_panics() {
    let storage = FrameStatsStorage::with_capacity(4).unwrap();
    let t0 = Instant::now();
    storage.register_frame_start_at(1, t0);
    storage.register_frame_start_at(2, t0 + micros(10));
    storage.register_frame_end_at(2, t0 + micros(100));
}

#[test]
#[should_panic(expected = "overrun")]
fn lapping_the_confirmed_frame_panics() {
    let storage = FrameStatsStorage::with_capacity(4).unwrap();
    let t0 = Instant::now();
    for id in 1..=5 {
        storage.register_frame_start_at(id, t0 + micros(id));
    }
}

#[test]
fn summary_drains_a_reader() {
    let storage = Arc::new(FrameStatsStorage::with_capacity(8).unwrap());
    let mut reader = storage.reader();
    let t0 = Instant::now();
    for (id, latency) in [(1u64, 2_000u64), (2, 6_000), (3, 4_000)] {
        let start = t0 + micros(id * 10_000);
        storage.register_frame_start_at(id, start);
        storage.register_frame_end_at(id, start + micros(latency));
    }

    let mut summary = LatencySummary::default();
    assert_eq!(summary.drain(&mut reader), 3);
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min_latency_micros, Some(2_000));
    assert_eq!(summary.max_latency_micros, Some(6_000));
    assert_eq!(summary.mean_latency_micros(), Some(4_000));
    assert_eq!(summary.drain(&mut reader), 0);
}

proptest! {
    // Every confirmed frame reaches the reader once, in order, with exact timings.
    #[test]
    fn reader_sees_every_frame_in_order(
        frames in prop::collection::vec((1u64..5_000, 1u64..50_000), 1..64),
        batch in 1usize..8,
    ) {
        let storage = Arc::new(FrameStatsStorage::with_capacity(8).unwrap());
        let mut reader = storage.reader();
        let mut seen = Vec::new();
        let mut expected = Vec::new();

        let mut clock = Instant::now();
        let mut previous_end: Option<Instant> = None;
        for (index, (gap, latency)) in frames.iter().enumerate() {
            let id = index as u64 + 1;
            let start = clock + micros(*gap);
            let end = start + micros(*latency);
            clock = end;

            storage.register_frame_start_at(id, start);
            storage.register_frame_end_at(id, end);

            let frametime = previous_end.map_or(0, |prev| (end - prev).as_micros() as u32);
            expected.push((id, *latency as u32, frametime));
            previous_end = Some(end);

            if (index + 1) % batch == 0 {
                while let Some(record) = reader.next_record() {
                    seen.push((record.frame_id, record.latency_micros, record.frametime_micros));
                }
            }
        }
        while let Some(record) = reader.next_record() {
            seen.push((record.frame_id, record.latency_micros, record.frametime_micros));
        }

        prop_assert_eq!(seen, expected);
        prop_assert_eq!(reader.dropped(), 0);
    }

    // A reader a full revolution behind skips only the overwritten records and keeps the rest.
    #[test]
    fn lagging_reader_drops_only_overwritten_records(extra in 0u64..20) {
        let capacity = 8u64;
        let storage = Arc::new(FrameStatsStorage::with_capacity(capacity as usize).unwrap());
        let mut reader = storage.reader();
        let t0 = Instant::now();

        let behind = capacity + extra;
        for id in 1..=behind {
            let start = t0 + micros(id * 100);
            storage.register_frame_start_at(id, start);
            storage.register_frame_end_at(id, start + micros(50));
        }

        let ids: Vec<u64> = std::iter::from_fn(|| reader.next_record())
            .map(|r| r.frame_id)
            .collect();
        let expected: Vec<u64> = (behind - capacity + 1..=behind).collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(reader.dropped(), behind - capacity);

        let next = behind + 1;
        let start = t0 + micros(next * 100);
        storage.register_frame_start_at(next, start);
        storage.register_frame_end_at(next, start + micros(50));
        prop_assert_eq!(reader.next_record().map(|r| r.frame_id), Some(next));
    }
}
