//! Presenter pacing against in-process displays.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use frame_pacer::sim::{ManualDisplay, VsyncDisplay};
use frame_pacer::{
    ConfirmationWaiter, DeviceHandle, PacerConfig, PacerError, PacingContext, PresentDescriptor,
    PresentExtension, PresentIdTag, PresentOutcome, Presenter, QueueHandle, Submitter,
    SurfaceHandle,
};

const BLOCKED_FOR: Duration = Duration::from_millis(100);
const PATIENCE: Duration = Duration::from_secs(5);

fn context(render_ahead_limit: i8) -> Arc<PacingContext> {
    PacingContext::new(PacerConfig {
        render_ahead_limit,
        ..PacerConfig::default()
    })
}

fn manual_presenter(
    context: &Arc<PacingContext>,
) -> (Presenter<Arc<ManualDisplay>>, Arc<ManualDisplay>) {
    let display = ManualDisplay::new();
    let waiter: Arc<dyn ConfirmationWaiter> = display.clone();
    let presenter = Presenter::new(context, display.clone(), waiter).unwrap();
    (presenter, display)
}

fn present(presenter: &Presenter<Arc<ManualDisplay>>) -> PresentOutcome {
    presenter
        .present(
            QueueHandle(1),
            &PresentDescriptor::single(SurfaceHandle(2), 0),
            DeviceHandle(3),
        )
        .unwrap()
}

/// Presents `count` frames on another thread; the receiver yields the presenter back when done.
fn present_in_background(
    presenter: Presenter<Arc<ManualDisplay>>,
    count: usize,
) -> Receiver<Presenter<Arc<ManualDisplay>>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        for _ in 0..count {
            present(&presenter);
        }
        let _ = tx.send(presenter);
    });
    rx
}

fn wait_for_confirmed<S: Submitter>(presenter: &Presenter<S>, frame_id: u64) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while presenter.stats().last_confirmed() < frame_id {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

#[test]
fn frames_are_tagged_with_sequential_ids() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);

    for _ in 0..3 {
        assert_eq!(present(&presenter), PresentOutcome::SUCCESS);
    }
    assert_eq!(display.submitted(), vec![1, 2, 3]);
    assert_eq!(presenter.next_frame_id(), 4);
    assert_eq!(presenter.stats().last_params_published(), 3);
}

#[test]
fn existing_present_id_tag_is_overwritten() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);

    let mut descriptor = PresentDescriptor::single(SurfaceHandle(2), 1);
    descriptor
        .extensions
        .push(PresentExtension::PresentId(PresentIdTag {
            present_ids: vec![99],
        }));
    presenter
        .present(QueueHandle(1), &descriptor, DeviceHandle(3))
        .unwrap();

    assert_eq!(display.submitted(), vec![1]);
    assert_eq!(descriptor.present_id(), Some(99));
}

#[test]
fn render_ahead_one_waits_for_the_previous_frame() {
    let context = context(1);
    let (presenter, display) = manual_presenter(&context);
    present(&presenter);

    let done = present_in_background(presenter, 1);
    assert!(display.wait_submitted(2, Instant::now() + PATIENCE));
    assert!(done.recv_timeout(BLOCKED_FOR).is_err());

    display.confirm_through(1);
    let presenter = done.recv_timeout(PATIENCE).unwrap();
    assert_eq!(presenter.next_frame_id(), 3);
    assert!(wait_for_confirmed(&presenter, 1));
}

#[test]
fn render_ahead_zero_waits_for_its_own_frame() {
    let context = context(0);
    let (presenter, display) = manual_presenter(&context);

    let done = present_in_background(presenter, 1);
    assert!(display.wait_submitted(1, Instant::now() + PATIENCE));
    assert!(done.recv_timeout(BLOCKED_FOR).is_err());

    display.confirm_through(1);
    let presenter = done.recv_timeout(PATIENCE).unwrap();
    assert!(wait_for_confirmed(&presenter, 1));
}

#[test]
fn negative_limit_never_blocks() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);

    let done = present_in_background(presenter, 32);
    let presenter = done.recv_timeout(PATIENCE).unwrap();
    assert_eq!(display.submitted().len(), 32);
    assert_eq!(presenter.stats().last_confirmed(), 0);
}

#[test]
fn limit_change_applies_to_the_next_present() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);
    for _ in 0..3 {
        present(&presenter);
    }

    presenter.set_render_ahead_limit(1);
    assert_eq!(presenter.render_ahead_limit(), 1);

    let done = present_in_background(presenter, 1);
    assert!(display.wait_submitted(4, Instant::now() + PATIENCE));
    assert!(done.recv_timeout(BLOCKED_FOR).is_err());

    display.confirm_through(3);
    done.recv_timeout(PATIENCE).unwrap();
}

#[test]
fn throttle_timeout_lets_submission_proceed() {
    let context = PacingContext::new(PacerConfig {
        render_ahead_limit: 0,
        throttle_timeout_ms: Some(20),
        ..PacerConfig::default()
    });
    let (presenter, display) = manual_presenter(&context);

    let begin = Instant::now();
    present(&presenter);
    present(&presenter);
    assert!(begin.elapsed() < PATIENCE);
    assert_eq!(display.submitted(), vec![1, 2]);
    assert_eq!(presenter.stats().last_confirmed(), 0);
}

#[test]
fn full_ring_applies_backpressure() {
    let context = PacingContext::new(PacerConfig {
        render_ahead_limit: -1,
        stats_capacity: 4,
        ..PacerConfig::default()
    });
    let (presenter, display) = manual_presenter(&context);
    let mut reader = presenter.reader();

    // Starting frame 4 with nothing confirmed would take the slot of the oldest record.
    let done = present_in_background(presenter, 5);
    assert!(display.wait_submitted(3, Instant::now() + PATIENCE));
    assert!(done.recv_timeout(BLOCKED_FOR).is_err());
    assert_eq!(display.submitted().len(), 3);

    display.confirm_through(3);
    let presenter = done.recv_timeout(PATIENCE).unwrap();
    assert_eq!(display.submitted().len(), 5);
    assert_eq!(presenter.next_frame_id(), 6);
    assert!(presenter.next_frame_id() - presenter.stats().last_confirmed() < 4);

    let ids: Vec<u64> = std::iter::from_fn(|| reader.next_record())
        .map(|r| r.frame_id)
        .collect();
    assert_eq!(ids, (1..=presenter.stats().last_confirmed()).collect::<Vec<_>>());
    assert_eq!(reader.dropped(), 0);
}

#[test]
fn stalled_display_keeps_the_newest_record_readable() {
    let context = PacingContext::new(PacerConfig {
        render_ahead_limit: -1,
        stats_capacity: 4,
        ..PacerConfig::default()
    });
    let (presenter, display) = manual_presenter(&context);
    let mut reader = presenter.reader();

    display.confirm_through(2);
    let done = present_in_background(presenter, 5);
    assert!(display.wait_submitted(5, Instant::now() + PATIENCE));
    assert!(done.recv_timeout(BLOCKED_FOR).is_err());

    // Frame 1's slot now belongs to frame 5; frame 2 must still be readable.
    let mut ids = Vec::new();
    let deadline = Instant::now() + PATIENCE;
    while !ids.contains(&2) && Instant::now() < deadline {
        ids.extend(std::iter::from_fn(|| reader.next_record()).map(|r| r.frame_id));
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(ids.last(), Some(&2));
    assert_eq!(ids.len() as u64 + reader.dropped(), 2);

    display.confirm_through(5);
    done.recv_timeout(PATIENCE).unwrap();
}

#[test]
fn backend_outcome_is_passed_through() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);
    let lost = PresentOutcome(-1_000_001_004);
    display.set_submit_outcome(lost);

    assert_eq!(present(&presenter), lost);
    assert_eq!(presenter.next_frame_id(), 2);
}

#[test]
fn failed_confirmation_still_records_the_frame() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);
    display.set_wait_failure(Some(-4));

    present(&presenter);
    present(&presenter);
    assert!(wait_for_confirmed(&presenter, 2));
}

#[test]
fn surface_count_other_than_one_is_rejected() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);

    let empty = PresentDescriptor::default();
    let err = presenter
        .present(QueueHandle(1), &empty, DeviceHandle(3))
        .unwrap_err();
    assert!(matches!(err, PacerError::UnsupportedSurfaceCount(0)));

    let mut pair = PresentDescriptor::single(SurfaceHandle(1), 0);
    pair.surfaces.push(SurfaceHandle(2));
    pair.image_indices.push(0);
    let err = presenter
        .present(QueueHandle(1), &pair, DeviceHandle(3))
        .unwrap_err();
    assert!(matches!(err, PacerError::UnsupportedSurfaceCount(2)));

    assert!(display.submitted().is_empty());
    assert_eq!(presenter.next_frame_id(), 1);
}

#[test]
fn one_presenter_per_context() {
    let context = context(1);
    let (presenter, _display) = manual_presenter(&context);
    assert!(context.has_active_presenter());

    let display = ManualDisplay::new();
    let waiter: Arc<dyn ConfirmationWaiter> = display.clone();
    let second = Presenter::new(&context, display.clone(), waiter.clone());
    assert!(matches!(second, Err(PacerError::PresenterActive)));

    drop(presenter);
    assert!(!context.has_active_presenter());
    assert!(Presenter::new(&context, display, waiter).is_ok());
}

#[test]
fn shutdown_is_prompt_with_unconfirmed_frames() {
    let context = context(-1);
    let (presenter, _display) = manual_presenter(&context);
    present(&presenter);
    present(&presenter);

    let begin = Instant::now();
    drop(presenter);
    assert!(begin.elapsed() < Duration::from_secs(1));
}

#[test]
fn shutdown_is_prompt_before_any_present() {
    let context = context(1);
    let (presenter, _display) = manual_presenter(&context);

    let begin = Instant::now();
    drop(presenter);
    assert!(begin.elapsed() < Duration::from_secs(1));
    assert!(!context.has_active_presenter());
}

#[test]
fn reader_follows_confirmed_frames() {
    let context = context(-1);
    let (presenter, display) = manual_presenter(&context);
    let mut reader = presenter.reader();

    for _ in 0..3 {
        present(&presenter);
    }
    display.confirm_through(3);
    assert!(wait_for_confirmed(&presenter, 3));

    let records: Vec<_> = std::iter::from_fn(|| reader.next_record()).collect();
    let ids: Vec<u64> = records.iter().map(|r| r.frame_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(records.iter().all(|r| r.end > r.start));
    assert_eq!(records[0].frametime_micros, 0);

    drop(presenter);
    assert_eq!(reader.next_record(), None);
}

#[test]
fn vsync_display_paces_to_refresh() {
    let context = context(1);
    let display = VsyncDisplay::new(Duration::from_millis(4));
    let waiter: Arc<dyn ConfirmationWaiter> = display.clone();
    let presenter = Presenter::new(&context, display.clone(), waiter).unwrap();
    let mut reader = presenter.reader();

    let frames: u32 = 10;
    let begin = Instant::now();
    for _ in 0..frames {
        presenter
            .present(
                QueueHandle(0),
                &PresentDescriptor::single(SurfaceHandle(1), 0),
                DeviceHandle(0),
            )
            .unwrap();
    }
    // Throttled to one frame in flight, so submission cannot outrun the display.
    assert!(begin.elapsed() >= display.refresh_interval() * (frames - 2));
    assert!(wait_for_confirmed(&presenter, u64::from(frames)));

    let records: Vec<_> = std::iter::from_fn(|| reader.next_record()).collect();
    assert_eq!(records.len(), frames as usize);
    assert!(records.windows(2).all(|w| w[1].end > w[0].end));
}

#[test]
fn limit_and_reader_are_usable_while_a_present_is_blocked() {
    let context = context(0);
    let (presenter, display) = manual_presenter(&context);
    let presenter = Arc::new(presenter);

    let (first_done, first_done_rx) = bounded(1);
    let submitting = {
        let presenter = presenter.clone();
        thread::spawn(move || {
            present(&presenter);
            let _ = first_done.send(());
            present(&presenter);
            present(&presenter);
        })
    };
    assert!(display.wait_submitted(1, Instant::now() + PATIENCE));
    assert!(first_done_rx.recv_timeout(BLOCKED_FOR).is_err());

    presenter.set_render_ahead_limit(-1);
    assert_eq!(presenter.render_ahead_limit(), -1);
    let mut reader = presenter.reader();

    display.confirm_through(1);
    first_done_rx.recv_timeout(PATIENCE).unwrap();
    // The new limit applies to the following presents, which no longer wait.
    submitting.join().unwrap();
    assert_eq!(display.submitted(), vec![1, 2, 3]);

    assert!(wait_for_confirmed(&presenter, 1));
    assert_eq!(reader.next_record().map(|r| r.frame_id), Some(1));
}

#[test]
fn reader_thread_sees_consistent_records_while_frames_complete() {
    const FRAMES: u64 = 5_000;
    let context = PacingContext::new(PacerConfig {
        render_ahead_limit: -1,
        stats_capacity: 16,
        ..PacerConfig::default()
    });
    let (presenter, display) = manual_presenter(&context);
    let stop = Arc::new(AtomicBool::new(false));

    let reading = {
        let mut reader = presenter.reader();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut last_id = 0;
            let mut read = 0u64;
            let mut inconsistent = 0u64;
            loop {
                let stopping = stop.load(Ordering::Acquire);
                while let Some(record) = reader.next_record() {
                    let elapsed = (record.end - record.start).as_micros();
                    if record.frame_id <= last_id || u128::from(record.latency_micros) != elapsed {
                        inconsistent += 1;
                    }
                    last_id = record.frame_id;
                    read += 1;
                }
                if stopping {
                    break;
                }
                thread::yield_now();
            }
            (read, reader.dropped(), inconsistent, last_id)
        })
    };

    let confirming = {
        let display = display.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                if let Some(frame_id) = display.last_submitted() {
                    display.confirm_through(frame_id);
                }
                thread::yield_now();
            }
        })
    };

    for _ in 0..FRAMES {
        present(&presenter);
    }
    display.confirm_through(FRAMES);
    assert!(wait_for_confirmed(&presenter, FRAMES));

    stop.store(true, Ordering::Release);
    confirming.join().unwrap();
    let (read, dropped, inconsistent, last_id) = reading.join().unwrap();

    assert_eq!(inconsistent, 0);
    assert_eq!(last_id, FRAMES);
    assert_eq!(read + dropped, presenter.stats().last_confirmed());
    assert_eq!(presenter.stats().last_confirmed(), FRAMES);
}
