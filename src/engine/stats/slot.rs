use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};
use std::time::{Duration, Instant};

use crate::engine::backend::ConfirmationTarget;

use super::FrameRecord;

/// ### English
/// One ring slot.
///
/// Field ownership:
/// - Submission thread: `frame_id`, `start_nanos`, `target`.
/// - Confirmation thread: `end_nanos`, `latency_micros`, `frametime_micros`.
///
/// `frame_id` doubles as a sequence tag: it is stored before `start_nanos` (behind a release
/// fence) so readers can detect that the slot was reused while they were copying it.
///
/// ### 中文
/// 单个 ring 槽位。
///
/// 字段归属：
/// - 提交线程：`frame_id`、`start_nanos`、`target`。
/// - 确认线程：`end_nanos`、`latency_micros`、`frametime_micros`。
///
/// `frame_id` 同时作为序列标记：它在 `start_nanos` 之前写入（中间有 release fence），
/// 读者据此检测拷贝期间槽位是否被复用。
pub(super) struct FrameSlot {
    pub(super) frame_id: AtomicU64,
    pub(super) start_nanos: AtomicU64,
    pub(super) end_nanos: AtomicU64,
    pub(super) latency_micros: AtomicU32,
    pub(super) frametime_micros: AtomicU32,
    /// ### English
    /// Confirmation parameters. Written by the submission thread before the params index publish,
    /// read by the confirmation thread after observing that publish.
    ///
    /// ### 中文
    /// 确认参数：提交线程在发布 params 索引前写入，确认线程观察到该发布后读取。
    pub(super) target: UnsafeCell<Option<ConfirmationTarget>>,
}

// SAFETY: `target` is only written by the submission thread, for a frame id at most one ring
// revolution past the last confirmed frame (checked by
// `FrameStatsStorage::register_wait_for_present_params`). The confirmation thread only reads the
// target of the frame right after the last confirmed one, after an acquire load of the params
// index, so the two never touch the same slot concurrently. All other fields are atomics.
unsafe impl Sync for FrameSlot {}

impl FrameSlot {
    pub(super) fn new() -> Self {
        Self {
            frame_id: AtomicU64::new(0),
            start_nanos: AtomicU64::new(0),
            end_nanos: AtomicU64::new(0),
            latency_micros: AtomicU32::new(0),
            frametime_micros: AtomicU32::new(0),
            target: UnsafeCell::new(None),
        }
    }

    /// ### English
    /// Copies the completed record for `expected` out of the slot.
    ///
    /// Returns `None` if the slot no longer (or never) belonged to `expected`, including the case
    /// where it was reused during the copy.
    ///
    /// ### 中文
    /// 从槽位中拷贝出 `expected` 对应的已完成记录。
    ///
    /// 若槽位已不属于（或从未属于）`expected`（包括拷贝期间被复用的情况），返回 `None`。
    pub(super) fn load(&self, expected: u64, epoch: Instant) -> Option<FrameRecord> {
        if self.frame_id.load(Ordering::Acquire) != expected {
            return None;
        }

        let start_nanos = self.start_nanos.load(Ordering::Relaxed);
        let end_nanos = self.end_nanos.load(Ordering::Relaxed);
        let latency_micros = self.latency_micros.load(Ordering::Relaxed);
        let frametime_micros = self.frametime_micros.load(Ordering::Relaxed);

        fence(Ordering::Acquire);
        if self.frame_id.load(Ordering::Relaxed) != expected {
            return None;
        }

        Some(FrameRecord {
            frame_id: expected,
            frametime_micros,
            latency_micros,
            start: epoch + Duration::from_nanos(start_nanos),
            end: epoch + Duration::from_nanos(end_nanos),
        })
    }
}
