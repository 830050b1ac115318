//! ### English
//! Per-frame timing ring shared by the submission thread, the present-wait thread and any number of
//! telemetry readers.
//!
//! Two publish points guard two disjoint field sets:
//! - `producer_params_index`: last frame whose confirmation parameters are stored (submission side).
//! - `producer_index`: last frame whose confirmation was recorded (present-wait side).
//!
//! Both hold full frame ids rather than ring positions, so they stay monotonic across wraps.
//!
//! ### 中文
//! 由提交线程、present-wait 线程以及任意数量的遥测读者共享的逐帧计时 ring。
//!
//! 两个发布点分别保护两组互不相交的字段：
//! - `producer_params_index`：最近一个已存入确认参数的帧（提交侧）。
//! - `producer_index`：最近一个已记录确认的帧（present-wait 侧）。
//!
//! 两者保存完整帧 ID 而不是 ring 位置，因此跨越回绕时仍保持单调。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering, fence};
use std::time::Instant;

use crate::engine::backend::ConfirmationTarget;
use crate::engine::cache::{pad_after, pad_to_cache_line};
use crate::engine::error::PacerError;
use crate::engine::signal::Signal;

mod reader;
mod slot;
mod summary;

pub use reader::FrameStatsReader;
pub use summary::LatencySummary;

use slot::FrameSlot;

const STATS_PAD_BYTES: usize = pad_after::<AtomicU64>();
const SUBMIT_PAD_BYTES: usize = pad_to_cache_line(2 * std::mem::size_of::<AtomicU64>());

/// ### English
/// Completed timing record for one frame, as seen by readers.
///
/// ### 中文
/// 读者看到的单帧已完成计时记录。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRecord {
    pub frame_id: u64,
    /// ### English
    /// Time between this frame's confirmation and the previous one (`0` for the first frame).
    ///
    /// ### 中文
    /// 本帧确认与上一帧确认之间的间隔（首帧为 `0`）。
    pub frametime_micros: u32,
    /// ### English
    /// Submission-to-confirmation latency.
    ///
    /// ### 中文
    /// 从提交到确认显示的延迟。
    pub latency_micros: u32,
    pub start: Instant,
    pub end: Instant,
}

#[repr(C, align(64))]
/// ### English
/// Fixed-capacity ring of frame records.
///
/// Threading model:
/// - Submission thread: `register_frame_start*`, `register_wait_for_present_params`.
/// - Present-wait thread: `wait_for_present_params`, `register_frame_end*`.
/// - Any thread: `reader()` and the read-only accessors.
///
/// Capacity assumption: the present-wait thread never lags the submitter by a full revolution.
/// The start/params writers assert it; `Presenter` backs off before it could be violated.
///
/// ### 中文
/// 固定容量的帧记录 ring。
///
/// 线程模型：
/// - 提交线程：`register_frame_start*`、`register_wait_for_present_params`。
/// - present-wait 线程：`wait_for_present_params`、`register_frame_end*`。
/// - 任意线程：`reader()` 以及只读访问器。
///
/// 容量假设：present-wait 线程落后提交方永远不超过一整圈。
/// start/params 写入方会断言这一点；`Presenter` 会在即将违反前退避。
pub struct FrameStatsStorage {
    /// ### English
    /// Last confirmed frame id (`0` = none). Single writer: present-wait thread.
    ///
    /// ### 中文
    /// 最近确认的帧 ID（`0` 表示尚无）。唯一写者：present-wait 线程。
    producer_index: AtomicU64,
    _pad_producer: [u8; STATS_PAD_BYTES],
    /// ### English
    /// Last frame id with published confirmation parameters. Single writer: submission thread.
    ///
    /// ### 中文
    /// 最近发布确认参数的帧 ID。唯一写者：提交线程。
    producer_params_index: AtomicU64,
    /// ### English
    /// Newest frame id whose start was registered. Single writer: submission thread.
    ///
    /// ### 中文
    /// 最近登记开始的帧 ID。唯一写者：提交线程。
    last_started: AtomicU64,
    _pad_submit: [u8; SUBMIT_PAD_BYTES],
    /// ### English
    /// End timestamp of the last confirmed frame (present-wait thread only).
    ///
    /// ### 中文
    /// 最近确认帧的结束时间戳（仅 present-wait 线程使用）。
    last_end_nanos: AtomicU64,
    mask: u64,
    epoch: Instant,
    slots: Box<[FrameSlot]>,
    params_signal: Signal,
}

impl FrameStatsStorage {
    /// ### English
    /// Creates a ring with exactly `capacity` slots.
    ///
    /// #### Parameters
    /// - `capacity`: Power of two, at least 2.
    ///
    /// ### 中文
    /// 创建恰好 `capacity` 个槽位的 ring。
    ///
    /// #### 参数
    /// - `capacity`：2 的幂，且不小于 2。
    pub fn with_capacity(capacity: usize) -> Result<Self, PacerError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(PacerError::InvalidCapacity(capacity));
        }

        let slots: Vec<FrameSlot> = (0..capacity).map(|_| FrameSlot::new()).collect();

        Ok(Self {
            producer_index: AtomicU64::new(0),
            _pad_producer: [0; STATS_PAD_BYTES],
            producer_params_index: AtomicU64::new(0),
            last_started: AtomicU64::new(0),
            _pad_submit: [0; SUBMIT_PAD_BYTES],
            last_end_nanos: AtomicU64::new(0),
            mask: capacity as u64 - 1,
            epoch: Instant::now(),
            slots: slots.into_boxed_slice(),
            params_signal: Signal::new(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.mask + 1
    }

    /// ### English
    /// Last confirmed frame id (`0` before the first confirmation).
    ///
    /// ### 中文
    /// 最近确认的帧 ID（首次确认前为 `0`）。
    #[inline]
    pub fn last_confirmed(&self) -> u64 {
        self.producer_index.load(Ordering::Acquire)
    }

    /// ### English
    /// Reference point of all stored timestamps.
    ///
    /// ### 中文
    /// 所有已存时间戳的参考零点。
    #[inline]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    #[inline]
    pub fn last_params_published(&self) -> u64 {
        self.producer_params_index.load(Ordering::Acquire)
    }

    /// ### English
    /// Newest frame id whose start was registered (`0` before the first start).
    ///
    /// Records older than `last_started() - capacity()` may already be overwritten.
    ///
    /// ### 中文
    /// 最近登记开始的帧 ID（首次登记前为 `0`）。
    ///
    /// 早于 `last_started() - capacity()` 的记录可能已被覆盖。
    #[inline]
    pub fn last_started(&self) -> u64 {
        self.last_started.load(Ordering::Acquire)
    }

    /// ### English
    /// Returns a cursor that sees only completions published after this call.
    ///
    /// ### 中文
    /// 返回一个游标，只能看到本次调用之后发布的确认记录。
    pub fn reader(self: &Arc<Self>) -> FrameStatsReader {
        FrameStatsReader::new(self.clone())
    }

    pub fn register_frame_start(&self, frame_id: u64) {
        self.register_frame_start_at(frame_id, Instant::now());
    }

    /// ### English
    /// Records `at` as the submission timestamp of `frame_id`.
    ///
    /// Panics if `frame_id` is already confirmed or would lap the present-wait thread.
    ///
    /// #### Parameters
    /// - `frame_id`: Frame being started.
    /// - `at`: Submission timestamp.
    ///
    /// ### 中文
    /// 将 `at` 记录为 `frame_id` 的提交时间戳。
    ///
    /// 若 `frame_id` 已被确认，或会套圈 present-wait 线程，则 panic。
    ///
    /// #### 参数
    /// - `frame_id`：开始的帧。
    /// - `at`：提交时间戳。
    pub fn register_frame_start_at(&self, frame_id: u64, at: Instant) {
        let confirmed = self.producer_index.load(Ordering::Acquire);
        assert!(
            frame_id > confirmed,
            "frame {frame_id} started after frame {confirmed} was confirmed"
        );
        self.assert_within_ring(frame_id, confirmed);

        self.last_started.fetch_max(frame_id, Ordering::Release);
        let slot = self.slot(frame_id);
        slot.frame_id.store(frame_id, Ordering::Relaxed);
        fence(Ordering::Release);
        slot.start_nanos
            .store(self.nanos_since_epoch(at), Ordering::Relaxed);
    }

    pub fn register_frame_end(&self, frame_id: u64) {
        self.register_frame_end_at(frame_id, Instant::now());
    }

    /// ### English
    /// Records `at` as the confirmation timestamp of `frame_id`, computes latency and frametime, and
    /// publishes the record to readers.
    ///
    /// Panics unless `frame_id` directly follows the last confirmed frame, was started, and started
    /// strictly before `at`.
    ///
    /// ### 中文
    /// 将 `at` 记录为 `frame_id` 的确认时间戳，计算延迟与帧间隔，并向读者发布该记录。
    ///
    /// 除非 `frame_id` 紧接最近确认的帧、已经开始、且开始时间严格早于 `at`，否则 panic。
    pub fn register_frame_end_at(&self, frame_id: u64, at: Instant) {
        let confirmed = self.producer_index.load(Ordering::Relaxed);
        assert_eq!(
            frame_id,
            confirmed + 1,
            "frame {frame_id} confirmed out of order (last confirmed {confirmed})"
        );

        let slot = self.slot(frame_id);
        assert_eq!(
            slot.frame_id.load(Ordering::Acquire),
            frame_id,
            "frame {frame_id} confirmed without a registered start"
        );

        let start_nanos = slot.start_nanos.load(Ordering::Relaxed);
        let end_nanos = self.nanos_since_epoch(at);
        assert!(
            start_nanos < end_nanos,
            "frame {frame_id} confirmed before it started"
        );

        let frametime_micros = if confirmed == 0 {
            0
        } else {
            let last_end_nanos = self.last_end_nanos.load(Ordering::Relaxed);
            nanos_to_micros(end_nanos.saturating_sub(last_end_nanos))
        };

        fence(Ordering::Release);
        slot.end_nanos.store(end_nanos, Ordering::Relaxed);
        slot.latency_micros
            .store(nanos_to_micros(end_nanos - start_nanos), Ordering::Relaxed);
        slot.frametime_micros
            .store(frametime_micros, Ordering::Relaxed);
        self.last_end_nanos.store(end_nanos, Ordering::Relaxed);

        self.producer_index.store(frame_id, Ordering::Release);
    }

    /// ### English
    /// Stores the confirmation parameters of `frame_id`, publishes them and wakes the present-wait
    /// thread.
    ///
    /// ### 中文
    /// 存入 `frame_id` 的确认参数、发布并唤醒 present-wait 线程。
    pub(crate) fn register_wait_for_present_params(
        &self,
        frame_id: u64,
        target: ConfirmationTarget,
    ) {
        let published = self.producer_params_index.load(Ordering::Relaxed);
        assert!(
            frame_id > published,
            "params for frame {frame_id} published after frame {published}"
        );
        let confirmed = self.producer_index.load(Ordering::Acquire);
        self.assert_within_ring(frame_id, confirmed);

        // SAFETY: single submission thread; the ring check above guarantees the present-wait
        // thread is not reading this slot (it only reads frames after `confirmed`).
        unsafe {
            *self.slot(frame_id).target.get() = Some(target);
        }

        self.producer_params_index
            .store(frame_id, Ordering::Release);
        self.params_signal.signal();
    }

    /// ### English
    /// Fetches the confirmation parameters of `frame_id` for the present-wait thread.
    ///
    /// Blocks on the params signal at most once. `None` means "not published yet": retry, or stop
    /// if shutdown was requested.
    ///
    /// ### 中文
    /// 为 present-wait 线程取出 `frame_id` 的确认参数。
    ///
    /// 最多在 params 信号上阻塞一次。`None` 表示“尚未发布”：重试，或在已请求关闭时退出。
    pub(crate) fn wait_for_present_params(&self, frame_id: u64) -> Option<ConfirmationTarget> {
        if frame_id > self.producer_params_index.load(Ordering::Acquire) {
            self.params_signal.wait();
        }
        if frame_id > self.producer_params_index.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the acquire load above observed the publish of `frame_id`; the submitter cannot
        // reuse this slot until `frame_id` is confirmed by this (the only consuming) thread.
        unsafe { (*self.slot(frame_id).target.get()).clone() }
    }

    /// ### English
    /// Wakes the present-wait thread without publishing anything (shutdown).
    ///
    /// ### 中文
    /// 不发布任何内容，仅唤醒 present-wait 线程（用于关闭）。
    pub fn signal_wait_for_present_params(&self) {
        self.params_signal.signal();
    }

    #[inline]
    fn slot(&self, frame_id: u64) -> &FrameSlot {
        &self.slots[(frame_id & self.mask) as usize]
    }

    #[inline]
    pub(super) fn load_record(&self, frame_id: u64) -> Option<FrameRecord> {
        self.slot(frame_id).load(frame_id, self.epoch)
    }

    #[inline]
    fn nanos_since_epoch(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    #[inline]
    fn assert_within_ring(&self, frame_id: u64, confirmed: u64) {
        assert!(
            frame_id - confirmed <= self.capacity(),
            "frame {frame_id} would overrun the stats ring (last confirmed {confirmed}, capacity {})",
            self.capacity()
        );
    }
}

#[inline]
fn nanos_to_micros(nanos: u64) -> u32 {
    u32::try_from(nanos / 1_000).unwrap_or(u32::MAX)
}
