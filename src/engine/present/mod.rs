//! ### English
//! Presenter: frame-id assignment, render-ahead throttling and ownership of the present-wait thread.
//!
//! ### 中文
//! Presenter：分配帧 ID、预渲染节流，并持有 present-wait 线程。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI8, AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::backend::{
    ConfirmationTarget, ConfirmationWaiter, DeviceHandle, PresentOutcome, QueueHandle, Submitter,
    WaitOutcome, WaitTimeout,
};
use crate::engine::error::PacerError;
use crate::engine::lockfree::Backoff;
use crate::engine::stats::{FrameStatsReader, FrameStatsStorage};

mod context;
mod descriptor;
mod worker;

pub use context::PacingContext;
pub use descriptor::{PresentDescriptor, PresentExtension, PresentIdTag};

use context::ContextClaim;

/// ### English
/// Paces presents against display confirmation and records per-frame latency.
///
/// Threading model:
/// - `present()` runs on the caller's submission thread. Concurrent calls are serialized on the
///   submitter lock, which is held for the whole present (throttle wait included).
/// - One dedicated present-wait thread confirms frames and writes completion timing.
/// - `set_render_ahead_limit()` and `reader()` may be called from any thread, also while a
///   `present()` is blocked.
///
/// Dropping the presenter stops and joins the present-wait thread, then releases the context.
///
/// ### 中文
/// 根据显示确认控制 present 节奏，并记录逐帧延迟。
///
/// 线程模型：
/// - `present()` 运行在调用方的提交线程；并发调用会在 submitter 锁上串行化，
///   该锁在整个 present（包括节流等待）期间持有。
/// - 一个独立的 present-wait 线程负责确认帧并写入完成时间。
/// - `set_render_ahead_limit()` 与 `reader()` 可在任意线程调用，包括某个 `present()` 阻塞期间。
///
/// drop 时会停止并 join present-wait 线程，然后释放 context。
pub struct Presenter<S: Submitter> {
    submitter: Mutex<S>,
    waiter: Arc<dyn ConfirmationWaiter>,
    /// ### English
    /// Id the next `present()` will use. Starts at 1, gapless.
    ///
    /// ### 中文
    /// 下一次 `present()` 使用的 ID；从 1 开始且无间隙。
    ///
    /// Only advanced while the submitter lock is held.
    next_frame_id: AtomicU64,
    render_ahead_limit: AtomicI8,
    throttle_timeout: WaitTimeout,
    storage: Arc<FrameStatsStorage>,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    _claim: ContextClaim,
}

impl<S: Submitter> Presenter<S> {
    /// ### English
    /// Claims `context`, allocates the stats ring and spawns the present-wait thread.
    ///
    /// #### Parameters
    /// - `context`: Pacing context; at most one presenter may hold it.
    /// - `submitter`: Backend present call.
    /// - `waiter`: Backend confirmation wait, shared with the present-wait thread.
    ///
    /// ### 中文
    /// 占用 `context`、分配统计 ring，并创建 present-wait 线程。
    ///
    /// #### 参数
    /// - `context`：pacing context；同一时间最多一个 presenter 持有。
    /// - `submitter`：后端 present 调用。
    /// - `waiter`：后端确认等待，与 present-wait 线程共享。
    pub fn new(
        context: &Arc<PacingContext>,
        submitter: S,
        waiter: Arc<dyn ConfirmationWaiter>,
    ) -> Result<Self, PacerError> {
        let claim = context.claim()?;
        let config = context.config();

        let storage = Arc::new(FrameStatsStorage::with_capacity(config.stats_capacity)?);
        storage.register_frame_start(1);

        let running = Arc::new(AtomicBool::new(true));
        let storage_for_thread = storage.clone();
        let running_for_thread = running.clone();
        let poll_timeout = config.confirm_poll_timeout();
        let worker = thread::Builder::new()
            .name("FramePacerPresentWait".to_string())
            .spawn(move || {
                worker::run_present_wait(storage_for_thread, running_for_thread, poll_timeout)
            })
            .map_err(PacerError::SpawnWorker)?;

        debug!(
            render_ahead_limit = config.render_ahead_limit,
            capacity = storage.capacity(),
            "presenter created"
        );

        Ok(Self {
            submitter: Mutex::new(submitter),
            waiter,
            next_frame_id: AtomicU64::new(1),
            render_ahead_limit: AtomicI8::new(config.render_ahead_limit),
            throttle_timeout: config.throttle_timeout().into(),
            storage,
            running,
            worker: Some(worker),
            _claim: claim,
        })
    }

    /// ### English
    /// Presents one frame.
    ///
    /// Tags the descriptor with the frame id, submits it, hands the confirmation parameters to the
    /// present-wait thread and, when throttling is enabled, blocks until frame
    /// `id - render_ahead_limit` is displayed. The backend outcome is returned unchanged.
    ///
    /// #### Parameters
    /// - `queue`: Queue to present on.
    /// - `descriptor`: Must target exactly one surface.
    /// - `device`: Device used later to wait for this frame's confirmation.
    ///
    /// ### 中文
    /// present 一帧。
    ///
    /// 为 descriptor 附加帧 ID 并提交，把确认参数交给 present-wait 线程；启用节流时阻塞直到
    /// `id - render_ahead_limit` 帧被显示。后端结果原样返回。
    ///
    /// #### 参数
    /// - `queue`：present 使用的队列。
    /// - `descriptor`：必须恰好指向一个 surface。
    /// - `device`：之后用于等待该帧确认的设备。
    pub fn present(
        &self,
        queue: QueueHandle,
        descriptor: &PresentDescriptor,
        device: DeviceHandle,
    ) -> Result<PresentOutcome, PacerError> {
        let surface = match descriptor.surfaces.as_slice() {
            [surface] => *surface,
            surfaces => return Err(PacerError::UnsupportedSurfaceCount(surfaces.len())),
        };

        let mut submitter = self.submitter.lock();
        let frame_id = self.next_frame_id.load(Ordering::Relaxed);
        let tagged = descriptor.tagged(frame_id);
        let outcome = submitter.submit(queue, &tagged);
        if !outcome.is_success() {
            debug!(frame_id, code = outcome.0, "backend present failed");
        }

        let target = ConfirmationTarget {
            device,
            surface,
            waiter: self.waiter.clone(),
        };
        self.storage
            .register_wait_for_present_params(frame_id, target.clone());

        if let Some(wait_id) = throttle_target(frame_id, self.render_ahead_limit()) {
            self.throttle(&target, wait_id);
        }

        let next_frame_id = frame_id + 1;
        self.wait_for_ring_space(next_frame_id);
        self.storage.register_frame_start(next_frame_id);
        self.next_frame_id.store(next_frame_id, Ordering::Relaxed);
        drop(submitter);

        Ok(outcome)
    }

    /// ### English
    /// Changes the render-ahead limit. Takes effect on the next `present()`.
    ///
    /// ### 中文
    /// 修改预渲染上限；在下一次 `present()` 生效。
    pub fn set_render_ahead_limit(&self, limit: i8) {
        self.render_ahead_limit.store(limit, Ordering::Relaxed);
    }

    #[inline]
    pub fn render_ahead_limit(&self) -> i8 {
        self.render_ahead_limit.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn next_frame_id(&self) -> u64 {
        self.next_frame_id.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn stats(&self) -> &Arc<FrameStatsStorage> {
        &self.storage
    }

    pub fn reader(&self) -> FrameStatsReader {
        self.storage.reader()
    }

    fn throttle(&self, target: &ConfirmationTarget, wait_id: u64) {
        match target.wait(wait_id, self.throttle_timeout) {
            WaitOutcome::Confirmed => {}
            WaitOutcome::TimedOut => {
                warn!(frame_id = wait_id, "render-ahead wait timed out, submitting anyway");
            }
            WaitOutcome::Failed(code) => {
                warn!(frame_id = wait_id, code, "render-ahead wait failed");
            }
        }
    }

    /// ### English
    /// Backs off until starting `frame_id` cannot lap the present-wait thread.
    ///
    /// The bound is `frame_id - confirmed < capacity`, one slot tighter than the storage's hard
    /// limit, so the newest confirmed record stays readable while the display stalls.
    ///
    /// Only reachable with throttling disabled (or a limit close to the ring capacity) while the
    /// display stalls.
    ///
    /// ### 中文
    /// 退避直到开始 `frame_id` 不会套圈 present-wait 线程。
    ///
    /// 上界为 `frame_id - confirmed < capacity`，比存储的硬上限少一个槽位，
    /// 使显示停滞时最新确认的记录仍可读取。
    ///
    /// 仅在关闭节流（或上限接近 ring 容量）且显示停滞时才会进入。
    fn wait_for_ring_space(&self, frame_id: u64) {
        let capacity = self.storage.capacity();
        if frame_id - self.storage.last_confirmed() < capacity {
            return;
        }

        let mut backoff = Backoff::new();
        let mut reported = false;
        while frame_id - self.storage.last_confirmed() >= capacity {
            assert!(
                self.worker.as_ref().is_some_and(|w| !w.is_finished()),
                "present-wait thread exited while frame {frame_id} waits for ring space"
            );
            if backoff.is_sleeping() && !reported {
                debug!(frame_id, capacity, "stats ring full, waiting for confirmations");
                reported = true;
            }
            backoff.snooze();
        }
    }
}

impl<S: Submitter> Drop for Presenter<S> {
    /// ### English
    /// Stops the present-wait thread: clear the flag, wake it unconditionally, join.
    ///
    /// ### 中文
    /// 停止 present-wait 线程：清除标记、无条件唤醒、join。
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.storage.signal_wait_for_present_params();

        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("present-wait thread panicked");
        }

        debug!(
            last_confirmed = self.storage.last_confirmed(),
            "presenter shut down"
        );
    }
}

/// ### English
/// Frame the present of `frame_id` must wait for, if any.
///
/// ### 中文
/// present `frame_id` 时需要等待的帧（若有）。
#[inline]
fn throttle_target(frame_id: u64, limit: i8) -> Option<u64> {
    let limit = u64::try_from(limit).ok()?;
    frame_id.checked_sub(limit).filter(|&id| id > 0)
}
