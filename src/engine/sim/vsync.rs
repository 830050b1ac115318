use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::engine::backend::{
    ConfirmationWaiter, DeviceHandle, PresentOutcome, QueueHandle, Submitter, SurfaceHandle,
    WaitOutcome, WaitTimeout,
};
use crate::engine::present::PresentDescriptor;

use super::SIM_ERROR_MISSING_PRESENT_ID;

/// ### English
/// Scanout times kept for confirmation lookups; older frames count as displayed.
///
/// ### 中文
/// 为确认查询保留的扫描输出时间数量；更早的帧视为已显示。
const SCANOUT_HISTORY: usize = 4096;

struct VsyncState {
    /// ### English
    /// Frame id of `scanouts[0]`.
    ///
    /// ### 中文
    /// `scanouts[0]` 对应的帧 ID。
    first_id: u64,
    scanouts: VecDeque<Instant>,
}

impl VsyncState {
    fn scanout_of(&self, frame_id: u64) -> Option<Instant> {
        if frame_id < self.first_id {
            return self.scanouts.front().copied();
        }
        let index = usize::try_from(frame_id - self.first_id).ok()?;
        self.scanouts.get(index).copied()
    }
}

/// ### English
/// FIFO display with a fixed refresh interval: each frame scans out at the first vblank after it was
/// submitted and after the previous frame's vblank.
///
/// ### 中文
/// 固定刷新间隔的 FIFO 显示：每帧在提交之后、且晚于上一帧 vblank 的第一个 vblank 扫描输出。
pub struct VsyncDisplay {
    refresh: Duration,
    epoch: Instant,
    state: Mutex<VsyncState>,
    submitted: Condvar,
}

impl VsyncDisplay {
    pub fn new(refresh: Duration) -> Arc<Self> {
        Arc::new(Self {
            refresh: refresh.max(Duration::from_micros(1)),
            epoch: Instant::now(),
            state: Mutex::new(VsyncState {
                first_id: 1,
                scanouts: VecDeque::with_capacity(SCANOUT_HISTORY),
            }),
            submitted: Condvar::new(),
        })
    }

    pub fn from_hz(hz: f64) -> Arc<Self> {
        Self::new(Duration::from_secs_f64(1.0 / hz.max(1.0)))
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh
    }

    /// ### English
    /// First vblank at or after `at`.
    ///
    /// ### 中文
    /// `at` 及之后的第一个 vblank。
    fn next_vblank(&self, at: Instant) -> Instant {
        let since = at.saturating_duration_since(self.epoch).as_nanos();
        let refresh = self.refresh.as_nanos();
        let ticks = since.div_ceil(refresh);
        let nanos = u64::try_from(ticks * refresh).unwrap_or(u64::MAX);
        self.epoch + Duration::from_nanos(nanos)
    }
}

impl Submitter for Arc<VsyncDisplay> {
    fn submit(&mut self, _queue: QueueHandle, descriptor: &PresentDescriptor) -> PresentOutcome {
        let Some(present_id) = descriptor.present_id() else {
            return PresentOutcome(SIM_ERROR_MISSING_PRESENT_ID);
        };

        let mut state = self.state.lock();
        debug_assert_eq!(
            present_id,
            state.first_id + state.scanouts.len() as u64,
            "present ids must be sequential"
        );

        let mut scanout = self.next_vblank(Instant::now());
        if let Some(&previous) = state.scanouts.back() {
            scanout = scanout.max(previous + self.refresh);
        }
        if state.scanouts.len() == SCANOUT_HISTORY {
            state.scanouts.pop_front();
            state.first_id += 1;
        }
        state.scanouts.push_back(scanout);
        self.submitted.notify_all();

        PresentOutcome::SUCCESS
    }
}

impl ConfirmationWaiter for VsyncDisplay {
    fn wait_for_confirmation(
        &self,
        _device: DeviceHandle,
        _surface: SurfaceHandle,
        frame_id: u64,
        timeout: WaitTimeout,
    ) -> WaitOutcome {
        let deadline = match timeout {
            WaitTimeout::Bounded(timeout) => Some(Instant::now() + timeout),
            WaitTimeout::Infinite => None,
        };

        let scanout = {
            let mut state = self.state.lock();
            loop {
                if let Some(scanout) = state.scanout_of(frame_id) {
                    break scanout;
                }
                match deadline {
                    Some(deadline) => {
                        if self.submitted.wait_until(&mut state, deadline).timed_out() {
                            return WaitOutcome::TimedOut;
                        }
                    }
                    None => self.submitted.wait(&mut state),
                }
            }
        };

        let wake = deadline.map_or(scanout, |deadline| deadline.min(scanout));
        let now = Instant::now();
        if wake > now {
            thread::sleep(wake - now);
        }

        if Instant::now() >= scanout {
            WaitOutcome::Confirmed
        } else {
            WaitOutcome::TimedOut
        }
    }
}
