use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::engine::backend::{
    ConfirmationWaiter, DeviceHandle, PresentOutcome, QueueHandle, Submitter, SurfaceHandle,
    WaitOutcome, WaitTimeout,
};
use crate::engine::present::PresentDescriptor;

use super::SIM_ERROR_MISSING_PRESENT_ID;

#[derive(Default)]
struct ManualState {
    submitted: Vec<u64>,
    confirmed: u64,
    submit_outcome: Option<PresentOutcome>,
    fail_wait_with: Option<i32>,
    wait_calls: u64,
}

/// ### English
/// Display whose confirmations are released explicitly with `confirm_through`.
///
/// Use `Arc<ManualDisplay>` both as the `Submitter` and as the `ConfirmationWaiter`.
///
/// ### 中文
/// 通过 `confirm_through` 显式放行确认的显示。
///
/// 将 `Arc<ManualDisplay>` 同时用作 `Submitter` 与 `ConfirmationWaiter`。
#[derive(Default)]
pub struct ManualDisplay {
    state: Mutex<ManualState>,
    changed: Condvar,
}

impl ManualDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// ### English
    /// Confirms every frame up to and including `frame_id`.
    ///
    /// ### 中文
    /// 确认 `frame_id`（含）之前的所有帧。
    pub fn confirm_through(&self, frame_id: u64) {
        let mut state = self.state.lock();
        state.confirmed = state.confirmed.max(frame_id);
        self.changed.notify_all();
    }

    pub fn confirmed(&self) -> u64 {
        self.state.lock().confirmed
    }

    /// ### English
    /// Present ids seen by `submit`, in order.
    ///
    /// ### 中文
    /// `submit` 收到的 present id（按顺序）。
    pub fn submitted(&self) -> Vec<u64> {
        self.state.lock().submitted.clone()
    }

    #[inline]
    pub fn last_submitted(&self) -> Option<u64> {
        self.state.lock().submitted.last().copied()
    }

    pub fn wait_calls(&self) -> u64 {
        self.state.lock().wait_calls
    }

    /// ### English
    /// Forces every following `submit` to return `outcome`.
    ///
    /// ### 中文
    /// 让之后的每次 `submit` 都返回 `outcome`。
    pub fn set_submit_outcome(&self, outcome: PresentOutcome) {
        self.state.lock().submit_outcome = Some(outcome);
    }

    /// ### English
    /// Makes every following confirmation wait fail with `code` (`None` restores normal waits).
    ///
    /// ### 中文
    /// 让之后的每次确认等待以 `code` 失败（`None` 恢复正常）。
    pub fn set_wait_failure(&self, code: Option<i32>) {
        let mut state = self.state.lock();
        state.fail_wait_with = code;
        self.changed.notify_all();
    }

    /// ### English
    /// Blocks until `submit` has seen `frame_id`, or `deadline` passes.
    ///
    /// ### 中文
    /// 阻塞直到 `submit` 收到 `frame_id`，或超过 `deadline`。
    pub fn wait_submitted(&self, frame_id: u64, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while !state.submitted.contains(&frame_id) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.submitted.contains(&frame_id);
            }
        }
        true
    }
}

impl Submitter for Arc<ManualDisplay> {
    fn submit(&mut self, _queue: QueueHandle, descriptor: &PresentDescriptor) -> PresentOutcome {
        let Some(present_id) = descriptor.present_id() else {
            return PresentOutcome(SIM_ERROR_MISSING_PRESENT_ID);
        };

        let mut state = self.state.lock();
        state.submitted.push(present_id);
        self.changed.notify_all();
        state.submit_outcome.unwrap_or(PresentOutcome::SUCCESS)
    }
}

impl ConfirmationWaiter for ManualDisplay {
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

        let mut state = self.state.lock();
        state.wait_calls += 1;
        loop {
            if let Some(code) = state.fail_wait_with {
                return WaitOutcome::Failed(code);
            }
            if state.confirmed >= frame_id {
                return WaitOutcome::Confirmed;
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        return if state.confirmed >= frame_id {
                            WaitOutcome::Confirmed
                        } else {
                            WaitOutcome::TimedOut
                        };
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
    }
}
