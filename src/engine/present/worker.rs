//! ### English
//! Present-wait thread: confirms frames in order and records their completion.
//!
//! ### 中文
//! present-wait 线程：按顺序确认帧并记录其完成。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::engine::backend::{WaitOutcome, WaitTimeout};
use crate::engine::stats::FrameStatsStorage;

/// ### English
/// Present-wait thread main loop.
///
/// Two blocking points, both interruptible by shutdown:
/// - the params signal, woken by every publish and by the final shutdown signal;
/// - the backend confirmation wait, bounded by `poll_timeout` so `running` is re-checked.
///
/// #### Parameters
/// - `storage`: Stats ring shared with the submission thread.
/// - `running`: Cleared by the presenter on shutdown.
/// - `poll_timeout`: Bound for each backend confirmation wait.
///
/// ### 中文
/// present-wait 线程主循环。
///
/// 两个阻塞点，均可被关闭打断：
/// - params 信号：每次发布以及最后的关闭信号都会唤醒它；
/// - 后端确认等待：以 `poll_timeout` 为上限，以便重新检查 `running`。
///
/// #### 参数
/// - `storage`：与提交线程共享的统计 ring。
/// - `running`：关闭时由 presenter 清除。
/// - `poll_timeout`：每次后端确认等待的上限。
pub(super) fn run_present_wait(
    storage: Arc<FrameStatsStorage>,
    running: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    debug!(?poll_timeout, "present-wait thread started");

    let timeout = WaitTimeout::Bounded(poll_timeout);
    let mut pending: u64 = 1;

    while running.load(Ordering::Acquire) {
        let Some(target) = storage.wait_for_present_params(pending) else {
            continue;
        };

        match target.wait(pending, timeout) {
            WaitOutcome::Confirmed => {}
            WaitOutcome::TimedOut => {
                trace!(frame_id = pending, "confirmation wait timed out, retrying");
                continue;
            }
            WaitOutcome::Failed(code) => {
                warn!(
                    frame_id = pending,
                    code, "confirmation wait failed, recording frame as completed"
                );
            }
        }

        storage.register_frame_end(pending);
        pending += 1;
    }

    debug!(last_confirmed = pending - 1, "present-wait thread stopped");
}
