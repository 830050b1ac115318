//! ### English
//! Escalating backoff for submission-side waits on the present-wait thread.
//!
//! Spin briefly, then yield, then sleep: the gap being covered is a display confirmation, which can
//! take a whole refresh interval.
//!
//! ### 中文
//! 提交侧等待 present-wait 线程时使用的逐级退避。
//!
//! 先短暂自旋，再让出调度，最后休眠：需要覆盖的间隙是一次显示确认，可能长达一个刷新周期。

use std::thread;
use std::time::Duration;

/// ### English
/// Spin budget before switching to `yield_now()`.
///
/// ### 中文
/// 在切换到 `yield_now()` 之前允许的自旋次数预算。
const SPIN_LIMIT: u32 = 64;

/// ### English
/// Yield budget before switching to short sleeps.
///
/// ### 中文
/// 在切换到短休眠之前允许的让出次数预算。
const YIELD_LIMIT: u32 = SPIN_LIMIT + 64;

const SLEEP_STEP: Duration = Duration::from_micros(500);

pub(crate) struct Backoff {
    steps: u32,
}

impl Backoff {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { steps: 0 }
    }

    /// ### English
    /// Performs one backoff step.
    ///
    /// ### 中文
    /// 执行一次退避步骤。
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.steps < SPIN_LIMIT {
            std::hint::spin_loop();
        } else if self.steps < YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::sleep(SLEEP_STEP);
        }
        self.steps = self.steps.saturating_add(1);
    }

    #[inline]
    pub(crate) fn is_sleeping(&self) -> bool {
        self.steps >= YIELD_LIMIT
    }
}
