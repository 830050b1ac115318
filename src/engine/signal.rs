//! ### English
//! Binary wake signal for one-to-one handoff between the submission thread and the
//! confirmation-wait thread.
//!
//! ### 中文
//! 提交线程与确认等待线程之间一对一交接使用的二值唤醒信号。

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

/// ### English
/// Binary semaphore: a `signal()` with no waiter is remembered, repeated signals coalesce into one.
///
/// Backed by a capacity-one channel. Both ends live inside the signal, so the channel can never
/// disconnect while the signal exists.
///
/// Intended for a single logical waiter.
///
/// ### 中文
/// 二值信号量：没有等待者时 `signal()` 会被记住，多次 signal 合并为一次。
///
/// 底层为容量为 1 的 channel；两端都由本结构持有，因此在信号存活期间 channel 不会断开。
///
/// 仅面向单个逻辑等待者。
pub struct Signal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self { tx, rx }
    }

    /// ### English
    /// Marks the condition true and wakes the waiter (or leaves the signal pending).
    ///
    /// ### 中文
    /// 将条件置为真并唤醒等待者（若无等待者则保持挂起状态）。
    #[inline]
    pub fn signal(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => unreachable!("signal owns its receiver"),
        }
    }

    /// ### English
    /// Blocks until signaled, then consumes the signal.
    ///
    /// ### 中文
    /// 阻塞直到被 signal，然后消费该信号。
    pub fn wait(&self) {
        if self.rx.recv().is_err() {
            unreachable!("signal owns its sender");
        }
    }

    /// ### English
    /// Consumes a pending signal without blocking. Returns `true` if one was pending.
    ///
    /// ### 中文
    /// 非阻塞地消费挂起的信号；若存在挂起信号则返回 `true`。
    pub fn try_take(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => unreachable!("signal owns its sender"),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
