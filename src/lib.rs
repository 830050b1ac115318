//! ### English
//! `frame_pacer` crate root.
//!
//! Paces frame submission against display confirmation and records per-frame latency in a
//! lock-free ring that any number of telemetry readers can follow.
//! The Rust API lives under `engine` and is re-exported here; the C ABI is exported via `ffi`.
//!
//! ### 中文
//! `frame_pacer` 的 crate 根。
//!
//! 根据显示确认控制帧提交节奏，并把逐帧延迟记录到无锁 ring 中，供任意数量的遥测读者跟随。
//! Rust API 位于 `engine` 并在此重新导出；C ABI 通过 `ffi` 导出。
mod engine;
mod ffi;

pub use engine::config::{
    DEFAULT_CONFIRM_POLL_TIMEOUT, DEFAULT_RENDER_AHEAD_LIMIT, DEFAULT_STATS_CAPACITY,
};
pub use engine::sim;
pub use engine::{
    ConfirmationTarget, ConfirmationWaiter, DeviceHandle, FrameRecord, FrameStatsReader,
    FrameStatsStorage, LatencySummary, PacerConfig, PacerError, PacingContext, PresentDescriptor,
    PresentExtension, PresentIdTag, PresentOutcome, Presenter, QueueHandle, Signal, Submitter,
    SurfaceHandle, WaitOutcome, WaitTimeout,
};
pub use ffi::{
    FRAME_PACER_ERROR_INVALID_HANDLE, FRAME_PACER_ERROR_REJECTED, FRAME_PACER_WAIT_TIMEOUT,
    FramePacer, FramePacerCallbacks, FramePacerFrameStats, FramePacerReader, FramePacerSubmitFn,
    FramePacerWaitFn,
};
