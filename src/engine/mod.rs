/// ### English
/// Pacer internals: stats ring, wake signal, presenter and the backend interfaces they drive.
///
/// ### 中文
/// 帧节奏器内部模块：统计 ring、唤醒信号、presenter 以及它们驱动的后端接口。
pub mod backend;
pub(crate) mod cache;
pub mod config;
pub mod error;
pub(crate) mod lockfree;
pub mod present;
pub mod signal;
pub mod sim;
pub mod stats;

pub use backend::{
    ConfirmationTarget, ConfirmationWaiter, DeviceHandle, PresentOutcome, QueueHandle, Submitter,
    SurfaceHandle, WaitOutcome, WaitTimeout,
};
pub use config::PacerConfig;
pub use error::PacerError;
pub use present::{PacingContext, PresentDescriptor, PresentExtension, PresentIdTag, Presenter};
pub use signal::Signal;
pub use stats::{FrameRecord, FrameStatsReader, FrameStatsStorage, LatencySummary};
