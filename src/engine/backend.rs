//! ### English
//! Interfaces to the presentation backend the pacer drives but does not implement.
//!
//! The backend owns the real present call and the real "wait until displayed" call. Feature
//! negotiation (present-id / present-wait support) happens before a presenter is created; the
//! pacer assumes confirmation support is active.
//!
//! ### 中文
//! 帧节奏器驱动但不实现的呈现后端接口。
//!
//! 后端负责真实的 present 调用与“等待显示完成”调用。特性协商（present-id / present-wait 支持）
//! 在创建 presenter 之前完成；节奏器假定确认机制已经启用。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::present::PresentDescriptor;

/// ### English
/// Opaque queue handle passed through to the backend.
///
/// ### 中文
/// 透传给后端的不透明队列句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueHandle(pub u64);

/// ### English
/// Opaque device/context handle passed through to the backend.
///
/// ### 中文
/// 透传给后端的不透明设备/上下文句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// ### English
/// Opaque presentation surface (swapchain) handle.
///
/// ### 中文
/// 不透明的呈现表面（swapchain）句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// ### English
/// Backend result code for a present, returned to the caller unchanged.
///
/// Non-negative codes are successes (suboptimal-style codes included), negative codes are errors.
///
/// ### 中文
/// 后端 present 的结果码，原样返回给调用方。
///
/// 非负值表示成功（包括 suboptimal 类的结果码），负值表示错误。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PresentOutcome(pub i32);

impl PresentOutcome {
    pub const SUCCESS: Self = Self(0);

    #[inline]
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }
}

/// ### English
/// Result of a confirmation wait.
///
/// ### 中文
/// 一次确认等待的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// ### English
    /// The frame has been displayed.
    ///
    /// ### 中文
    /// 该帧已显示。
    Confirmed,
    /// ### English
    /// The timeout elapsed first; the frame may still be confirmed later.
    ///
    /// ### 中文
    /// 超时先到；该帧之后仍可能被确认。
    TimedOut,
    /// ### English
    /// Backend error code (device lost, surface out of date, ...).
    ///
    /// ### 中文
    /// 后端错误码（设备丢失、surface 过期等）。
    Failed(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitTimeout {
    Bounded(Duration),
    Infinite,
}

impl WaitTimeout {
    /// ### English
    /// Nanosecond form used by C-style backends (`u64::MAX` means infinite).
    ///
    /// ### 中文
    /// C 风格后端使用的纳秒表示（`u64::MAX` 表示无限）。
    pub fn as_nanos(self) -> u64 {
        match self {
            Self::Bounded(timeout) => u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX),
            Self::Infinite => u64::MAX,
        }
    }
}

impl From<Option<Duration>> for WaitTimeout {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(Self::Infinite, Self::Bounded)
    }
}

/// ### English
/// Submits a frame for display. Called on the submission thread only.
///
/// ### 中文
/// 提交一帧用于显示；仅在提交线程调用。
pub trait Submitter {
    /// ### English
    /// Performs the backend present. The descriptor already carries the frame's present id.
    ///
    /// #### Parameters
    /// - `queue`: Queue the caller presents on.
    /// - `descriptor`: Present descriptor tagged with the frame id.
    ///
    /// ### 中文
    /// 执行后端 present；descriptor 中已带有该帧的 present id。
    ///
    /// #### 参数
    /// - `queue`：调用方使用的队列。
    /// - `descriptor`：已附带帧 ID 的 present 描述。
    fn submit(&mut self, queue: QueueHandle, descriptor: &PresentDescriptor) -> PresentOutcome;
}

/// ### English
/// Blocks until a frame is confirmed displayed. Called from both the submission thread (throttle)
/// and the present-wait thread, so it must be thread-safe.
///
/// ### 中文
/// 阻塞直到某帧被确认显示。提交线程（节流）与 present-wait 线程都会调用，因此必须线程安全。
pub trait ConfirmationWaiter: Send + Sync {
    fn wait_for_confirmation(
        &self,
        device: DeviceHandle,
        surface: SurfaceHandle,
        frame_id: u64,
        timeout: WaitTimeout,
    ) -> WaitOutcome;
}

/// ### English
/// Everything needed to wait for one frame's confirmation later.
///
/// Captured per frame at submission time: device, surface and waiter may change between presents.
///
/// ### 中文
/// 之后等待某帧确认所需的全部参数。
///
/// 在提交时按帧捕获：设备、surface 与 waiter 在不同 present 之间可能变化。
#[derive(Clone)]
pub struct ConfirmationTarget {
    pub device: DeviceHandle,
    pub surface: SurfaceHandle,
    pub waiter: Arc<dyn ConfirmationWaiter>,
}

impl ConfirmationTarget {
    #[inline]
    pub fn wait(&self, frame_id: u64, timeout: WaitTimeout) -> WaitOutcome {
        self.waiter
            .wait_for_confirmation(self.device, self.surface, frame_id, timeout)
    }
}

impl fmt::Debug for ConfirmationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationTarget")
            .field("device", &self.device)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}
