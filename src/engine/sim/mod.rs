//! ### English
//! In-process display backends for tests, demos and the simulator binary.
//!
//! - `ManualDisplay`: frames are confirmed only when the caller says so.
//! - `VsyncDisplay`: frames scan out on a fixed refresh grid, one per vblank.
//!
//! ### 中文
//! 进程内的显示后端，用于测试、演示与模拟器二进制。
//!
//! - `ManualDisplay`：只有在调用方指示时才确认帧。
//! - `VsyncDisplay`：帧按固定刷新网格扫描输出，每个 vblank 一帧。
mod manual;
mod vsync;

pub use manual::ManualDisplay;
pub use vsync::VsyncDisplay;

/// ### English
/// Present outcome returned by the simulated displays when the descriptor carries no present id.
///
/// ### 中文
/// descriptor 未携带 present id 时模拟显示返回的 present 结果。
pub const SIM_ERROR_MISSING_PRESENT_ID: i32 = -1;
