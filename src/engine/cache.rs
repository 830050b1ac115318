//! ### English
//! Cache-line padding helpers for the frame statistics publish points.
//!
//! ### 中文
//! 帧统计发布点使用的 cache line padding 工具。

/// ### English
/// The cache line size we optimize for (bytes).
///
/// ### 中文
/// 作为优化目标的 cache line 大小（字节）。
pub(crate) const CACHE_LINE_BYTES: usize = 64;

/// ### English
/// Returns the padding bytes needed after `bytes_used` to reach the next cache-line boundary.
///
/// Used together with `#[repr(C, align(64))]` so the submission-side and confirmation-side
/// indices never share a line.
///
/// #### Parameters
/// - `bytes_used`: Number of bytes already occupied by preceding fields.
///
/// ### 中文
/// 返回在 `bytes_used` 之后推进到下一个 cache line 边界所需的 padding 字节数。
///
/// 与 `#[repr(C, align(64))]` 配合使用，保证提交侧与确认侧的索引不共用同一 cache line。
///
/// #### 参数
/// - `bytes_used`：前置字段已占用的字节数。
#[inline]
pub(crate) const fn pad_to_cache_line(bytes_used: usize) -> usize {
    let rem = bytes_used % CACHE_LINE_BYTES;
    if rem == 0 { 0 } else { CACHE_LINE_BYTES - rem }
}

/// ### English
/// Padding after a single field of type `T`.
///
/// ### 中文
/// 单个 `T` 字段之后所需的 padding 字节数。
#[inline]
pub(crate) const fn pad_after<T>() -> usize {
    pad_to_cache_line(std::mem::size_of::<T>())
}
