//! ### English
//! Present descriptor and its extension chain.
//!
//! ### 中文
//! present 描述及其扩展链。

use crate::engine::backend::SurfaceHandle;

/// ### English
/// Present-id tag: associates each presented surface with a frame id the backend can later confirm.
///
/// ### 中文
/// present-id 标记：为每个被 present 的 surface 关联一个后端之后可以确认的帧 ID。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresentIdTag {
    pub present_ids: Vec<u64>,
}

/// ### English
/// One entry of the descriptor's extension chain.
///
/// ### 中文
/// descriptor 扩展链中的一项。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentExtension {
    PresentId(PresentIdTag),
    /// ### English
    /// Any other chained structure; carried to the backend untouched.
    ///
    /// ### 中文
    /// 其它任意链式结构；原样传递给后端。
    Opaque { kind: u32, payload: Vec<u8> },
}

/// ### English
/// Backend-neutral description of one present call.
///
/// ### 中文
/// 与后端无关的一次 present 调用描述。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresentDescriptor {
    pub wait_semaphores: Vec<u64>,
    pub surfaces: Vec<SurfaceHandle>,
    pub image_indices: Vec<u32>,
    pub extensions: Vec<PresentExtension>,
}

impl PresentDescriptor {
    /// ### English
    /// Descriptor presenting `image_index` on a single surface.
    ///
    /// ### 中文
    /// 在单个 surface 上 present `image_index` 的描述。
    pub fn single(surface: SurfaceHandle, image_index: u32) -> Self {
        Self {
            surfaces: vec![surface],
            image_indices: vec![image_index],
            ..Self::default()
        }
    }

    /// ### English
    /// Present id of the first surface, if the chain carries a present-id tag.
    ///
    /// ### 中文
    /// 若扩展链带有 present-id 标记，返回第一个 surface 的 present id。
    pub fn present_id(&self) -> Option<u64> {
        self.extensions.iter().find_map(|ext| match ext {
            PresentExtension::PresentId(tag) => tag.present_ids.first().copied(),
            PresentExtension::Opaque { .. } => None,
        })
    }

    /// ### English
    /// Returns a copy tagged with `frame_id`.
    ///
    /// A present-id tag already in the chain is reused (its ids replaced); otherwise a new tag is
    /// inserted at the head of the chain. Other extensions keep their order.
    ///
    /// ### 中文
    /// 返回附带 `frame_id` 标记的副本。
    ///
    /// 若扩展链中已有 present-id 标记则复用（替换其 ID）；否则在链头插入新标记。
    /// 其它扩展保持原有顺序。
    pub(crate) fn tagged(&self, frame_id: u64) -> Self {
        let mut tagged = self.clone();

        let existing = tagged.extensions.iter_mut().find_map(|ext| match ext {
            PresentExtension::PresentId(tag) => Some(tag),
            PresentExtension::Opaque { .. } => None,
        });

        match existing {
            Some(tag) => {
                tag.present_ids.clear();
                tag.present_ids.push(frame_id);
            }
            None => tagged.extensions.insert(
                0,
                PresentExtension::PresentId(PresentIdTag {
                    present_ids: vec![frame_id],
                }),
            ),
        }

        tagged
    }
}
