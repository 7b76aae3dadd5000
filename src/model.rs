// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use crate::{geometry::BBox, tensor::Tensor};

/// 推理引擎能力接口。
///
/// 实现方接收固定形状的输入张量，返回 `rows × (4 + num_classes)` 的输出张量；
/// 输入形状与模型声明不符时应返回错误。是否可并发调用由实现方自行说明。
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&self, input: &Tensor) -> Result<Tensor, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn infer(&self, input: &Tensor) -> Result<Tensor, Self::Error> {
    (**self).infer(input)
  }
}

/// 解码后、未过滤的候选框，坐标位于模型输入空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
  pub center_x: f32,
  pub center_y: f32,
  pub width: f32,
  pub height: f32,
  pub class_id: usize,
  pub confidence: f32,
}

impl RawDetection {
  pub fn bbox(&self) -> BBox {
    BBox::from_center(self.center_x, self.center_y, self.width, self.height)
  }
}

/// 最终检测结果，坐标位于原图空间，左上角原点
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub class_id: usize,
  pub confidence: f32,
  pub label: String,
}

impl Detection {
  pub fn bbox(&self) -> BBox {
    BBox::new(self.x, self.y, self.width, self.height)
  }
}

mod labels;
pub use self::labels::{COCO_CLASSES, LabelTable, LabelTableError, REBAR_CLASSES};

mod replay;
pub use self::replay::{ReplayModel, ReplayModelError};
