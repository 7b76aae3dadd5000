// 该文件是 Shanan （山南西风） 项目的一部分。
// src/geometry.rs - 边界框与坐标变换
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

/// 轴对齐矩形，左上角原点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由中心点和宽高构造
  pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
    Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width.max(0.0) * self.height.max(0.0)
  }

  pub fn intersection_area(&self, other: &BBox) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = self.right().min(other.right());
    let y2 = self.bottom().min(other.bottom());

    (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
  }

  /// 裁剪到 `[0, width] × [0, height]`
  pub fn clamp_to(&self, width: f32, height: f32) -> BBox {
    let x1 = self.x.clamp(0.0, width);
    let y1 = self.y.clamp(0.0, height);
    let x2 = self.right().clamp(0.0, width);
    let y2 = self.bottom().clamp(0.0, height);
    BBox::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
  }
}

/// 交并比。并集面积为 0 时定义为 0。
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let intersection = a.intersection_area(b);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// letterbox 变换参数：原图按 `scale` 等比缩放后放置在画布 `(pad_x, pad_y)` 处
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub original_width: u32,
  pub original_height: u32,
}

impl Letterbox {
  /// 不缩放、不填充的恒等变换
  pub fn identity(width: u32, height: u32) -> Self {
    Self {
      scale: 1.0,
      pad_x: 0.0,
      pad_y: 0.0,
      original_width: width,
      original_height: height,
    }
  }

  /// 原图坐标 → 模型输入坐标
  pub fn to_model(&self, bbox: &BBox) -> BBox {
    BBox::new(
      bbox.x * self.scale + self.pad_x,
      bbox.y * self.scale + self.pad_y,
      bbox.width * self.scale,
      bbox.height * self.scale,
    )
  }

  /// 模型输入坐标 → 原图坐标，不做裁剪
  pub fn to_original(&self, bbox: &BBox) -> BBox {
    BBox::new(
      (bbox.x - self.pad_x) / self.scale,
      (bbox.y - self.pad_y) / self.scale,
      bbox.width / self.scale,
      bbox.height / self.scale,
    )
  }

  /// 模型输入坐标 → 原图坐标，并裁剪到原图范围
  pub fn to_original_clamped(&self, bbox: &BBox) -> BBox {
    self
      .to_original(bbox)
      .clamp_to(self.original_width as f32, self.original_height as f32)
  }
}
