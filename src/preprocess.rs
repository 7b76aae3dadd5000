// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess.rs - letterbox 预处理
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

use image::{Rgb, RgbImage, imageops::FilterType};
use tracing::{debug, error};

use crate::{
  error::PipelineError,
  geometry::Letterbox,
  tensor::{ChannelOrder, Tensor},
};

const RGB_CHANNELS: usize = 3;

/// 填充区域颜色（中灰）
pub const PAD_COLOR: [u8; 3] = [114, 114, 114];

/// 预处理结果：模型输入张量 + 逆变换所需参数
#[derive(Debug, Clone)]
pub struct PreprocessResult {
  pub tensor: Tensor,
  pub letterbox: Letterbox,
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
  target_size: u32,
  pad_color: [u8; 3],
  channel_order: ChannelOrder,
  filter: FilterType,
}

impl Preprocessor {
  pub fn new(target_size: u32) -> Self {
    Self {
      target_size,
      pad_color: PAD_COLOR,
      channel_order: ChannelOrder::Nchw,
      filter: FilterType::Triangle,
    }
  }

  pub fn pad_color(mut self, pad_color: [u8; 3]) -> Self {
    self.pad_color = pad_color;
    self
  }

  pub fn channel_order(mut self, channel_order: ChannelOrder) -> Self {
    self.channel_order = channel_order;
    self
  }

  pub fn filter(mut self, filter: FilterType) -> Self {
    self.filter = filter;
    self
  }

  pub fn target_size(&self) -> u32 {
    self.target_size
  }

  /// 输入张量形状，`[1, 3, S, S]` 或 `[1, S, S, 3]`
  pub fn input_shape(&self) -> [usize; 4] {
    let size = self.target_size as usize;
    match self.channel_order {
      ChannelOrder::Nchw => [1, RGB_CHANNELS, size, size],
      ChannelOrder::Nhwc => [1, size, size, RGB_CHANNELS],
    }
  }

  pub fn run(&self, image: &RgbImage) -> Result<PreprocessResult, PipelineError> {
    if self.target_size == 0 {
      error!("模型输入边长不能为 0");
      return Err(PipelineError::InvalidTargetSize(self.target_size));
    }

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      error!("输入图像尺寸无效: {}x{}", width, height);
      return Err(PipelineError::InvalidImage { width, height });
    }

    let target = self.target_size;
    let scale = f32::min(
      target as f32 / width as f32,
      target as f32 / height as f32,
    );

    // 缩放后的尺寸落在 [1, target] 内
    let resized_w = ((width as f32 * scale).round() as u32).clamp(1, target);
    let resized_h = ((height as f32 * scale).round() as u32).clamp(1, target);
    let pad_x = (target - resized_w) / 2;
    let pad_y = (target - resized_h) / 2;

    debug!(
      "letterbox: {}x{} -> {}x{}, 缩放 {:.4}, 填充 ({}, {})",
      width, height, resized_w, resized_h, scale, pad_x, pad_y
    );

    let mut canvas = RgbImage::from_pixel(target, target, Rgb(self.pad_color));
    if resized_w == width && resized_h == height {
      image::imageops::replace(&mut canvas, image, pad_x as i64, pad_y as i64);
    } else {
      let resized = image::imageops::resize(image, resized_w, resized_h, self.filter);
      image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);
    }

    let tensor = self.normalize(&canvas)?;

    Ok(PreprocessResult {
      tensor,
      letterbox: Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        original_width: width,
        original_height: height,
      },
    })
  }

  /// 像素值归一化到 [0, 1]，并按通道顺序排列
  fn normalize(&self, canvas: &RgbImage) -> Result<Tensor, PipelineError> {
    let size = self.target_size as usize;
    let plane_size = size * size;
    let mut tensor = Tensor::zeros(self.input_shape()).map_err(|err| {
      error!("无法分配模型输入张量: {}", err);
      PipelineError::InvalidTargetSize(self.target_size)
    })?;
    let slice = tensor.as_mut();

    for (x, y, pixel) in canvas.enumerate_pixels() {
      let idx = (y as usize) * size + (x as usize);
      for c in 0..RGB_CHANNELS {
        let value = pixel[c] as f32 / 255.0;
        match self.channel_order {
          ChannelOrder::Nchw => slice[c * plane_size + idx] = value,
          ChannelOrder::Nhwc => slice[idx * RGB_CHANNELS + c] = value,
        }
      }
    }

    Ok(tensor)
  }
}

/// 使用默认参数（灰色填充、NCHW）进行 letterbox 预处理
pub fn preprocess(image: &RgbImage, target_size: u32) -> Result<PreprocessResult, PipelineError> {
  Preprocessor::new(target_size).run(image)
}
