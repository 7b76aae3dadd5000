// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 检测流水线
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

//! 预处理 → 推理 → 解码 → 抑制 → 绘制，全部在调用线程上同步执行。
//!
//! 流水线本身不持有可变状态，对不同图像的并发调用是否安全取决于 [`Model`] 实现。

use image::RgbImage;
use tracing::{debug, info};

#[cfg(feature = "render")]
use crate::output::Draw;
use crate::{
  decode::{Decoder, OutputLayout},
  error::PipelineError,
  model::{Detection, LabelTable, Model},
  preprocess::Preprocessor,
  suppress::Suppressor,
  tensor::ChannelOrder,
};

pub const DEFAULT_TARGET_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub target_size: u32,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub max_detections: Option<usize>,
  pub channel_order: ChannelOrder,
  pub output_layout: OutputLayout,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      target_size: DEFAULT_TARGET_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      max_detections: None,
      channel_order: ChannelOrder::Nchw,
      output_layout: OutputLayout::Auto,
    }
  }
}

impl PipelineConfig {
  pub fn with_target_size(mut self, target_size: u32) -> Self {
    self.target_size = target_size;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  /// 结果数量上限，默认不限制
  pub fn with_max_detections(mut self, max_detections: Option<usize>) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
    self.channel_order = channel_order;
    self
  }

  pub fn with_output_layout(mut self, output_layout: OutputLayout) -> Self {
    self.output_layout = output_layout;
    self
  }
}

pub struct Pipeline<M> {
  model: M,
  labels: LabelTable,
  preprocessor: Preprocessor,
  decoder: Decoder,
  suppressor: Suppressor,
  #[cfg(feature = "render")]
  draw: Draw,
}

impl<M: Model> Pipeline<M> {
  pub fn new(model: M, labels: LabelTable, config: PipelineConfig) -> Self {
    info!(
      "创建检测流水线: 输入 {}x{}, 类别 {}, 置信度阈值 {}, NMS 阈值 {}",
      config.target_size,
      config.target_size,
      labels.len(),
      config.confidence_threshold,
      config.iou_threshold
    );

    let preprocessor = Preprocessor::new(config.target_size).channel_order(config.channel_order);
    let decoder = Decoder::new(labels.len())
      .layout(config.output_layout)
      .min_score(f32::min(
        crate::decode::DECODE_MIN_SCORE,
        config.confidence_threshold,
      ));
    let suppressor = Suppressor::new(config.confidence_threshold, config.iou_threshold)
      .max_detections(config.max_detections);

    Self {
      model,
      labels,
      preprocessor,
      decoder,
      suppressor,
      #[cfg(feature = "render")]
      draw: Draw::default(),
    }
  }

  #[cfg(feature = "render")]
  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  /// 对一张图像执行检测，结果按置信度降序
  pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
    let prepared = self.preprocessor.run(image)?;

    debug!("执行模型推理");
    let output = self
      .model
      .infer(&prepared.tensor)
      .map_err(PipelineError::inference)?;
    debug!("模型输出形状: {:?}", output.shape());

    let raw = self.decoder.decode(&output)?;
    let detections = self
      .suppressor
      .run(&raw, &prepared.letterbox, &self.labels);

    debug!("检测到 {} 个物体", detections.len());
    Ok(detections)
  }

  /// 在原图副本上绘制检测结果
  #[cfg(feature = "render")]
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    self.draw.render(image, detections)
  }
}
