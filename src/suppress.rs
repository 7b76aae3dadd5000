// 该文件是 Shanan （山南西风） 项目的一部分。
// src/suppress.rs - 置信度过滤与分类别非极大值抑制
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

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
  geometry::{BBox, Letterbox, iou},
  model::{Detection, LabelTable, RawDetection},
};

#[derive(Debug, Clone)]
pub struct Suppressor {
  confidence_threshold: f32,
  iou_threshold: f32,
  max_detections: Option<usize>,
}

impl Suppressor {
  pub fn new(confidence_threshold: f32, iou_threshold: f32) -> Self {
    Self {
      confidence_threshold,
      iou_threshold,
      max_detections: None,
    }
  }

  /// 最终结果数量上限，`None` 表示不限制
  pub fn max_detections(mut self, max_detections: Option<usize>) -> Self {
    self.max_detections = max_detections;
    self
  }

  /// 过滤、分类别 NMS、映射回原图坐标。结果按置信度降序，并列时保持输入顺序。
  pub fn run(
    &self,
    raw: &[RawDetection],
    letterbox: &Letterbox,
    labels: &LabelTable,
  ) -> Vec<Detection> {
    // 按类别分组，组内保存原始下标
    let mut partitions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, det) in raw.iter().enumerate() {
      if det.confidence >= self.confidence_threshold {
        partitions.entry(det.class_id).or_default().push(idx);
      }
    }
    debug!(
      "置信度过滤: {} -> {} 个候选框, {} 个类别",
      raw.len(),
      partitions.values().map(Vec::len).sum::<usize>(),
      partitions.len()
    );

    let mut survivors = Vec::new();
    for indices in partitions.into_values() {
      survivors.extend(self.nms(raw, indices));
    }

    // 跨类别合并后按置信度降序，下标保证顺序确定
    survivors.sort_by(|&a, &b| {
      raw[b]
        .confidence
        .total_cmp(&raw[a].confidence)
        .then(a.cmp(&b))
    });
    if let Some(max) = self.max_detections {
      survivors.truncate(max);
    }
    debug!("NMS 后保留 {} 个目标", survivors.len());

    survivors
      .into_iter()
      .map(|idx| {
        let det = &raw[idx];
        let bbox = letterbox.to_original_clamped(&det.bbox());
        Detection {
          x: bbox.x,
          y: bbox.y,
          width: bbox.width,
          height: bbox.height,
          class_id: det.class_id,
          confidence: det.confidence,
          label: labels.label_of(det.class_id),
        }
      })
      .collect()
  }

  /// 单个类别内的贪心 NMS，返回保留框的原始下标
  fn nms(&self, raw: &[RawDetection], mut indices: Vec<usize>) -> Vec<usize> {
    indices.sort_by(|&a, &b| {
      raw[b]
        .confidence
        .total_cmp(&raw[a].confidence)
        .then(a.cmp(&b))
    });

    let mut kept: Vec<(usize, BBox)> = Vec::new();
    for idx in indices {
      let bbox = raw[idx].bbox();
      if kept
        .iter()
        .all(|(_, selected)| iou(selected, &bbox) < self.iou_threshold)
      {
        kept.push((idx, bbox));
      }
    }

    kept.into_iter().map(|(idx, _)| idx).collect()
  }
}

pub fn suppress(
  raw: &[RawDetection],
  confidence_threshold: f32,
  iou_threshold: f32,
  letterbox: &Letterbox,
  labels: &LabelTable,
) -> Vec<Detection> {
  Suppressor::new(confidence_threshold, iou_threshold).run(raw, letterbox, labels)
}
