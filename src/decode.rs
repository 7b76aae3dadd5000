// 该文件是 Shanan （山南西风） 项目的一部分。
// src/decode.rs - 模型输出解码
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

//! 无锚框单阶段检测器的输出解码。
//!
//! 每个位置一行 `[cx, cy, w, h, score_0 .. score_{C-1}]`，坐标单位为模型输入像素。
//! 常见导出格式有两种：
//! - 行主序 `[1, rows, 4 + C]`
//! - 通道主序 `[1, 4 + C, rows]`，例如 `[1, 84, 8400]`

use tracing::{debug, error};

use crate::{error::PipelineError, model::RawDetection, tensor::Tensor};

const BOX_DIMS: usize = 4;

/// 仅用于限制内存的粗过滤阈值，远低于任何实际置信度阈值
pub const DECODE_MIN_SCORE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
  /// `[rows, 4 + C]`
  RowMajor,
  /// `[4 + C, rows]`
  ChannelMajor,
  /// 根据哪一维等于 `4 + C` 判断，两维都匹配时按行主序
  #[default]
  Auto,
}

#[derive(Debug, Clone)]
pub struct Decoder {
  num_classes: usize,
  layout: OutputLayout,
  min_score: f32,
}

impl Decoder {
  pub fn new(num_classes: usize) -> Self {
    Self {
      num_classes,
      layout: OutputLayout::Auto,
      min_score: DECODE_MIN_SCORE,
    }
  }

  pub fn layout(mut self, layout: OutputLayout) -> Self {
    self.layout = layout;
    self
  }

  /// 粗过滤阈值，应不高于后续的置信度阈值
  pub fn min_score(mut self, min_score: f32) -> Self {
    self.min_score = min_score;
    self
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn decode(&self, output: &Tensor) -> Result<Vec<RawDetection>, PipelineError> {
    if self.num_classes == 0 {
      error!("类别数量为 0，无法解码");
      return Err(PipelineError::malformed("类别数量为 0"));
    }

    let width = BOX_DIMS + self.num_classes;
    let (d0, d1) = matrix_dims(output)?;
    let (rows, transposed) = match self.layout {
      OutputLayout::RowMajor if d1 == width => (d0, false),
      OutputLayout::ChannelMajor if d0 == width => (d1, true),
      OutputLayout::Auto if d1 == width => (d0, false),
      OutputLayout::Auto if d0 == width => (d1, true),
      _ => {
        error!(
          "输出形状 {:?} 与类别数量 {} 不匹配 (布局 {:?})",
          output.shape(),
          self.num_classes,
          self.layout
        );
        return Err(PipelineError::malformed(format!(
          "输出形状 {:?} 的行宽不是 4 + {}",
          output.shape(),
          self.num_classes
        )));
      }
    };

    let data = output.data();
    let at = |row: usize, col: usize| -> f32 {
      if transposed {
        data[col * rows + row]
      } else {
        data[row * width + col]
      }
    };

    let mut detections = Vec::new();
    for row in 0..rows {
      // 取最大类别分数，并列时取编号最小者
      let mut confidence = f32::NEG_INFINITY;
      let mut class_id = 0usize;
      for c in 0..self.num_classes {
        let score = at(row, BOX_DIMS + c);
        if score > confidence {
          confidence = score;
          class_id = c;
        }
      }

      if confidence < self.min_score {
        continue;
      }

      detections.push(RawDetection {
        center_x: at(row, 0),
        center_y: at(row, 1),
        width: at(row, 2),
        height: at(row, 3),
        class_id,
        confidence,
      });
    }

    debug!("解码 {} 行，保留 {} 个候选框", rows, detections.len());
    Ok(detections)
  }
}

/// 去掉 batch 维后的二维形状
fn matrix_dims(output: &Tensor) -> Result<(usize, usize), PipelineError> {
  match *output.shape() {
    [rows, cols] | [1, rows, cols] => Ok((rows, cols)),
    _ => {
      error!("输出张量维度不受支持: {:?}", output.shape());
      Err(PipelineError::malformed(format!(
        "输出张量形状 {:?} 不是 [rows, cols] 或 [1, rows, cols]",
        output.shape()
      )))
    }
  }
}

/// 按行主序 `rows × (4 + num_classes)` 解码
pub fn decode(output: &Tensor, num_classes: usize) -> Result<Vec<RawDetection>, PipelineError> {
  Decoder::new(num_classes)
    .layout(OutputLayout::RowMajor)
    .decode(output)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tensor(shape: &[usize], data: &[f32]) -> Tensor {
    Tensor::new(shape.to_vec(), data.to_vec()).unwrap()
  }

  #[test]
  fn decodes_single_row() {
    let output = tensor(&[1, 1, 6], &[50.0, 50.0, 20.0, 20.0, 0.9, 0.1]);
    let detections = decode(&output, 2).unwrap();
    assert_eq!(
      detections,
      vec![RawDetection {
        center_x: 50.0,
        center_y: 50.0,
        width: 20.0,
        height: 20.0,
        class_id: 0,
        confidence: 0.9,
      }]
    );
  }

  #[test]
  fn argmax_ties_pick_lowest_class() {
    let output = tensor(&[1, 7], &[1.0, 1.0, 1.0, 1.0, 0.3, 0.7, 0.7]);
    let detections = decode(&output, 3).unwrap();
    assert_eq!(detections[0].class_id, 1);
    assert_eq!(detections[0].confidence, 0.7);
  }

  #[test]
  fn rejects_wrong_row_width() {
    let output = tensor(&[1, 2, 6], &[0.0; 12]);
    assert!(matches!(
      decode(&output, 3),
      Err(PipelineError::MalformedOutput(_))
    ));
  }

  #[test]
  fn rejects_unsupported_rank() {
    let output = tensor(&[2, 1, 6], &[0.0; 12]);
    assert!(matches!(
      decode(&output, 2),
      Err(PipelineError::MalformedOutput(_))
    ));
    let output = tensor(&[6], &[0.0; 6]);
    assert!(matches!(
      decode(&output, 2),
      Err(PipelineError::MalformedOutput(_))
    ));
  }

  #[test]
  fn rejects_zero_classes() {
    let output = tensor(&[1, 4], &[0.0; 4]);
    assert!(matches!(
      decode(&output, 0),
      Err(PipelineError::MalformedOutput(_))
    ));
  }

  #[test]
  fn drops_near_zero_rows_only() {
    let output = tensor(
      &[2, 6],
      &[
        10.0, 10.0, 4.0, 4.0, 0.0, 0.0, //
        20.0, 20.0, 4.0, 4.0, 0.0, 0.01,
      ],
    );
    let detections = decode(&output, 2).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_id, 1);
  }

  #[test]
  fn channel_major_matches_row_major() {
    let rows = [
      [50.0, 40.0, 20.0, 10.0, 0.2, 0.8],
      [10.0, 12.0, 4.0, 6.0, 0.6, 0.1],
      [70.0, 71.0, 8.0, 9.0, 0.3, 0.3],
    ];
    let row_major: Vec<f32> = rows.iter().flatten().copied().collect();
    let mut channel_major = vec![0.0; 18];
    for (r, row) in rows.iter().enumerate() {
      for (c, v) in row.iter().enumerate() {
        channel_major[c * 3 + r] = *v;
      }
    }

    let a = Decoder::new(2)
      .decode(&tensor(&[1, 3, 6], &row_major))
      .unwrap();
    let b = Decoder::new(2)
      .decode(&tensor(&[1, 6, 3], &channel_major))
      .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
  }

  #[test]
  fn explicit_layout_is_enforced() {
    let output = tensor(&[1, 6, 3], &[0.5; 18]);
    let result = Decoder::new(2)
      .layout(OutputLayout::RowMajor)
      .decode(&output);
    assert!(matches!(result, Err(PipelineError::MalformedOutput(_))));
  }
}
