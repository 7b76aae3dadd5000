// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use std::path::PathBuf;

use clap::Args;
use url::Url;

#[cfg(feature = "render")]
use crate::output::{Draw, FontLoadError};
use crate::{
  decode::OutputLayout,
  pipeline::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_TARGET_SIZE, PipelineConfig,
  },
};

/// 各个可执行程序共用的检测参数
#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
  /// 模型路径，例如 replay:///path/to/output.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，例如 image:///path/to/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，例如 image:///path/to/output.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 标签表：labels:rebar（单类别钢筋）、labels:coco 或 labels:///path/to/labels.txt
  #[arg(long, default_value = "labels:rebar", value_name = "LABELS")]
  pub labels: Url,

  /// 模型输入边长
  #[arg(
    long,
    default_value_t = DEFAULT_TARGET_SIZE,
    value_parser = clap::value_parser!(u32).range(1..),
    value_name = "PIXELS"
  )]
  pub target_size: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 最大检测数量，0 表示无限制
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_detections: usize,

  /// 模型输出为通道主序 [1, 4 + C, rows]，默认自动判断
  #[arg(long)]
  pub channel_major: bool,

  /// 标签字体文件（TTF/OTF），不指定时不绘制文字
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 以 JSON 格式将检测结果打印到标准输出
  #[arg(long)]
  pub json: bool,
}

impl DetectArgs {
  pub fn pipeline_config(&self) -> PipelineConfig {
    let layout = if self.channel_major {
      OutputLayout::ChannelMajor
    } else {
      OutputLayout::Auto
    };

    PipelineConfig::default()
      .with_target_size(self.target_size)
      .with_confidence_threshold(self.confidence)
      .with_iou_threshold(self.nms_threshold)
      .with_max_detections((self.max_detections > 0).then_some(self.max_detections))
      .with_output_layout(layout)
  }

  #[cfg(feature = "render")]
  pub fn draw(&self) -> Result<Draw, FontLoadError> {
    match &self.font {
      Some(path) => Draw::default().with_font_file(path),
      None => Ok(Draw::default()),
    }
  }
}

#[cfg(test)]
mod tests {
  use clap::Parser;

  use super::*;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(flatten)]
    detect: DetectArgs,
  }

  #[test]
  fn defaults_match_pipeline_defaults() {
    let cli = Cli::try_parse_from([
      "test",
      "--model",
      "replay:///tmp/out.json",
      "--input",
      "image:///tmp/in.png",
      "--output",
      "image:///tmp/out.png",
    ])
    .unwrap();
    let config = cli.detect.pipeline_config();
    assert_eq!(config.target_size, DEFAULT_TARGET_SIZE);
    assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
    assert_eq!(config.iou_threshold, DEFAULT_IOU_THRESHOLD);
    assert_eq!(config.max_detections, None);
    assert_eq!(config.output_layout, OutputLayout::Auto);
    assert_eq!(cli.detect.labels.as_str(), "labels:rebar");
    #[cfg(feature = "render")]
    assert!(!cli.detect.draw().unwrap().has_font());
  }

  #[test]
  fn max_detections_is_opt_in() {
    let cli = Cli::try_parse_from([
      "test",
      "--model",
      "replay:///tmp/out.json",
      "--input",
      "image:///tmp/in.png",
      "--output",
      "image:///tmp/out.png",
      "--max-detections",
      "300",
    ])
    .unwrap();
    assert_eq!(cli.detect.pipeline_config().max_detections, Some(300));
  }

  #[test]
  fn zero_target_size_is_rejected() {
    let result = Cli::try_parse_from([
      "test",
      "--model",
      "replay:///tmp/out.json",
      "--input",
      "image:///tmp/in.png",
      "--output",
      "image:///tmp/out.png",
      "--target-size",
      "0",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn zero_max_detections_means_unlimited() {
    let cli = Cli::try_parse_from([
      "test",
      "--model",
      "replay:///tmp/out.json",
      "--input",
      "image:///tmp/in.png",
      "--output",
      "image:///tmp/out.png",
      "--max-detections",
      "0",
      "--channel-major",
    ])
    .unwrap();
    let config = cli.detect.pipeline_config();
    assert_eq!(config.max_detections, None);
    assert_eq!(config.output_layout, OutputLayout::ChannelMajor);
  }

  #[test]
  fn invalid_url_is_rejected() {
    let result = Cli::try_parse_from(["test", "--model", "not a url", "--input", "x", "--output", "y"]);
    assert!(result.is_err());
  }
}
