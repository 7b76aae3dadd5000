// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理基准测试
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_detect::{
  FromUrl, LabelTable, Pipeline,
  args::DetectArgs,
  input::ImageFileInput,
  model::ReplayModel,
  output::SaveImageFileOutput,
  task::{RepeatShotTask, Task},
};

/// 对同一张图像重复执行检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub detect: DetectArgs,

  /// 重复次数
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub repeat: usize,

  /// 统计平均耗时时跳过的预热次数
  #[arg(long, default_value = "2", value_name = "COUNT")]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let detect = &args.detect;

  info!("模型文件路径: {}", detect.model);
  info!("输入来源: {}", detect.input);
  info!("输出路径: {}", detect.output);

  let labels = LabelTable::from_url(&detect.labels)?;
  let model = ReplayModel::from_url(&detect.model)?;
  let input = ImageFileInput::from_url(&detect.input)?;
  let output = SaveImageFileOutput::from_url(&detect.output)?.with_draw(detect.draw()?);

  let pipeline = Pipeline::new(model, labels, detect.pipeline_config());
  let detections = RepeatShotTask::default()
    .with_repeat_times(args.repeat)
    .with_warmup(args.warmup)
    .run_task(input, &pipeline, &output)?;

  info!("检测到 {} 个物体", detections.len());

  Ok(())
}
