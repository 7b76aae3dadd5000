// 该文件是 Shanan （山南西风） 项目的一部分。
// src/error.rs - 流水线错误定义
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

use thiserror::Error;

/// 单次检测请求的失败原因，均不可重试。
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("输入图像无效: 尺寸 {width}x{height}")]
  InvalidImage { width: u32, height: u32 },
  #[error("模型输入边长无效: {0}")]
  InvalidTargetSize(u32),
  #[error("推理失败: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
  #[error("模型输出格式错误: {0}")]
  MalformedOutput(String),
}

impl PipelineError {
  pub fn inference<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    PipelineError::Inference(Box::new(err))
  }

  pub fn malformed(msg: impl Into<String>) -> Self {
    PipelineError::MalformedOutput(msg.into())
  }
}
