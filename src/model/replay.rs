// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/replay.rs - 回放模型：返回预先录制的输出张量
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

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::Model,
  tensor::{Tensor, TensorError},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("录制文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("录制文件格式错误: {0}")]
  InvalidRecord(String),
  #[error("张量错误: {0}")]
  TensorError(#[from] TensorError),
  #[error("输入形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: Vec<usize>,
    actual: Vec<usize>,
  },
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

/// 不执行真实推理，每次调用都返回同一个录制好的输出张量。
///
/// 录制文件为 JSON：
///
/// ```json
/// { "input_shape": [1, 3, 640, 640], "shape": [1, 8400, 84], "data": [ ... ] }
/// ```
///
/// `input_shape` 可省略，省略时不校验输入形状。
#[derive(Debug, Clone)]
pub struct ReplayModel {
  input_shape: Option<Vec<usize>>,
  output: Tensor,
}

impl ReplayModel {
  pub fn new(input_shape: Option<Vec<usize>>, output: Tensor) -> Self {
    Self {
      input_shape,
      output,
    }
  }

  pub fn parse(text: &str) -> Result<Self, ReplayModelError> {
    let record: Value = serde_json::from_str(text)?;

    let input_shape = match record.get("input_shape") {
      None | Some(Value::Null) => None,
      Some(value) => Some(shape_of(value, "input_shape")?),
    };
    let shape = record
      .get("shape")
      .ok_or_else(|| ReplayModelError::InvalidRecord("缺少 shape 字段".to_string()))
      .and_then(|value| shape_of(value, "shape"))?;
    let data = record
      .get("data")
      .and_then(Value::as_array)
      .ok_or_else(|| ReplayModelError::InvalidRecord("缺少 data 数组".to_string()))?
      .iter()
      .map(|v| {
        v.as_f64()
          .map(|v| v as f32)
          .ok_or_else(|| ReplayModelError::InvalidRecord(format!("data 中存在非数值元素: {}", v)))
      })
      .collect::<Result<Vec<f32>, _>>()?;

    let output = Tensor::new(shape, data)?;
    debug!("回放输出形状: {:?}", output.shape());
    Ok(Self::new(input_shape, output))
  }

  pub fn from_file(path: &str) -> Result<Self, ReplayModelError> {
    info!("加载回放文件: {}", path);
    let text = std::fs::read_to_string(path)?;
    debug!(
      "回放文件大小: {:.2} MB",
      text.len() as f64 / (1024.0 * 1024.0)
    );
    let model = Self::parse(&text)?;
    info!("模型加载完成");
    Ok(model)
  }
}

fn shape_of(value: &Value, field: &str) -> Result<Vec<usize>, ReplayModelError> {
  value
    .as_array()
    .and_then(|dims| {
      dims
        .iter()
        .map(|d| d.as_u64().map(|d| d as usize))
        .collect::<Option<Vec<_>>>()
    })
    .ok_or_else(|| ReplayModelError::InvalidRecord(format!("{} 必须是非负整数数组", field)))
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Self::from_file(url.path())
  }
}

impl Model for ReplayModel {
  type Error = ReplayModelError;

  fn infer(&self, input: &Tensor) -> Result<Tensor, Self::Error> {
    if let Some(expected) = &self.input_shape
      && expected.as_slice() != input.shape()
    {
      error!(
        "预期模型输入形状为 {:?}, 实际为 {:?}",
        expected,
        input.shape()
      );
      return Err(ReplayModelError::InputShapeMismatch {
        expected: expected.clone(),
        actual: input.shape().to_vec(),
      });
    }

    debug!("回放模型输出");
    Ok(self.output.clone())
  }
}
