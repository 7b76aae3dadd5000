// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/labels.rs - 类别标签表
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 单类别钢筋计数模型的标签
pub const REBAR_CLASSES: [&str; 1] = ["rebar"];

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件为空: {0}")]
  Empty(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按类别编号索引的只读标签表，克隆开销为一次引用计数
#[derive(Debug, Clone)]
pub struct LabelTable {
  labels: Arc<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  pub fn rebar() -> Self {
    Self::new(REBAR_CLASSES)
  }

  pub fn coco() -> Self {
    Self::new(COCO_CLASSES)
  }

  /// 每行一个标签，忽略空行与首尾空白
  pub fn parse(text: &str) -> Self {
    Self::new(text.lines().map(str::trim).filter(|line| !line.is_empty()))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelTableError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let table = Self::parse(&std::fs::read_to_string(path)?);
    if table.is_empty() {
      return Err(LabelTableError::Empty(path.display().to_string()));
    }
    debug!("标签数量: {}", table.len());
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  /// 超出范围的编号显示为 `class{id}`
  pub fn label_of(&self, class_id: usize) -> String {
    match self.get(class_id) {
      Some(label) => label.to_string(),
      None => format!("class{}", class_id),
    }
  }
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::rebar()
  }
}

impl FromUrlWithScheme for LabelTable {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelTable {
  type Error = LabelTableError;

  /// `labels:rebar`、`labels:coco` 使用内置表，`labels:///path/to/labels.txt` 读取文件
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LabelTableError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    match url.path() {
      "rebar" => Ok(Self::rebar()),
      "coco" => Ok(Self::coco()),
      path => Self::from_file(path),
    }
  }
}
