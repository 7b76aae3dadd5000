// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::Detection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: u32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: u32 = 2;
const PALETTE_SIZE: usize = 80;

#[derive(Error, Debug)]
pub enum FontLoadError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 检测框绘制器。不持有字体时只绘制边框和标签底色。
#[derive(Debug, Clone)]
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  label_text_height: u32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  thickness: u32,
  text_color: [u8; 3],
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 按类别编号均匀取色相
    let colors = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      thickness: BOX_THICKNESS,
      text_color: [255, 255, 255],
      colors,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, FontLoadError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    Ok(self.with_font(font))
  }

  pub fn font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self.label_text_height = (font_size * 1.2).ceil() as u32;
    self.label_char_width = font_size * 0.55;
    self
  }

  pub fn thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn color_of(&self, class_id: usize) -> Rgb<u8> {
    self.colors[class_id % self.colors.len()]
  }

  /// 在原图副本上绘制检测结果，原图不被修改
  pub fn render(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    self.draw_detections(&mut canvas, detections);
    canvas
  }

  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }
    if self.font.is_none() && !detections.is_empty() {
      warn!("未加载字体，标签文字将不会绘制");
    }

    for detection in detections {
      self.draw_bbox_with_label(image, detection);
    }
    debug!("绘制 {} 个检测框", detections.len());
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let color = self.color_of(detection.class_id);

    let x_min = (detection.x.floor() as i32).clamp(0, w - 1);
    let y_min = (detection.y.floor() as i32).clamp(0, h - 1);
    let x_max = ((detection.x + detection.width).ceil() as i32).clamp(0, w - 1);
    let y_max = ((detection.y + detection.height).ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框由外向内加粗
    for t in 0..self.thickness as i32 {
      let box_w = x_max - x_min + 1 - 2 * t;
      let box_h = y_max - y_min + 1 - 2 * t;
      if box_w <= 0 || box_h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(box_w as u32, box_h as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = format!("{} {:.2}", detection.label, detection.confidence);
    let scale = PxScale::from(self.font_size);

    let (text_width, text_height) = match &self.font {
      Some(font) => {
        let (tw, th) = text_size(scale, font, &label);
        (tw, th.max(self.label_text_height))
      }
      None => (
        (label.chars().count() as f32 * self.label_char_width) as u32,
        self.label_text_height,
      ),
    };

    // 标签放在框上方，放不下时放在框内顶部
    let label_x = x_min;
    let label_y = if y_min >= text_height as i32 {
      y_min - text_height as i32
    } else {
      y_min
    };

    let label_width = text_width.min((w - label_x) as u32);
    let label_height = text_height.min((h - label_y) as u32);
    if label_width == 0 || label_height == 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
    draw_filled_rect_mut(image, rect, color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb(self.text_color),
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

/// 使用默认绘制器（无字体）渲染
pub fn render(image: &RgbImage, detections: &[Detection]) -> RgbImage {
  Draw::default().render(image, detections)
}
