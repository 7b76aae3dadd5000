// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 流水线集成测试
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

use image::{Rgb, RgbImage};
use shanan_detect::{
  FromUrl, LabelTable, Model, Pipeline, PipelineConfig, PipelineError,
  model::ReplayModel,
  tensor::Tensor,
};
use url::Url;

/// 校验输入形状并返回固定输出
struct StubModel {
  input_shape: [usize; 4],
  output: Tensor,
}

#[derive(Debug, thiserror::Error)]
#[error("输入形状不匹配: {0:?}")]
struct ShapeMismatch(Vec<usize>);

impl Model for StubModel {
  type Error = ShapeMismatch;

  fn infer(&self, input: &Tensor) -> Result<Tensor, Self::Error> {
    if input.shape() != &self.input_shape[..] {
      return Err(ShapeMismatch(input.shape().to_vec()));
    }
    Ok(self.output.clone())
  }
}

fn rows(rows: &[[f32; 6]]) -> Tensor {
  Tensor::new(
    vec![1, rows.len(), 6],
    rows.iter().flatten().copied().collect(),
  )
  .unwrap()
}

fn pipeline(output: Tensor, target_size: u32, confidence: f32) -> Pipeline<StubModel> {
  let size = target_size as usize;
  Pipeline::new(
    StubModel {
      input_shape: [1, 3, size, size],
      output,
    },
    LabelTable::new(["rebar", "bolt"]),
    PipelineConfig::default()
      .with_target_size(target_size)
      .with_confidence_threshold(confidence),
  )
}

#[test]
fn single_row_on_square_image() {
  let pipeline = pipeline(rows(&[[50.0, 50.0, 20.0, 20.0, 0.9, 0.1]]), 100, 0.5);
  let image = RgbImage::from_pixel(100, 100, Rgb([30, 30, 30]));
  let detections = pipeline.detect(&image).unwrap();

  assert_eq!(detections.len(), 1);
  let d = &detections[0];
  assert_eq!(d.class_id, 0);
  assert_eq!(d.label, "rebar");
  assert_eq!((d.x, d.y, d.width, d.height), (40.0, 40.0, 20.0, 20.0));
  assert_eq!(d.confidence, 0.9);
}

#[test]
fn overlapping_rows_collapse() {
  let pipeline = pipeline(
    rows(&[
      [50.0, 50.0, 20.0, 20.0, 0.6, 0.0],
      [51.0, 49.0, 20.0, 20.0, 0.8, 0.0],
      [10.0, 10.0, 6.0, 6.0, 0.0, 0.7],
    ]),
    100,
    0.25,
  );
  let image = RgbImage::new(100, 100);
  let detections = pipeline.detect(&image).unwrap();

  assert_eq!(detections.len(), 2);
  assert_eq!(detections[0].confidence, 0.8);
  assert_eq!(detections[0].x, 41.0);
  assert_eq!(detections[1].label, "bolt");
}

#[test]
fn everything_below_threshold_is_empty_success() {
  let pipeline = pipeline(
    rows(&[
      [50.0, 50.0, 20.0, 20.0, 0.1, 0.2],
      [20.0, 20.0, 5.0, 5.0, 0.3, 0.0],
    ]),
    100,
    0.5,
  );
  let detections = pipeline.detect(&RgbImage::new(100, 100)).unwrap();
  assert!(detections.is_empty());
}

#[test]
fn letterboxed_wide_image_maps_back() {
  // 400x200 缩放 0.25 放入 100x100，上下各填充 25
  let pipeline = pipeline(rows(&[[50.0, 50.0, 20.0, 10.0, 0.0, 0.95]]), 100, 0.25);
  let detections = pipeline.detect(&RgbImage::new(400, 200)).unwrap();

  assert_eq!(detections.len(), 1);
  let d = &detections[0];
  assert!((d.x - 160.0).abs() < 1e-3);
  assert!((d.y - 80.0).abs() < 1e-3);
  assert!((d.width - 80.0).abs() < 1e-3);
  assert!((d.height - 40.0).abs() < 1e-3);
}

#[test]
fn dense_scene_keeps_every_survivor_by_default() {
  // 20x20 网格，互不相交的 4x4 框共 400 个
  let grid: Vec<[f32; 6]> = (0..400)
    .map(|i| {
      let cx = 2.5 + 5.0 * (i % 20) as f32;
      let cy = 2.5 + 5.0 * (i / 20) as f32;
      [cx, cy, 4.0, 4.0, 0.9, 0.0]
    })
    .collect();
  let pipeline = pipeline(rows(&grid), 100, 0.25);
  let detections = pipeline.detect(&RgbImage::new(100, 100)).unwrap();
  assert_eq!(detections.len(), 400);
}

#[test]
fn zero_confidence_threshold_keeps_zero_score_rows() {
  let pipeline = pipeline(
    rows(&[
      [20.0, 20.0, 10.0, 10.0, 0.0, 0.0],
      [70.0, 70.0, 10.0, 10.0, 0.0, 0.5],
    ]),
    100,
    0.0,
  );
  let detections = pipeline.detect(&RgbImage::new(100, 100)).unwrap();

  assert_eq!(detections.len(), 2);
  assert_eq!(detections[0].label, "bolt");
  assert_eq!(detections[1].confidence, 0.0);
  assert_eq!(detections[1].class_id, 0);
  assert_eq!((detections[1].x, detections[1].y), (15.0, 15.0));
}

#[test]
fn single_class_rebar_output_with_default_labels() {
  // 通道主序 [1, 5, 3]
  let output = Tensor::new(
    vec![1, 5, 3],
    vec![
      10.0, 32.0, 54.0, //
      10.0, 32.0, 54.0, //
      8.0, 8.0, 8.0, //
      8.0, 8.0, 8.0, //
      0.9, 0.1, 0.7,
    ],
  )
  .unwrap();
  let pipeline = Pipeline::new(
    StubModel {
      input_shape: [1, 3, 64, 64],
      output,
    },
    LabelTable::default(),
    PipelineConfig::default().with_target_size(64),
  );
  let detections = pipeline.detect(&RgbImage::new(64, 64)).unwrap();

  assert_eq!(detections.len(), 2);
  assert!(detections.iter().all(|d| d.label == "rebar"));
  assert_eq!(detections[0].confidence, 0.9);
  assert_eq!(detections[1].confidence, 0.7);
}

#[test]
fn input_shape_mismatch_is_inference_error() {
  let output = rows(&[[50.0, 50.0, 20.0, 20.0, 0.9, 0.1]]);
  let pipeline = Pipeline::new(
    StubModel {
      input_shape: [1, 3, 640, 640],
      output,
    },
    LabelTable::new(["rebar", "bolt"]),
    PipelineConfig::default().with_target_size(320),
  );
  let err = pipeline.detect(&RgbImage::new(10, 10)).unwrap_err();
  assert!(matches!(err, PipelineError::Inference(_)));
}

#[test]
fn malformed_output_is_reported() {
  let output = Tensor::new(vec![1, 2, 7], vec![0.5; 14]).unwrap();
  let pipeline = pipeline(output, 32, 0.25);
  let err = pipeline.detect(&RgbImage::new(32, 32)).unwrap_err();
  assert!(matches!(err, PipelineError::MalformedOutput(_)));
}

#[test]
fn zero_area_image_is_invalid() {
  let pipeline = pipeline(rows(&[[0.0; 6]]), 32, 0.25);
  let err = pipeline.detect(&RgbImage::new(0, 0)).unwrap_err();
  assert!(matches!(
    err,
    PipelineError::InvalidImage {
      width: 0,
      height: 0
    }
  ));
}

#[test]
fn repeated_invocations_are_identical() {
  let pipeline = pipeline(
    rows(&[
      [50.0, 50.0, 20.0, 20.0, 0.6, 0.6],
      [52.0, 50.0, 20.0, 20.0, 0.6, 0.1],
      [80.0, 20.0, 10.0, 30.0, 0.2, 0.9],
      [20.0, 80.0, 30.0, 10.0, 0.7, 0.7],
    ]),
    100,
    0.25,
  );
  let image = RgbImage::from_pixel(120, 90, Rgb([5, 6, 7]));
  let first = pipeline.detect(&image).unwrap();
  let second = pipeline.detect(&image).unwrap();
  assert_eq!(first, second);
  assert!(!first.is_empty());
}

#[cfg(feature = "render")]
#[test]
fn annotate_leaves_source_untouched() {
  let pipeline = pipeline(rows(&[[50.0, 50.0, 40.0, 40.0, 0.9, 0.1]]), 100, 0.25);
  let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
  let before = image.clone();
  let detections = pipeline.detect(&image).unwrap();
  let annotated = pipeline.annotate(&image, &detections);

  assert_eq!(image, before);
  assert_ne!(annotated, image);
  assert_eq!(annotated.dimensions(), image.dimensions());
}

#[test]
fn replay_model_drives_channel_major_output() {
  // 通道主序 [1, 6, 2]：两行，第二行为 bolt
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("record.json");
  std::fs::write(
    &path,
    r#"{
      "input_shape": [1, 3, 64, 64],
      "shape": [1, 6, 2],
      "data": [
        16, 48,
        16, 48,
        8, 8,
        8, 8,
        0.9, 0.1,
        0.05, 0.8
      ]
    }"#,
  )
  .unwrap();
  let url = Url::parse(&format!("replay://{}", path.display())).unwrap();
  let model = ReplayModel::from_url(&url).unwrap();

  let pipeline = Pipeline::new(
    model,
    LabelTable::new(["rebar", "bolt"]),
    PipelineConfig::default().with_target_size(64),
  );
  let detections = pipeline.detect(&RgbImage::new(64, 64)).unwrap();

  assert_eq!(detections.len(), 2);
  assert_eq!(detections[0].label, "rebar");
  assert_eq!((detections[0].x, detections[0].y), (12.0, 12.0));
  assert_eq!(detections[1].label, "bolt");
  assert_eq!((detections[1].x, detections[1].y), (44.0, 44.0));
}
