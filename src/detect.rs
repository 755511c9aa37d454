// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect.rs - 滑窗检测流程
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{ClassMap, DetectResult, Detection, Model};

pub mod config;
mod estimate;
mod mapper;
mod nms;
mod plan;
mod tile;

pub use self::config::{ScanConfig, StrideAxes};
pub use self::estimate::ScaleEstimate;
pub use self::mapper::map_candidates;
pub use self::nms::{non_max_suppression, overlap_ratio};
pub use self::plan::{CrossStridePlanner, Planner, ScanPlan, TileIter};
pub use self::tile::{Tile, normalize};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("输入无效: {0}")]
  InvalidInput(String),
  #[error("窗口无效: {0}")]
  InvalidTile(Tile),
  #[error("窗口 {tile} 推理失败: {source}")]
  DetectorFailure {
    tile: Tile,
    #[source]
    source: BoxError,
  },
}

#[derive(Error, Debug)]
#[error("模型输出长度不一致: 分数 {scores}, 框 {boxes}, 类别 {classes}")]
pub struct MalformedOutput {
  pub scores: usize,
  pub boxes: usize,
  pub classes: usize,
}

/// 滑窗检测器
///
/// 先在整图上推理一次估计目标尺度，再按 [`Planner`] 给出的窗口逐个推理，
/// 最后对所有窗口的结果做非极大值抑制。窗口严格按顺序处理。
pub struct SlidingWindowDetector<M, P = CrossStridePlanner> {
  model: M,
  planner: P,
  config: ScanConfig,
}

impl<M: Model> SlidingWindowDetector<M> {
  pub fn new(model: M, config: ScanConfig) -> Self {
    let planner = CrossStridePlanner::from(&config);
    Self {
      model,
      planner,
      config,
    }
  }
}

impl<M, P> SlidingWindowDetector<M, P>
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  P: Planner,
{
  /// 替换扫描规划
  pub fn with_planner<Q: Planner>(self, planner: Q) -> SlidingWindowDetector<M, Q> {
    SlidingWindowDetector {
      model: self.model,
      planner,
      config: self.config,
    }
  }

  pub fn config(&self) -> &ScanConfig {
    &self.config
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  pub fn detect(&self, image: &RgbImage, classes: &ClassMap) -> Result<DetectResult, DetectError> {
    let (width, height) = image.dimensions();
    self.validate(width, height, classes)?;
    info!("开始滑窗检测, 图像尺寸: {}x{}", width, height);

    let full = Tile::full(width, height);
    let initial = self.run_tile(image, &full, classes)?;
    let Some(estimate) = ScaleEstimate::from_detections(&initial) else {
      warn!("整图预估未检测到目标, 跳过滑窗扫描");
      return Ok(DetectResult::default());
    };
    info!(
      "整图预估检测到 {} 个目标, 平均尺寸: {}x{}",
      estimate.samples, estimate.mean_dx, estimate.mean_dy
    );

    let plan = self.planner.plan(&estimate);
    info!(
      "扫描计划: 窗口 {}, 水平步长 {}, 垂直步长 {}",
      plan.window, plan.stride_x, plan.stride_y
    );

    let mut candidates = Vec::new();
    let mut tiles_scanned = 0usize;
    for tile in plan.tiles(width, height) {
      let detections = self.run_tile(image, &tile, classes)?;
      debug!("窗口 {}: {} 个候选框", tile, detections.len());
      candidates.extend(detections);
      tiles_scanned += 1;
    }
    info!(
      "扫描 {} 个窗口, 共 {} 个候选框",
      tiles_scanned,
      candidates.len()
    );

    let items = non_max_suppression(candidates, self.config.overlap_threshold);
    info!("去重后剩余 {} 个目标", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      estimate: Some(estimate),
      plan: Some(plan),
      tiles_scanned,
    })
  }

  fn validate(&self, width: u32, height: u32, classes: &ClassMap) -> Result<(), DetectError> {
    self.config.validate().map_err(DetectError::InvalidInput)?;
    if width == 0 || height == 0 {
      return Err(DetectError::InvalidInput(format!(
        "图像尺寸 {}x{} 为空",
        width, height
      )));
    }
    if !classes.is_valid() {
      return Err(DetectError::InvalidInput(
        "类别映射为空或含有空名称".to_string(),
      ));
    }
    let (input_w, input_h) = self.model.input_size();
    if input_w == 0 || input_h == 0 {
      return Err(DetectError::InvalidInput(format!(
        "模型输入尺寸 {}x{} 为空",
        input_w, input_h
      )));
    }
    Ok(())
  }

  /// 单个窗口：归一化、推理、坐标映射
  fn run_tile(
    &self,
    image: &RgbImage,
    tile: &Tile,
    classes: &ClassMap,
  ) -> Result<Vec<Detection>, DetectError> {
    let (input_w, input_h) = self.model.input_size();
    let tensor = normalize(image, tile, input_w, input_h)?;

    let output = self
      .model
      .infer(&tensor)
      .map_err(|e| DetectError::DetectorFailure {
        tile: *tile,
        source: Box::new(e),
      })?;

    if !output.is_consistent() {
      return Err(DetectError::DetectorFailure {
        tile: *tile,
        source: Box::new(MalformedOutput {
          scores: output.scores.len(),
          boxes: output.boxes.len(),
          classes: output.classes.len(),
        }),
      });
    }

    Ok(map_candidates(&output, tile, self.config.cutoff, classes))
  }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};

  use image::Rgb;

  use super::*;
  use crate::{frame::NhwcTensor, model::RawOutput};

  #[derive(Error, Debug)]
  #[error("模拟推理失败")]
  struct MockError;

  /// 第 n 次调用返回 `script[n]`，超出部分返回空结果
  struct ScriptedModel {
    script: Vec<Result<RawOutput, ()>>,
    calls: Cell<usize>,
    shapes: RefCell<Vec<[usize; 4]>>,
  }

  impl ScriptedModel {
    fn new(script: Vec<Result<RawOutput, ()>>) -> Self {
      Self {
        script,
        calls: Cell::new(0),
        shapes: RefCell::new(Vec::new()),
      }
    }
  }

  impl Model for ScriptedModel {
    type Error = MockError;

    fn input_size(&self) -> (u32, u32) {
      (16, 16)
    }

    fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error> {
      let n = self.calls.get();
      self.calls.set(n + 1);
      self.shapes.borrow_mut().push(input.shape());
      match self.script.get(n) {
        Some(Ok(output)) => Ok(output.clone()),
        Some(Err(())) => Err(MockError),
        None => Ok(RawOutput::default()),
      }
    }
  }

  #[derive(Default)]
  struct CountingPlanner {
    calls: Cell<usize>,
  }

  impl Planner for CountingPlanner {
    fn plan(&self, estimate: &ScaleEstimate) -> ScanPlan {
      self.calls.set(self.calls.get() + 1);
      CrossStridePlanner::default().plan(estimate)
    }
  }

  fn one_box(score: f32, bbox: [f32; 4]) -> RawOutput {
    RawOutput::new(vec![score], vec![bbox], vec![0.0])
  }

  fn image() -> RgbImage {
    RgbImage::from_pixel(100, 100, Rgb([128, 128, 128]))
  }

  #[test]
  fn no_estimate_skips_planning() {
    let model = ScriptedModel::new(vec![Ok(one_box(0.3, [0.1, 0.1, 0.3, 0.3]))]);
    let planner = CountingPlanner::default();
    let detector =
      SlidingWindowDetector::new(&model, ScanConfig::default()).with_planner(&planner);

    let result = detector.detect(&image(), &ClassMap::default()).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.estimate, None);
    assert_eq!(planner.calls.get(), 0);
    assert_eq!(model.calls.get(), 1);
  }

  #[test]
  fn scans_planned_tiles_after_estimate() {
    let model = ScriptedModel::new(vec![Ok(one_box(0.9, [0.1, 0.1, 0.3, 0.3]))]);
    let planner = CountingPlanner::default();
    let detector =
      SlidingWindowDetector::new(&model, ScanConfig::default()).with_planner(&planner);

    let result = detector.detect(&image(), &ClassMap::default()).unwrap();
    assert_eq!(planner.calls.get(), 1);
    assert_eq!(
      result.estimate.map(|e| (e.mean_dx, e.mean_dy)),
      Some((20, 20))
    );
    assert_eq!(result.tiles_scanned, 25);
    assert_eq!(model.calls.get(), 26);
    // 整图预估的结果不进入最终输出
    assert!(result.is_empty());
    assert!(model.shapes.borrow().iter().all(|s| *s == [1, 16, 16, 3]));
  }

  #[test]
  fn detector_failure_aborts_run() {
    let model = ScriptedModel::new(vec![Ok(one_box(0.9, [0.1, 0.1, 0.3, 0.3])), Err(())]);
    let detector = SlidingWindowDetector::new(&model, ScanConfig::default());

    let err = detector.detect(&image(), &ClassMap::default()).unwrap_err();
    match err {
      DetectError::DetectorFailure { tile, .. } => assert_eq!((tile.x, tile.y), (0, 0)),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn malformed_output_is_a_detector_failure() {
    let malformed = RawOutput::new(vec![0.9, 0.8], vec![[0.0, 0.0, 0.5, 0.5]], vec![0.0]);
    let model = ScriptedModel::new(vec![Ok(malformed)]);
    let detector = SlidingWindowDetector::new(&model, ScanConfig::default());

    assert!(matches!(
      detector.detect(&image(), &ClassMap::default()),
      Err(DetectError::DetectorFailure { .. })
    ));
  }

  #[test]
  fn invalid_input_is_rejected_before_inference() {
    let model = ScriptedModel::new(Vec::new());

    let detector = SlidingWindowDetector::new(&model, ScanConfig::default().with_cutoff(0.0));
    assert!(matches!(
      detector.detect(&image(), &ClassMap::default()),
      Err(DetectError::InvalidInput(_))
    ));

    let detector = SlidingWindowDetector::new(&model, ScanConfig::default());
    assert!(matches!(
      detector.detect(&RgbImage::new(0, 10), &ClassMap::default()),
      Err(DetectError::InvalidInput(_))
    ));

    let empty: ClassMap = Vec::<(u32, String)>::new().into_iter().collect();
    assert!(matches!(
      detector.detect(&image(), &empty),
      Err(DetectError::InvalidInput(_))
    ));

    assert_eq!(model.calls.get(), 0);
  }
}
