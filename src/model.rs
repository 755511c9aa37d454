// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/model.rs - 模型
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

use serde::Serialize;

use crate::frame::NhwcTensor;

/// 检测模型适配器
///
/// 输入为固定尺寸的归一化张量，输出为等长的分数、框、类别三组数组。
/// 实现者不保证可被多个线程并发调用。
pub trait Model {
  type Error;

  /// 模型要求的输入尺寸 `(宽, 高)`
  fn input_size(&self) -> (u32, u32);

  fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn input_size(&self) -> (u32, u32) {
    (**self).input_size()
  }

  fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error> {
    (**self).infer(input)
  }
}

/// 模型原始输出
///
/// `boxes` 中每一行为相对窗口归一化的 `[y_min, x_min, y_max, x_max]`。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
  pub scores: Box<[f32]>,
  pub boxes: Box<[[f32; 4]]>,
  pub classes: Box<[f32]>,
}

impl RawOutput {
  pub fn new(scores: Vec<f32>, boxes: Vec<[f32; 4]>, classes: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
      boxes: boxes.into_boxed_slice(),
      classes: classes.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  /// 三组数组长度一致
  pub fn is_consistent(&self) -> bool {
    self.scores.len() == self.boxes.len() && self.scores.len() == self.classes.len()
  }
}

/// 整图像素坐标下的边界框，`x_min <= x_max`，`y_min <= y_max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
  pub x_min: u32,
  pub y_min: u32,
  pub x_max: u32,
  pub y_max: u32,
}

impl BoundingBox {
  pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
    Self {
      x_min: x_min.min(x_max),
      y_min: y_min.min(y_max),
      x_max: x_min.max(x_max),
      y_max: y_min.max(y_max),
    }
  }

  pub fn width(&self) -> u32 {
    self.x_max - self.x_min
  }

  pub fn height(&self) -> u32 {
    self.y_max - self.y_min
  }

  /// 按像素计数（闭区间）的面积
  pub fn pixel_area(&self) -> u64 {
    (self.width() as u64 + 1) * (self.height() as u64 + 1)
  }

  /// 与另一个框相交部分的像素面积（闭区间），不相交时为 0
  pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
    let xx1 = self.x_min.max(other.x_min) as i64;
    let yy1 = self.y_min.max(other.y_min) as i64;
    let xx2 = self.x_max.min(other.x_max) as i64;
    let yy2 = self.y_max.min(other.y_max) as i64;

    let w = (xx2 - xx1 + 1).max(0) as u64;
    let h = (yy2 - yy1 + 1).max(0) as u64;
    w * h
  }
}

/// 检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub score: f32,
  pub label: String,
  pub bbox: BoundingBox,
}

/// 一次滑窗检测的完整结果
#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
  /// 整图预估得到的目标尺度，`None` 表示预估阶段没有检测到目标
  pub estimate: Option<crate::detect::ScaleEstimate>,
  pub plan: Option<crate::detect::ScanPlan>,
  pub tiles_scanned: usize,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

pub mod label;
pub use self::label::{ClassMap, UNKNOWN_LABEL};

#[cfg(feature = "backend_rknpu")]
mod rknpu_ssd;
#[cfg(feature = "backend_rknpu")]
pub use self::rknpu_ssd::{RknpuSsd, RknpuSsdBuilder, RknpuSsdError, SsdOutputIndex};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bbox_orders_corners() {
    let bbox = BoundingBox::new(30, 5, 10, 25);
    assert_eq!(bbox, BoundingBox::new(10, 5, 30, 25));
    assert_eq!(bbox.width(), 20);
    assert_eq!(bbox.pixel_area(), 21 * 21);
  }

  #[test]
  fn intersection_uses_inclusive_pixels() {
    let a = BoundingBox::new(0, 0, 9, 9);
    let b = BoundingBox::new(5, 5, 14, 14);
    assert_eq!(a.intersection_area(&b), 25);

    let touching = BoundingBox::new(9, 9, 20, 20);
    assert_eq!(a.intersection_area(&touching), 1);

    let apart = BoundingBox::new(11, 11, 20, 20);
    assert_eq!(a.intersection_area(&apart), 0);
  }

  #[test]
  fn raw_output_consistency() {
    let ok = RawOutput::new(vec![0.1], vec![[0.0; 4]], vec![1.0]);
    assert!(ok.is_consistent());
    let bad = RawOutput::new(vec![0.1, 0.2], vec![[0.0; 4]], vec![1.0]);
    assert!(!bad.is_consistent());
  }
}
