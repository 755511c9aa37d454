// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/estimate.rs - 目标尺度预估
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

use crate::model::Detection;

/// 整图预估得到的平均目标尺寸（像素），两者均不小于 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleEstimate {
  pub mean_dx: u32,
  pub mean_dy: u32,
  /// 参与估计的检测数量
  pub samples: usize,
}

impl ScaleEstimate {
  /// 由整图检测结果计算平均宽高，没有检测结果时返回 `None`
  pub fn from_detections(detections: &[Detection]) -> Option<Self> {
    if detections.is_empty() {
      return None;
    }

    let n = detections.len() as f64;
    let (sum_dx, sum_dy) = detections.iter().fold((0.0f64, 0.0f64), |(sx, sy), d| {
      (sx + d.bbox.width() as f64, sy + d.bbox.height() as f64)
    });

    // 截断为整数像素，并保证扫描步长至少为 1
    let mean_dx = ((sum_dx / n) as u32).max(1);
    let mean_dy = ((sum_dy / n) as u32).max(1);

    Some(Self {
      mean_dx,
      mean_dy,
      samples: detections.len(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn det(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Detection {
    Detection {
      score: 0.9,
      label: "a".to_string(),
      bbox: BoundingBox::new(x_min, y_min, x_max, y_max),
    }
  }

  #[test]
  fn no_detections_no_estimate() {
    assert_eq!(ScaleEstimate::from_detections(&[]), None);
  }

  #[test]
  fn means_are_truncated() {
    let estimate =
      ScaleEstimate::from_detections(&[det(10, 10, 30, 30), det(0, 0, 15, 40)]).unwrap();
    // dx: (20 + 15) / 2 = 17.5, dy: (20 + 40) / 2 = 30
    assert_eq!(estimate.mean_dx, 17);
    assert_eq!(estimate.mean_dy, 30);
    assert_eq!(estimate.samples, 2);
  }

  #[test]
  fn single_pixel_boxes_clamp_to_one() {
    let estimate = ScaleEstimate::from_detections(&[det(5, 5, 5, 5), det(7, 9, 7, 9)]).unwrap();
    assert_eq!(estimate.mean_dx, 1);
    assert_eq!(estimate.mean_dy, 1);
  }
}
