// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/nms.rs - 非极大值抑制
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

use std::cmp::Ordering;

use tracing::debug;

use crate::model::{BoundingBox, Detection};

/// `other` 被 `keep` 覆盖的比例：交集面积 / `other` 自身面积
///
/// 不是 IoU，分母只取被比较框的面积，因此嵌在大框中的小框更容易被抑制。
pub fn overlap_ratio(keep: &BoundingBox, other: &BoundingBox) -> f32 {
  keep.intersection_area(other) as f32 / other.pixel_area() as f32
}

/// 贪心非极大值抑制
///
/// 每次取剩余候选中分数最高者保留，并丢弃所有与它重叠率严格大于
/// `threshold` 的候选。不区分类别，保留的候选按输入顺序返回。
pub fn non_max_suppression(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
  if detections.is_empty() {
    return Vec::new();
  }

  // 按分数升序排列的下标，末尾为当前最高分
  let mut idxs: Vec<usize> = (0..detections.len()).collect();
  idxs.sort_by(|&a, &b| {
    detections[a]
      .score
      .partial_cmp(&detections[b].score)
      .unwrap_or(Ordering::Equal)
  });

  let mut keep = vec![false; detections.len()];
  while let Some(i) = idxs.pop() {
    keep[i] = true;
    let best = detections[i].bbox;
    idxs.retain(|&j| overlap_ratio(&best, &detections[j].bbox) <= threshold);
  }

  let before = detections.len();
  let kept: Vec<Detection> = detections
    .into_iter()
    .zip(keep)
    .filter_map(|(det, keep)| keep.then_some(det))
    .collect();
  debug!("非极大值抑制: {} -> {}", before, kept.len());
  kept
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(score: f32, x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Detection {
    Detection {
      score,
      label: "a".to_string(),
      bbox: BoundingBox::new(x_min, y_min, x_max, y_max),
    }
  }

  fn sorted(mut items: Vec<Detection>) -> Vec<Detection> {
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    items
  }

  #[test]
  fn empty_input() {
    assert!(non_max_suppression(Vec::new(), 0.5).is_empty());
  }

  #[test]
  fn suppresses_heavily_covered_lower_score() {
    // 低分框 10x10 像素，其中 60 像素被高分框覆盖
    let high = det(0.9, 0, 0, 19, 5);
    let low = det(0.4, 10, 0, 19, 9);
    assert!((overlap_ratio(&high.bbox, &low.bbox) - 0.6).abs() < 1e-6);

    let kept = non_max_suppression(vec![low, high.clone()], 0.5);
    assert_eq!(kept, vec![high]);
  }

  #[test]
  fn keeps_lightly_overlapping_boxes() {
    let a = det(0.9, 0, 0, 19, 2);
    let b = det(0.4, 10, 0, 19, 9);
    assert!((overlap_ratio(&a.bbox, &b.bbox) - 0.3).abs() < 1e-6);

    let kept = non_max_suppression(vec![a.clone(), b.clone()], 0.5);
    assert_eq!(sorted(kept), vec![a, b]);
  }

  #[test]
  fn ratio_is_relative_to_the_other_box() {
    let big = det(0.9, 0, 0, 99, 99);
    let small = det(0.8, 10, 10, 19, 19);
    // 小框被完全包含，大框只被覆盖 1%
    assert_eq!(overlap_ratio(&big.bbox, &small.bbox), 1.0);
    assert!(overlap_ratio(&small.bbox, &big.bbox) < 0.02);

    let kept = non_max_suppression(vec![small, big.clone()], 0.5);
    assert_eq!(kept, vec![big.clone()]);

    // 小框分数更高时两者都保留
    let small = det(0.95, 10, 10, 19, 19);
    let kept = non_max_suppression(vec![small.clone(), big.clone()], 0.5);
    assert_eq!(sorted(kept), vec![small, big]);
  }

  #[test]
  fn equal_to_threshold_is_kept() {
    let a = det(0.9, 0, 0, 9, 4);
    let b = det(0.5, 0, 0, 9, 9);
    assert_eq!(overlap_ratio(&a.bbox, &b.bbox), 0.5);
    assert_eq!(non_max_suppression(vec![a, b], 0.5).len(), 2);
  }

  #[test]
  fn idempotent_subset_without_fabrication() {
    let input = vec![
      det(0.91, 0, 0, 30, 30),
      det(0.85, 2, 2, 31, 29),
      det(0.60, 25, 25, 60, 60),
      det(0.72, 40, 40, 70, 70),
      det(0.55, 100, 0, 120, 10),
      det(0.99, 101, 1, 119, 9),
      det(0.30, 5, 5, 8, 8),
    ];

    let once = non_max_suppression(input.clone(), 0.5);
    assert!(once.len() <= input.len());
    assert!(once.iter().all(|d| input.contains(d)));

    let twice = non_max_suppression(once.clone(), 0.5);
    assert_eq!(sorted(once), sorted(twice));
  }
}
