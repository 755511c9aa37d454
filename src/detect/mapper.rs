// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/mapper.rs - 窗口输出到整图坐标的映射
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

use tracing::trace;

use crate::{
  detect::Tile,
  model::{BoundingBox, ClassMap, Detection, RawOutput},
};

/// 把归一化坐标换算到窗口内的像素坐标
///
/// 使用缩放前窗口自身的尺寸，向零截断并限制在 `[0, extent - 1]`。
fn to_tile_pixel(normalized: f32, extent: u32) -> u32 {
  let v = if normalized.is_finite() {
    normalized.clamp(0.0, 1.0)
  } else {
    0.0
  };
  ((v * extent as f32) as u32).min(extent.saturating_sub(1))
}

/// 把一个窗口的模型输出转换为整图坐标下的检测结果
///
/// 只保留分数严格大于 `cutoff` 的候选框。
pub fn map_candidates(
  output: &RawOutput,
  tile: &Tile,
  cutoff: f32,
  classes: &ClassMap,
) -> Vec<Detection> {
  let rows = output
    .scores
    .iter()
    .zip(output.boxes.iter())
    .zip(output.classes.iter());

  let mut detections = Vec::new();
  for ((&score, bbox), &class) in rows {
    if !(score > cutoff) {
      continue;
    }

    let [y_min, x_min, y_max, x_max] = *bbox;
    let y_min = to_tile_pixel(y_min, tile.height) + tile.y;
    let x_min = to_tile_pixel(x_min, tile.width) + tile.x;
    let y_max = to_tile_pixel(y_max, tile.height) + tile.y;
    let x_max = to_tile_pixel(x_max, tile.width) + tile.x;

    let detection = Detection {
      score,
      label: classes.label_for_raw(class).to_string(),
      bbox: BoundingBox::new(x_min, y_min, x_max, y_max),
    };
    trace!("窗口 {} 候选框: {:?}", tile, detection);
    detections.push(detection);
  }

  detections
}
