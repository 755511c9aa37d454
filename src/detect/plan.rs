// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/plan.rs - 滑窗扫描规划
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

use crate::detect::{
  ScaleEstimate, Tile,
  config::{DEFAULT_WINDOW_FACTOR, ScanConfig, StrideAxes},
};

/// 窗口边长与两个方向的步长
///
/// 窗口不小于 2，步长位于 `[1, window - 1]`，保证扫描必然结束且相邻窗口之间没有空隙。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
  pub window: u32,
  pub stride_x: u32,
  pub stride_y: u32,
}

impl ScanPlan {
  pub fn new(window: u32, stride_x: u32, stride_y: u32) -> Self {
    let window = window.max(2);
    Self {
      window,
      stride_x: stride_x.clamp(1, window - 1),
      stride_y: stride_y.clamp(1, window - 1),
    }
  }

  /// 按行优先顺序枚举覆盖 `image_w × image_h` 的窗口
  pub fn tiles(&self, image_w: u32, image_h: u32) -> TileIter {
    TileIter {
      plan: *self,
      image_w,
      image_h,
      x: 0,
      y: 0,
    }
  }
}

/// 窗口迭代器
///
/// 原点从 `(0, 0)` 开始，`x < W - 1` 时沿水平方向推进，
/// 一行结束后 `y` 推进一个垂直步长，直到 `y >= H - 1`。
#[derive(Debug, Clone)]
pub struct TileIter {
  plan: ScanPlan,
  image_w: u32,
  image_h: u32,
  x: u32,
  y: u32,
}

impl Iterator for TileIter {
  type Item = Tile;

  fn next(&mut self) -> Option<Self::Item> {
    let x_end = self.image_w.saturating_sub(1);
    let y_end = self.image_h.saturating_sub(1);

    if self.y >= y_end || x_end == 0 {
      return None;
    }

    let tile = Tile::clipped(self.x, self.y, self.plan.window, self.image_w, self.image_h);

    self.x = self.x.saturating_add(self.plan.stride_x);
    if self.x >= x_end {
      self.x = 0;
      self.y = self.y.saturating_add(self.plan.stride_y);
    }

    Some(tile)
  }
}

/// 由尺度预估生成扫描计划
pub trait Planner {
  fn plan(&self, estimate: &ScaleEstimate) -> ScanPlan;
}

impl<P: Planner + ?Sized> Planner for &P {
  fn plan(&self, estimate: &ScaleEstimate) -> ScanPlan {
    (**self).plan(estimate)
  }
}

/// 默认规划：窗口为平均高度的若干倍，步长按 [`StrideAxes`] 取平均宽高
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossStridePlanner {
  window_factor: u32,
  axes: StrideAxes,
}

impl Default for CrossStridePlanner {
  fn default() -> Self {
    Self {
      window_factor: DEFAULT_WINDOW_FACTOR,
      axes: StrideAxes::Crossed,
    }
  }
}

impl From<&ScanConfig> for CrossStridePlanner {
  fn from(config: &ScanConfig) -> Self {
    Self {
      window_factor: config.window_factor,
      axes: config.stride_axes,
    }
  }
}

impl Planner for CrossStridePlanner {
  fn plan(&self, estimate: &ScaleEstimate) -> ScanPlan {
    let window = self.window_factor.saturating_mul(estimate.mean_dy);
    let (stride_x, stride_y) = match self.axes {
      StrideAxes::Crossed => (estimate.mean_dy, estimate.mean_dx),
      StrideAxes::Matched => (estimate.mean_dx, estimate.mean_dy),
    };
    ScanPlan::new(window, stride_x, stride_y)
  }
}
