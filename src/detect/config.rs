// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/config.rs - 滑窗检测配置
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

pub const DEFAULT_CUTOFF: f32 = 0.5;
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.5;
pub const DEFAULT_WINDOW_FACTOR: u32 = 4;

/// 步长与平均尺寸的对应关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrideAxes {
  /// 水平步长取平均高度，垂直步长取平均宽度
  #[default]
  Crossed,
  /// 水平步长取平均宽度，垂直步长取平均高度
  Matched,
}

/// 滑窗检测配置，构造检测器时一次性传入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
  /// 分数严格大于该值才保留
  pub cutoff: f32,
  /// 重叠率严格大于该值的候选框被抑制
  pub overlap_threshold: f32,
  /// 窗口边长 = 该倍数 × 平均高度
  pub window_factor: u32,
  pub stride_axes: StrideAxes,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      cutoff: DEFAULT_CUTOFF,
      overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
      window_factor: DEFAULT_WINDOW_FACTOR,
      stride_axes: StrideAxes::default(),
    }
  }
}

impl ScanConfig {
  pub fn with_cutoff(mut self, cutoff: f32) -> Self {
    self.cutoff = cutoff;
    self
  }

  pub fn with_overlap_threshold(mut self, threshold: f32) -> Self {
    self.overlap_threshold = threshold;
    self
  }

  pub fn with_window_factor(mut self, factor: u32) -> Self {
    self.window_factor = factor;
    self
  }

  pub fn with_stride_axes(mut self, axes: StrideAxes) -> Self {
    self.stride_axes = axes;
    self
  }

  /// 检查配置取值，返回第一个不合法项的描述
  pub fn validate(&self) -> Result<(), String> {
    if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
      return Err(format!("置信度阈值 {} 不在 (0, 1] 范围内", self.cutoff));
    }
    if !(self.overlap_threshold >= 0.0 && self.overlap_threshold <= 1.0) {
      return Err(format!(
        "重叠率阈值 {} 不在 [0, 1] 范围内",
        self.overlap_threshold
      ));
    }
    if self.window_factor == 0 {
      return Err("窗口倍数必须为正".to_string());
    }
    Ok(())
  }
}
