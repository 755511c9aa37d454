// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use huachuang::detect::{ScanConfig, StrideAxes, config};

/// Huachuang 滑窗检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径，例如 rknpu:///path/model.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 模型输入宽度
  #[arg(long, default_value = "320", value_name = "PIXELS")]
  pub input_width: u32,

  /// 模型输入高度
  #[arg(long, default_value = "320", value_name = "PIXELS")]
  pub input_height: u32,

  /// 输入图像，例如 image:///path/in.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出，可重复：
  /// - image:///path/out.png[?font=/path/font.ttf] 保存标注图像
  /// - summary:///path/dir 写入各类别数量与检测明细
  #[arg(long, value_name = "OUTPUT", required = true)]
  pub output: Vec<Url>,

  /// 类别标签 JSON 文件（{"0": "name", ...}），缺省使用内置标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0, 1.0]
  #[arg(long, default_value_t = config::DEFAULT_CUTOFF, value_name = "THRESHOLD")]
  pub cutoff: f32,

  /// 去重重叠率阈值 [0.0, 1.0]
  #[arg(long, default_value_t = config::DEFAULT_OVERLAP_THRESHOLD, value_name = "THRESHOLD")]
  pub overlap: f32,

  /// 窗口边长为平均目标高度的倍数
  #[arg(long, default_value_t = config::DEFAULT_WINDOW_FACTOR, value_name = "FACTOR")]
  pub window_factor: u32,

  /// 水平步长取平均宽度、垂直步长取平均高度（默认两者交叉）
  #[arg(long)]
  pub matched_strides: bool,
}

impl Args {
  pub fn scan_config(&self) -> ScanConfig {
    let axes = if self.matched_strides {
      StrideAxes::Matched
    } else {
      StrideAxes::Crossed
    };
    ScanConfig::default()
      .with_cutoff(self.cutoff)
      .with_overlap_threshold(self.overlap)
      .with_window_factor(self.window_factor)
      .with_stride_axes(axes)
  }
}
