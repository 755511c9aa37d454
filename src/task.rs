// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/task.rs - 检测任务
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
use tracing::info;

use crate::{
  detect::{Planner, SlidingWindowDetector},
  model::{ClassMap, DetectResult, Model},
  output::Render,
};

pub trait Task<I, D, O>: Sized {
  type Error;
  type Output;
  fn run_task(self, input: I, detector: D, output: O) -> Result<Self::Output, Self::Error>;
}

/// 对输入的第一幅图像做一次滑窗检测并交给输出
pub struct OneShotTask {
  classes: ClassMap,
}

impl OneShotTask {
  pub fn new(classes: ClassMap) -> Self {
    Self { classes }
  }
}

impl<M, P, RE, I, O> Task<I, &SlidingWindowDetector<M, P>, O> for OneShotTask
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  P: Planner,
  RE: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = RgbImage>,
  O: Render<RgbImage, DetectResult, Error = RE>,
{
  type Error = anyhow::Error;
  type Output = DetectResult;

  fn run_task(
    self,
    mut input: I,
    detector: &SlidingWindowDetector<M, P>,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始检测...");
    let now = std::time::Instant::now();
    let result = detector.detect(&frame, &self.classes)?;
    let elapsed = now.elapsed();
    info!("检测完成，共 {} 个目标，耗时: {:.2?}", result.len(), elapsed);
    for det in result.items.iter() {
      info!(
        "  - {}: {:.2}% at ({}, {}) - ({}, {})",
        det.label,
        det.score * 100.0,
        det.bbox.x_min,
        det.bbox.y_min,
        det.bbox.x_max,
        det.bbox.y_max
      );
    }
    output.render_result(&frame, &result)?;
    info!("输出完成，总耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}
