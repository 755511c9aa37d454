// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/frame.rs - NHWC 归一化张量定义
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

pub const RGB_CHANNELS: usize = 3;

/// 模型输入张量，形状为 `[1, H, W, 3]`，像素值位于 `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor {
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl NhwcTensor {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let size = RGB_CHANNELS * width * height;
    Self {
      height,
      width,
      data: vec![0.0f32; size].into_boxed_slice(),
    }
  }

  /// 张量形状，含前置的批次维
  pub fn shape(&self) -> [usize; 4] {
    [1, self.height, self.width, RGB_CHANNELS]
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
    if y >= self.height || x >= self.width || c >= RGB_CHANNELS {
      return None;
    }
    self
      .data
      .get((y * self.width + x) * RGB_CHANNELS + c)
      .copied()
  }
}

impl AsMut<[f32]> for NhwcTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl From<&RgbImage> for NhwcTensor {
  fn from(image: &RgbImage) -> Self {
    let mut tensor = {
      let (width, height) = image.dimensions();
      NhwcTensor::with_shape(height as usize, width as usize)
    };

    let slice = tensor.as_mut();
    // RgbImage 本身就是 HWC 排列，逐字节缩放即可
    for (dst, src) in slice.iter_mut().zip(image.as_raw().iter()) {
      *dst = *src as f32 / 255.0;
    }
    tensor
  }
}
