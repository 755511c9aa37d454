// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/detect/tile.rs - 窗口裁剪与归一化
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

use std::fmt;

use image::{
  RgbImage,
  imageops::{self, FilterType},
};

use crate::{detect::DetectError, frame::NhwcTensor};

/// 图像上的一个矩形窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl fmt::Display for Tile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({}, {}) {}x{}",
      self.x, self.y, self.width, self.height
    )
  }
}

impl Tile {
  /// 覆盖整幅图像的窗口
  pub fn full(image_w: u32, image_h: u32) -> Self {
    Self {
      x: 0,
      y: 0,
      width: image_w,
      height: image_h,
    }
  }

  /// 以 `(x, y)` 为原点、`size` 为边长的方窗，裁剪到图像范围内
  pub fn clipped(x: u32, y: u32, size: u32, image_w: u32, image_h: u32) -> Self {
    let x_end = x.saturating_add(size).min(image_w);
    let y_end = y.saturating_add(size).min(image_h);
    Self {
      x,
      y,
      width: x_end.saturating_sub(x),
      height: y_end.saturating_sub(y),
    }
  }

  pub fn is_degenerate(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn contains(&self, px: u32, py: u32) -> bool {
    px >= self.x && py >= self.y && px - self.x < self.width && py - self.y < self.height
  }
}

/// 裁剪窗口、缩放到模型输入尺寸并把像素值缩放到 `[0, 1]`
pub fn normalize(
  image: &RgbImage,
  tile: &Tile,
  target_w: u32,
  target_h: u32,
) -> Result<NhwcTensor, DetectError> {
  if tile.is_degenerate() {
    return Err(DetectError::InvalidTile(*tile));
  }

  let crop = imageops::crop_imm(image, tile.x, tile.y, tile.width, tile.height).to_image();
  let resized = if crop.dimensions() == (target_w, target_h) {
    crop
  } else {
    imageops::resize(&crop, target_w, target_h, FilterType::Triangle)
  };

  Ok(NhwcTensor::from(&resized))
}
