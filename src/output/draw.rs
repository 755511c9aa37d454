// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::debug;

use crate::model::Detection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: i32 = 5;
const BOX_THICKNESS: u32 = 2;
const BOX_COLOR: [u8; 3] = [10, 255, 0]; // 绿色
const LABEL_BACKGROUND: [u8; 3] = [255, 255, 255];
const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  box_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      box_color: BOX_COLOR,
    }
  }
}

impl Draw {
  /// 加载 TTF/OTF 字体，用于在框上方绘制标签
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    self.font = Some(FontVec::try_from_vec(data)?);
    debug!("加载标签字体: {}", path.as_ref().display());
    Ok(self)
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    self.font_size = size;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  fn draw_bbox(&self, image: &mut RgbImage, det: &Detection) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
      return;
    }

    let x_min = det.bbox.x_min.min(w - 1);
    let y_min = det.bbox.y_min.min(h - 1);
    let x_max = det.bbox.x_max.min(w - 1);
    let y_max = det.bbox.y_max.min(h - 1);

    // 边框向内加粗
    for t in 0..BOX_THICKNESS {
      if x_min + t > x_max.saturating_sub(t) || y_min + t > y_max.saturating_sub(t) {
        break;
      }
      let rect = Rect::at((x_min + t) as i32, (y_min + t) as i32).of_size(
        x_max - x_min + 1 - 2 * t,
        y_max - y_min + 1 - 2 * t,
      );
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }
  }

  fn draw_label(&self, image: &mut RgbImage, det: &Detection, font: &FontVec) {
    let label = format!("{}: {:.2}%", det.label, det.score * 100.0);
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, font, &label);
    if text_w == 0 || text_h == 0 {
      return;
    }

    // 标签放在框上方，空间不够时贴着图像上沿
    let x = det.bbox.x_min as i32;
    let y = (det.bbox.y_min as i32 - text_h as i32 - 2 * LABEL_PADDING).max(0);
    let rect = Rect::at(x, y).of_size(text_w, text_h + 2 * LABEL_PADDING as u32);
    draw_filled_rect_mut(image, rect, Rgb(LABEL_BACKGROUND));
    draw_text_mut(
      image,
      Rgb(LABEL_TEXT_COLOR),
      x,
      y + LABEL_PADDING,
      scale,
      font,
      &label,
    );
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, items: &[Detection]) {
    for det in items {
      self.draw_bbox(image, det);
      if let Some(font) = &self.font {
        self.draw_label(image, det, font);
      }
    }
  }

  pub fn draw_detections(&self, image: &RgbImage, items: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    self.draw_detections_on_image(&mut canvas, items);
    canvas
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  #[test]
  fn draws_two_pixel_box_outline() {
    let image = RgbImage::new(20, 20);
    let det = Detection {
      score: 0.9,
      label: "Kent".to_string(),
      bbox: BoundingBox::new(4, 4, 15, 15),
    };
    let drawn = Draw::default().draw_detections(&image, &[det]);

    let green = Rgb(BOX_COLOR);
    assert_eq!(drawn.get_pixel(4, 4), &green);
    assert_eq!(drawn.get_pixel(5, 10), &green);
    assert_eq!(drawn.get_pixel(15, 15), &green);
    assert_eq!(drawn.get_pixel(14, 10), &green);
    assert_eq!(drawn.get_pixel(10, 10), &Rgb([0, 0, 0]));
    assert_eq!(drawn.get_pixel(3, 3), &Rgb([0, 0, 0]));
  }

  #[test]
  fn tiny_and_edge_boxes_do_not_panic() {
    let mut image = RgbImage::new(10, 10);
    let items = [
      Detection {
        score: 0.6,
        label: "a".to_string(),
        bbox: BoundingBox::new(9, 9, 9, 9),
      },
      Detection {
        score: 0.6,
        label: "b".to_string(),
        bbox: BoundingBox::new(0, 0, 30, 30),
      },
    ];
    Draw::default().draw_detections_on_image(&mut image, &items);
    assert_eq!(image.get_pixel(9, 9), &Rgb(BOX_COLOR));
  }
}
