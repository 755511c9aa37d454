// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/output/summary.rs - 检测结果汇总输出
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

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use chrono::Utc;
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection},
  output::Render,
};

const COUNTS_TXT: &str = "detection_counts.txt";
const COUNTS_JSON: &str = "detection_counts.json";
const DETECTIONS_TXT: &str = "detections.txt";

#[derive(Error, Debug)]
pub enum SummaryOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 各类别的检测数量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts(BTreeMap<String, usize>);

impl ClassCounts {
  pub fn from_detections(items: &[Detection]) -> Self {
    let mut counts = BTreeMap::new();
    for det in items {
      *counts.entry(det.label.clone()).or_insert(0) += 1;
    }
    Self(counts)
  }

  pub fn get(&self, label: &str) -> usize {
    self.0.get(label).copied().unwrap_or(0)
  }

  pub fn total(&self) -> usize {
    self.0.values().sum()
  }

  /// 每行 `label: count`
  pub fn to_text(&self) -> String {
    self
      .0
      .iter()
      .map(|(label, count)| format!("{}: {}\n", label, count))
      .collect()
  }
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
  generated_at: String,
  total: usize,
  counts: &'a ClassCounts,
  detections: &'a [Detection],
}

/// 把检测数量与明细写入目录
pub struct SummaryOutput {
  directory: PathBuf,
}

impl FromUrlWithScheme for SummaryOutput {
  const SCHEME: &'static str = "summary";
}

impl FromUrl for SummaryOutput {
  type Error = SummaryOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SummaryOutputError::SchemeMismatch);
    }

    Ok(SummaryOutput {
      directory: PathBuf::from(uri.path()),
    })
  }
}

impl SummaryOutput {
  pub fn new<P: AsRef<Path>>(directory: P) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
    }
  }

  pub fn write(&self, items: &[Detection]) -> Result<ClassCounts, SummaryOutputError> {
    std::fs::create_dir_all(&self.directory)?;

    let counts = ClassCounts::from_detections(items);
    std::fs::write(self.directory.join(COUNTS_TXT), counts.to_text())?;

    let document = SummaryDocument {
      generated_at: Utc::now().to_rfc3339(),
      total: counts.total(),
      counts: &counts,
      detections: items,
    };
    std::fs::write(
      self.directory.join(COUNTS_JSON),
      serde_json::to_string_pretty(&document)?,
    )?;

    let records: Vec<String> = items
      .iter()
      .map(|d| {
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          d.label, d.score, d.bbox.x_min, d.bbox.y_min, d.bbox.x_max, d.bbox.y_max
        )
      })
      .collect();
    std::fs::write(self.directory.join(DETECTIONS_TXT), records.join("\n"))?;

    info!(
      "检测汇总已写入 {}: 共 {} 个目标",
      self.directory.display(),
      counts.total()
    );
    Ok(counts)
  }
}

impl Render<RgbImage, DetectResult> for SummaryOutput {
  type Error = SummaryOutputError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    self.write(&result.items).map(|_| ())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn det(label: &str, score: f32) -> Detection {
    Detection {
      score,
      label: label.to_string(),
      bbox: BoundingBox::new(1, 2, 3, 4),
    }
  }

  #[test]
  fn counts_per_label() {
    let counts = ClassCounts::from_detections(&[det("Kent", 0.9), det("Lark", 0.7), det("Kent", 0.6)]);
    assert_eq!(counts.get("Kent"), 2);
    assert_eq!(counts.get("Lark"), 1);
    assert_eq!(counts.get("Camel"), 0);
    assert_eq!(counts.total(), 3);
    assert_eq!(counts.to_text(), "Kent: 2\nLark: 1\n");
  }

  #[test]
  fn writes_summary_files() {
    let dir = tempfile::tempdir().unwrap();
    let output = SummaryOutput::new(dir.path().join("run"));
    let result = DetectResult {
      items: vec![det("Kent", 0.9), det("Winston", 0.75)].into_boxed_slice(),
      ..Default::default()
    };
    output
      .render_result(&RgbImage::new(1, 1), &result)
      .unwrap();

    let run = dir.path().join("run");
    let text = std::fs::read_to_string(run.join(COUNTS_TXT)).unwrap();
    assert_eq!(text, "Kent: 1\nWinston: 1\n");

    let json: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(run.join(COUNTS_JSON)).unwrap()).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["counts"]["Winston"], 1);
    assert_eq!(json["detections"][0]["bbox"]["x_max"], 3);

    let records = std::fs::read_to_string(run.join(DETECTIONS_TXT)).unwrap();
    assert_eq!(records.lines().next(), Some("Kent, 0.9000, 1, 2, 3, 4"));
  }

  #[test]
  fn empty_result_writes_empty_counts() {
    let dir = tempfile::tempdir().unwrap();
    let counts = SummaryOutput::new(dir.path()).write(&[]).unwrap();
    assert_eq!(counts.total(), 0);
    let text = std::fs::read_to_string(dir.path().join(COUNTS_TXT)).unwrap();
    assert!(text.is_empty());
  }
}
