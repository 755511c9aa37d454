// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/model/label.rs - 类别标签映射
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

use std::{collections::BTreeMap, path::Path};

use thiserror::Error;
use tracing::debug;

/// 未知类别的占位标签
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 默认模型的类别名称
pub const PACK_CLASSES: [&str; 10] = [
  "Marlboro",
  "Kent",
  "Camel",
  "Parliament",
  "Pall Mall",
  "Monte Carlo",
  "Winston",
  "Lucky Strike",
  "2001",
  "Lark",
];

#[derive(Error, Debug)]
pub enum ClassMapError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 类别编号到显示名称的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
  labels: BTreeMap<u32, String>,
}

impl Default for ClassMap {
  fn default() -> Self {
    PACK_CLASSES
      .iter()
      .enumerate()
      .map(|(id, name)| (id as u32, *name))
      .collect()
  }
}

impl<S: Into<String>> FromIterator<(u32, S)> for ClassMap {
  fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
    Self {
      labels: iter.into_iter().map(|(id, s)| (id, s.into())).collect(),
    }
  }
}

impl ClassMap {
  /// 从 `{"0": "name", ...}` 形式的 JSON 文件读取
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassMapError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let map = Self::from_json_str(&text)?;
    debug!(
      "从 {} 读取 {} 个类别标签",
      path.as_ref().display(),
      map.len()
    );
    Ok(map)
  }

  pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
    let labels: BTreeMap<u32, String> = serde_json::from_str(text)?;
    Ok(Self { labels })
  }

  /// 查找类别名称，未知编号返回 [`UNKNOWN_LABEL`]
  pub fn label(&self, id: u32) -> &str {
    self
      .labels
      .get(&id)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  /// 以模型输出的浮点类别编号查找
  pub fn label_for_raw(&self, raw: f32) -> &str {
    if !raw.is_finite() || raw < 0.0 || raw > u32::MAX as f32 {
      return UNKNOWN_LABEL;
    }
    self.label(raw as u32)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// 非空且所有名称非空
  pub fn is_valid(&self) -> bool {
    !self.labels.is_empty() && self.labels.values().all(|name| !name.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_ids_use_placeholder() {
    let map: ClassMap = [(0, "a"), (2, "c")].into_iter().collect();
    assert_eq!(map.label(0), "a");
    assert_eq!(map.label(1), UNKNOWN_LABEL);
    assert_eq!(map.label_for_raw(2.0), "c");
    assert_eq!(map.label_for_raw(-1.0), UNKNOWN_LABEL);
    assert_eq!(map.label_for_raw(f32::NAN), UNKNOWN_LABEL);
  }

  #[test]
  fn parses_json_object() {
    let map = ClassMap::from_json_str(r#"{"0": "Kent", "7": "Lark"}"#).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.label(7), "Lark");
    assert!(ClassMap::from_json_str(r#"{"x": "Kent"}"#).is_err());
  }

  #[test]
  fn default_table_and_validity() {
    let map = ClassMap::default();
    assert_eq!(map.len(), 10);
    assert_eq!(map.label(3), "Parliament");
    assert!(map.is_valid());

    let empty: ClassMap = Vec::<(u32, String)>::new().into_iter().collect();
    assert!(!empty.is_valid());
    let blank: ClassMap = [(0, "")].into_iter().collect();
    assert!(!blank.is_valid());
  }
}
