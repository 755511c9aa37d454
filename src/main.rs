// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use huachuang::{
  FromUrl,
  detect::SlidingWindowDetector,
  input::ImageFileInput,
  model::{ClassMap, RknpuSsdBuilder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  for output in &args.output {
    info!("输出路径: {}", output);
  }

  let classes = match &args.labels {
    Some(path) => ClassMap::from_json_file(path)?,
    None => ClassMap::default(),
  };
  info!("类别数量: {}", classes.len());

  let config = args.scan_config();
  config.validate().map_err(anyhow::Error::msg)?;
  info!("检测配置: {:?}", config);

  let model = RknpuSsdBuilder::from_url(&args.model)?
    .input_size(args.input_width, args.input_height)
    .build()?;
  let detector = SlidingWindowDetector::new(model, config);

  let input = ImageFileInput::from_url(&args.input)?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  OneShotTask::new(classes).run_task(input, &detector, outputs)?;

  Ok(())
}
