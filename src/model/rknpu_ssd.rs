// 该文件是 Huachuang （滑窗） 项目的一部分。
// src/model/rknpu_ssd.rs - RKNPU 上的 SSD 检测模型
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

use rknpu::{Context, InitFlags, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NhwcTensor,
  model::{Model, RawOutput},
};

const SSD_NUM_INPUTS: u32 = 1;
const SSD_MIN_OUTPUTS: u32 = 3;
const SSD_DEFAULT_INPUT_W: u32 = 320;
const SSD_DEFAULT_INPUT_H: u32 = 320;
// 与 TFLite 检测后处理算子的输出顺序一致：分数、框、(数量)、类别
const SSD_DEFAULT_OUTPUTS: SsdOutputIndex = SsdOutputIndex {
  scores: 0,
  boxes: 1,
  classes: 3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsdOutputIndex {
  pub scores: usize,
  pub boxes: usize,
  pub classes: usize,
}

pub struct RknpuSsd {
  context: Context,
  input_w: u32,
  input_h: u32,
  outputs: SsdOutputIndex,
}

#[derive(Error, Debug)]
pub enum RknpuSsdError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error("输出张量 {index} 长度为 {len}, 不是 {width} 的整数倍")]
  OutputShapeMismatch {
    index: usize,
    len: usize,
    width: usize,
  },
}

impl From<std::io::Error> for RknpuSsdError {
  fn from(err: std::io::Error) -> Self {
    RknpuSsdError::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for RknpuSsdError {
  fn from(err: rknpu::Error) -> Self {
    RknpuSsdError::RknnError(err)
  }
}

impl RknpuSsdError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknpuSsdError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct RknpuSsdBuilder {
  model_path: String,
  flags: InitFlags,
  input_w: u32,
  input_h: u32,
  outputs: SsdOutputIndex,
}

impl FromUrlWithScheme for RknpuSsdBuilder {
  const SCHEME: &'static str = "rknpu";
}

impl FromUrl for RknpuSsdBuilder {
  type Error = RknpuSsdError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RknpuSsdError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(RknpuSsdBuilder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
      input_w: SSD_DEFAULT_INPUT_W,
      input_h: SSD_DEFAULT_INPUT_H,
      outputs: SSD_DEFAULT_OUTPUTS,
    })
  }
}

impl RknpuSsdBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_w = width;
    self.input_h = height;
    self
  }

  pub fn outputs(mut self, outputs: SsdOutputIndex) -> Self {
    self.outputs = outputs;
    self
  }

  pub fn build(self) -> Result<RknpuSsd, RknpuSsdError> {
    info!("加载模型文件: {}", self.model_path);
    let mode_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      mode_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&mode_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknpuSsdError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknpuSsdError::invalid("无法获取输出数量", e))?;

    if num_inputs != SSD_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        SSD_NUM_INPUTS, num_inputs
      );
      return Err(RknpuSsdError::invalid(
        &format!(
          "预期模型输入数量为 {}, 实际为 {}",
          SSD_NUM_INPUTS, num_inputs
        ),
        rknpu::Error::InvalidModel,
      ));
    }

    let highest = self
      .outputs
      .scores
      .max(self.outputs.boxes)
      .max(self.outputs.classes) as u32;
    if num_outputs < SSD_MIN_OUTPUTS || num_outputs <= highest {
      error!(
        "模型输出数量 {} 不足以读取索引 {:?}",
        num_outputs, self.outputs
      );
      return Err(RknpuSsdError::invalid(
        &format!("模型输出数量 {} 不足以读取索引 {:?}", num_outputs, self.outputs),
        rknpu::Error::InvalidModel,
      ));
    }

    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);
    info!("模型加载完成");

    Ok(RknpuSsd {
      context,
      input_w: self.input_w,
      input_h: self.input_h,
      outputs: self.outputs,
    })
  }
}

impl Model for RknpuSsd {
  type Error = RknpuSsdError;

  fn input_size(&self) -> (u32, u32) {
    (self.input_w, self.input_h)
  }

  fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error> {
    let actual = (input.width() as u32, input.height() as u32);
    if actual != self.input_size() {
      return Err(RknpuSsdError::InputShapeMismatch {
        expected: self.input_size(),
        actual,
      });
    }

    debug!("设置模型输入");
    let bytes: Vec<u8> = input
      .as_slice()
      .iter()
      .flat_map(|v| v.to_ne_bytes())
      .collect();
    self
      .context
      .set_input(0, &bytes, rknpu::TensorFormat::NHWC, TensorType::Float32)?;

    debug!("执行模型推理");
    self.context.run()?;

    debug!("获取模型输出");
    let output = self.context.get_outputs()?;
    self.postprocess(&output)
  }
}

impl RknpuSsd {
  fn postprocess(&self, output: &rknpu::Output) -> Result<RawOutput, RknpuSsdError> {
    let scores = output.get_f32(self.outputs.scores)?.to_vec();
    let flat_boxes = output.get_f32(self.outputs.boxes)?.to_vec();
    let classes = output.get_f32(self.outputs.classes)?.to_vec();

    if flat_boxes.len() % 4 != 0 {
      return Err(RknpuSsdError::OutputShapeMismatch {
        index: self.outputs.boxes,
        len: flat_boxes.len(),
        width: 4,
      });
    }

    let boxes = flat_boxes
      .chunks_exact(4)
      .map(|b| [b[0], b[1], b[2], b[3]])
      .collect::<Vec<_>>();

    debug!("模型输出 {} 个候选框", scores.len());
    Ok(RawOutput::new(scores, boxes, classes))
  }
}
