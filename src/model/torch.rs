// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/model/torch.rs - TorchScript 推理后端
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

use std::sync::Mutex;

use tch::{CModule, Device, Kind, Tensor};
use tracing::{debug, info};

use crate::{
  frame::{AsNhwcTensor, ClassifierTensor},
  model::{Model, ModelError, ModelKind, ModelSelection, Scores},
};

pub struct TorchModel {
  // CModule 只保证 Send，推理时加锁
  module: Mutex<CModule>,
  device: Device,
  kind: ModelKind,
}

impl TorchModel {
  pub fn load(selection: &ModelSelection) -> Result<Self, ModelError> {
    info!("加载模型文件: {}", selection.path.display());
    let device = Device::cuda_if_available();
    let module =
      CModule::load_on_device(&selection.path, device).map_err(|e| ModelError::Load {
        path: selection.path.clone(),
        reason: e.to_string(),
      })?;
    debug!("模型类型: {}, 设备: {:?}", selection.kind, device);
    info!("模型加载完成");

    Ok(Self {
      module: Mutex::new(module),
      device,
      kind: selection.kind,
    })
  }

  pub fn kind(&self) -> ModelKind {
    self.kind
  }
}

impl Model for TorchModel {
  type Input = ClassifierTensor;
  type Output = Scores;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let shape = input.shape().map(|d| d as i64);
    let tensor = Tensor::from_slice(input.as_nhwc())
      .reshape(shape)
      .to_device(self.device);

    let module = self
      .module
      .lock()
      .map_err(|_| ModelError::Inference("模型锁已损坏".to_string()))?;
    debug!("执行模型推理");
    let output = module
      .forward_ts(&[tensor])
      .map_err(|e| ModelError::Inference(e.to_string()))?;
    drop(module);

    let flat = output
      .flatten(0, -1)
      .to_kind(Kind::Float)
      .to_device(Device::Cpu);
    let scores = Vec::<f32>::try_from(&flat).map_err(|e| ModelError::Inference(e.to_string()))?;
    debug!("模型输出长度: {}", scores.len());

    Ok(scores.into_boxed_slice())
  }
}
