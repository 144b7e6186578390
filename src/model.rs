// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/model.rs - 模型
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

use std::{fmt, path::PathBuf, str::FromStr};

use thiserror::Error;
use url::Url;

use crate::{FromUrl, frame::ClassifierTensor, label::LabelSet, url_path};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 每个类别一个原始分数
pub type Scores = Box<[f32]>;

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {path}: {reason}")]
  Load { path: PathBuf, reason: String },
  #[error("模型推理错误: {0}")]
  Inference(String),
  #[error("未知的模型类型: {0}")]
  UnknownKind(String),
  #[error("没有可用的推理后端，无法加载 {0}")]
  BackendUnavailable(PathBuf),
}

/// 模型选择，URL 方案即模型名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
  /// 仅数字，10 类
  Mnist,
  /// 数字与大小写字母，62 类
  Emnist,
}

impl ModelKind {
  pub fn scheme(&self) -> &'static str {
    match self {
      ModelKind::Mnist => "mnist",
      ModelKind::Emnist => "emnist",
    }
  }

  pub fn label_set(&self) -> LabelSet {
    match self {
      ModelKind::Mnist => LabelSet::Digits,
      ModelKind::Emnist => LabelSet::Alphanumeric,
    }
  }
}

impl FromStr for ModelKind {
  type Err = ModelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "mnist" => Ok(ModelKind::Mnist),
      "emnist" => Ok(ModelKind::Emnist),
      other => Err(ModelError::UnknownKind(other.to_string())),
    }
  }
}

impl fmt::Display for ModelKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.scheme())
  }
}

/// `mnist:///path/model.pt` 或 `emnist:///path/model.pt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
  pub kind: ModelKind,
  pub path: PathBuf,
}

impl FromUrl for ModelSelection {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Ok(ModelSelection {
      kind: url.scheme().parse()?,
      path: url_path(url),
    })
  }
}

#[cfg(feature = "torch")]
mod torch;
#[cfg(feature = "torch")]
pub use self::torch::TorchModel;

/// 按编译时启用的后端加载模型
pub enum ModelWrapper {
  #[cfg(feature = "torch")]
  Torch(TorchModel),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let selection = ModelSelection::from_url(url)?;
    load_backend(selection)
  }
}

#[cfg(feature = "torch")]
fn load_backend(selection: ModelSelection) -> Result<ModelWrapper, ModelError> {
  Ok(ModelWrapper::Torch(TorchModel::load(&selection)?))
}

#[cfg(not(feature = "torch"))]
fn load_backend(selection: ModelSelection) -> Result<ModelWrapper, ModelError> {
  Err(ModelError::BackendUnavailable(selection.path))
}

impl ModelWrapper {
  pub fn kind(&self) -> ModelKind {
    match *self {
      #[cfg(feature = "torch")]
      ModelWrapper::Torch(ref model) => model.kind(),
    }
  }
}

impl Model for ModelWrapper {
  type Input = ClassifierTensor;
  type Output = Scores;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match *self {
      #[cfg(feature = "torch")]
      ModelWrapper::Torch(ref model) => model.infer(input),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selection_from_url() {
    let url = Url::parse("emnist:///opt/models/emnist%20cnn.pt").unwrap();
    let selection = ModelSelection::from_url(&url).unwrap();
    assert_eq!(selection.kind, ModelKind::Emnist);
    assert_eq!(selection.path, PathBuf::from("/opt/models/emnist cnn.pt"));
    assert_eq!(selection.kind.label_set().class_count(), 62);
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("yolo:///model.rknn").unwrap();
    assert!(matches!(
      ModelSelection::from_url(&url),
      Err(ModelError::UnknownKind(kind)) if kind == "yolo"
    ));
  }

  #[test]
  fn mnist_has_ten_classes() {
    assert_eq!("mnist".parse::<ModelKind>().unwrap().label_set(), LabelSet::Digits);
    assert_eq!(ModelKind::Mnist.to_string(), "mnist");
  }

  #[cfg(not(feature = "torch"))]
  #[test]
  fn loading_without_backend_fails() {
    let url = Url::parse("mnist:///nowhere/model.pt").unwrap();
    assert!(matches!(
      ModelWrapper::from_url(&url),
      Err(ModelError::BackendUnavailable(_))
    ));
  }
}
