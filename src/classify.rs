// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/classify.rs - 分类流程编排
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

use image::GrayImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::ClassifierTensor,
  label::{LabelError, LabelMapping, LabelSet},
  model::{Model, Scores},
  preprocess::{ClassifierPreprocessor, PreprocessError},
};

#[derive(Error, Debug)]
pub enum ClassificationError {
  #[error("没有加载模型")]
  ModelUnavailable,
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("模型错误: {0}")]
  Model(Box<dyn std::error::Error + Send + Sync>),
  #[error("模型输出长度不匹配: 期望 {expected}, 实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("模型输出包含非有限值: 索引 {index}, 值 {value}")]
  InvalidScores { index: usize, value: f32 },
  #[error("标签解码错误: {0}")]
  Label(#[from] LabelError),
  #[error("分类任务异常退出")]
  TaskPanicked,
}

/// 类别索引与 softmax 后的概率分布
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPrediction {
  pub class_index: usize,
  pub confidence: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
  pub character: char,
  /// 百分比，保留两位小数
  pub confidence_percent: f64,
  pub prediction: ClassPrediction,
}

/// 预处理 -> 推理 -> softmax -> argmax -> 解码
pub struct ClassificationOrchestrator<M> {
  model: M,
  label_set: LabelSet,
  mapping: LabelMapping,
  preprocessor: ClassifierPreprocessor,
}

impl<M, E> ClassificationOrchestrator<M>
where
  M: Model<Input = ClassifierTensor, Output = Scores, Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M, label_set: LabelSet) -> Self {
    Self {
      model,
      label_set,
      mapping: LabelMapping::default(),
      preprocessor: ClassifierPreprocessor::default(),
    }
  }

  pub fn with_mapping(mut self, mapping: LabelMapping) -> Self {
    self.mapping = mapping;
    self
  }

  pub fn label_set(&self) -> LabelSet {
    self.label_set
  }

  pub fn classify(&self, surface: &GrayImage) -> Result<Classification, ClassificationError> {
    let tensor = self.preprocessor.preprocess(surface)?;

    let now = std::time::Instant::now();
    let scores = self
      .model
      .infer(&tensor)
      .map_err(|e| ClassificationError::Model(Box::new(e)))?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let expected = self.label_set.class_count();
    if scores.len() != expected {
      error!("模型输出长度 {} 与类别数 {} 不符", scores.len(), expected);
      return Err(ClassificationError::ShapeMismatch {
        expected,
        actual: scores.len(),
      });
    }

    if let Some((index, &value)) = scores.iter().enumerate().find(|(_, v)| !v.is_finite()) {
      error!("模型输出第 {} 项为 {}", index, value);
      return Err(ClassificationError::InvalidScores { index, value });
    }

    let confidence = softmax(&scores);
    let class_index = argmax(&confidence).ok_or(ClassificationError::ShapeMismatch {
      expected,
      actual: 0,
    })?;
    let character = self.mapping.decode(class_index).inspect_err(|e| {
      error!("类别索引无法解码，模型与标签表不一致: {}", e);
    })?;
    let confidence_percent = round_percent(confidence[class_index]);
    info!("预测字符: {}, 置信度: {:.2}%", character, confidence_percent);

    Ok(Classification {
      character,
      confidence_percent,
      prediction: ClassPrediction {
        class_index,
        confidence,
      },
    })
  }
}

/// 数值稳定的 softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 最大值的第一个索引
pub fn argmax(values: &[f32]) -> Option<usize> {
  values
    .iter()
    .enumerate()
    .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
      Some((_, b)) if b >= v => best,
      _ => Some((i, v)),
    })
    .map(|(i, _)| i)
}

fn round_percent(probability: f32) -> f64 {
  (probability as f64 * 100.0 * 100.0).round() / 100.0
}
