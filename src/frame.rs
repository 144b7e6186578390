// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/frame.rs - NHWC 张量定义
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

use thiserror::Error;

const GRAY_CHANNELS: usize = 1;
const BATCH: usize = 1;

/// 分类器输入边长
pub const TENSOR_SIDE: u32 = 28;

pub trait AsNhwcTensor {
  fn as_nhwc(&self) -> &[f32];
  /// `[batch, height, width, channel]`
  fn shape(&self) -> [usize; 4];
}

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("像素值超出 [0, 1] 范围: 索引 {index}, 值 {value}")]
  OutOfRange { index: usize, value: f32 },
}

/// 单通道归一化张量，形状 `[1, H, W, 1]`，取值范围 `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

pub type ClassifierTensor = NormalizedTensor<TENSOR_SIDE, TENSOR_SIDE>;

impl<const W: u32, const H: u32> NormalizedTensor<W, H> {
  const LEN: usize = BATCH * GRAY_CHANNELS * W as usize * H as usize;

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    GRAY_CHANNELS
  }

  pub fn get(&self, y: usize, x: usize) -> Option<f32> {
    if y >= self.height() || x >= self.width() {
      return None;
    }
    self.data.get(y * self.width() + x).copied()
  }

  pub fn max_value(&self) -> f32 {
    self.data.iter().copied().fold(0.0, f32::max)
  }

  /// 逐行遍历 `(y, x, value)`
  pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
    let width = self.width();
    self
      .data
      .iter()
      .enumerate()
      .map(move |(i, &v)| (i / width, i % width, v))
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for NormalizedTensor<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(FrameError::LengthMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }
    if let Some((index, &value)) = data
      .iter()
      .enumerate()
      .find(|(_, v)| !(0.0..=1.0).contains(*v))
    {
      return Err(FrameError::OutOfRange { index, value });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for NormalizedTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0.0f32; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsNhwcTensor for NormalizedTensor<W, H> {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  fn shape(&self) -> [usize; 4] {
    [BATCH, H as usize, W as usize, GRAY_CHANNELS]
  }
}
