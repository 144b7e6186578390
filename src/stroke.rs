// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/stroke.rs - 笔画采样与插值
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

use serde::{Deserialize, Serialize};

/// 插值步长（像素）
pub const STROKE_STEP: f32 = 2.0;

/// 画布坐标系下的一个指针采样点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerSample {
  pub x: f32,
  pub y: f32,
}

impl PointerSample {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  pub fn distance(&self, other: &PointerSample) -> f32 {
    (other.x - self.x).hypot(other.y - self.y)
  }
}

impl From<(f32, f32)> for PointerSample {
  fn from((x, y): (f32, f32)) -> Self {
    Self { x, y }
  }
}

/// 相邻两个采样点组成的线段，`from` 为上一段的 `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSegment {
  pub from: PointerSample,
  pub to: PointerSample,
}

impl StrokeSegment {
  pub fn new(from: PointerSample, to: PointerSample) -> Self {
    Self { from, to }
  }

  /// 沿直线按固定步长生成中间点
  pub fn interpolate(&self) -> Interpolate {
    interpolate(*self)
  }
}

/// 惰性的中间点序列
#[derive(Debug, Clone)]
pub struct Interpolate {
  origin: PointerSample,
  step: (f32, f32),
  index: usize,
  count: usize,
}

impl Iterator for Interpolate {
  type Item = PointerSample;

  fn next(&mut self) -> Option<Self::Item> {
    if self.index >= self.count {
      return None;
    }
    let i = self.index as f32;
    self.index += 1;
    Some(PointerSample {
      x: self.origin.x + self.step.0 * i,
      y: self.origin.y + self.step.1 * i,
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let rest = self.count - self.index;
    (rest, Some(rest))
  }
}

impl ExactSizeIterator for Interpolate {}

/// 生成 `floor(d / 2)` 个点，第 i 个点为 `from + (cos θ, sin θ) * i * 2`。
/// 起止点重合时序列为空。
pub fn interpolate(segment: StrokeSegment) -> Interpolate {
  let StrokeSegment { from, to } = segment;
  let distance = from.distance(&to);
  let count = if distance.is_finite() {
    (distance / STROKE_STEP).floor() as usize
  } else {
    0
  };
  let angle = (to.y - from.y).atan2(to.x - from.x);
  Interpolate {
    origin: from,
    step: (angle.cos() * STROKE_STEP, angle.sin() * STROKE_STEP),
    index: 0,
    count,
  }
}
