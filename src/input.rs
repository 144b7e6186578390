// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/input.rs - 指针/触摸输入
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
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, stroke::PointerSample};

mod stdin_input;
mod stroke_file;

pub use self::stdin_input::{StdinInput, StdinInputError};
pub use self::stroke_file::{StrokeFileInput, StrokeFileInputError};

/// 画布坐标系下统一的指针事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
  Down(PointerSample),
  Move(PointerSample),
  Up,
  Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
  Down,
  Move,
  Up,
  Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
  pub client_x: f32,
  pub client_y: f32,
}

/// 设备原始事件，每行一个 JSON 对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawInput {
  /// 鼠标事件已是画布内偏移
  Mouse {
    phase: PointerPhase,
    offset_x: f32,
    offset_y: f32,
  },
  /// 触摸事件为屏幕坐标，需要减去画布原点
  Touch {
    phase: PointerPhase,
    #[serde(default)]
    touches: Vec<TouchPoint>,
  },
  Reset,
}

/// 画布左上角在屏幕坐标中的位置
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasOrigin {
  pub left: f32,
  pub top: f32,
}

impl CanvasOrigin {
  /// 从 URL 查询参数 `left`、`top` 读取
  pub fn from_query(url: &Url) -> Self {
    let mut origin = CanvasOrigin::default();
    for (k, v) in url.query_pairs() {
      match (k.as_ref(), v.parse::<f32>()) {
        ("left", Ok(left)) => origin.left = left,
        ("top", Ok(top)) => origin.top = top,
        (key, Err(_)) if key == "left" || key == "top" => {
          warn!("忽略无法解析的画布原点参数: {}={}", key, v)
        }
        _ => {}
      }
    }
    origin
  }
}

impl RawInput {
  /// 不支持的事件返回 `None`
  pub fn normalize(&self, origin: CanvasOrigin) -> Option<PointerEvent> {
    match *self {
      RawInput::Mouse {
        phase,
        offset_x,
        offset_y,
      } => Some(pointer_event(phase, PointerSample::new(offset_x, offset_y))),
      RawInput::Touch { phase, ref touches } => match (phase, touches.first()) {
        (PointerPhase::Up | PointerPhase::Leave, _) => Some(PointerEvent::Up),
        (_, Some(touch)) => Some(pointer_event(
          phase,
          PointerSample::new(touch.client_x - origin.left, touch.client_y - origin.top),
        )),
        (_, None) => {
          debug!("触摸事件缺少触点，忽略");
          None
        }
      },
      RawInput::Reset => Some(PointerEvent::Clear),
    }
  }
}

fn pointer_event(phase: PointerPhase, point: PointerSample) -> PointerEvent {
  match phase {
    PointerPhase::Down => PointerEvent::Down(point),
    PointerPhase::Move => PointerEvent::Move(point),
    PointerPhase::Up | PointerPhase::Leave => PointerEvent::Up,
  }
}

/// 解析一行事件记录，空行与注释返回 `None`
pub(crate) fn parse_line(line: &str, origin: CanvasOrigin) -> Option<PointerEvent> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return None;
  }
  match serde_json::from_str::<RawInput>(line) {
    Ok(raw) => raw.normalize(origin),
    Err(e) => {
      warn!("忽略无法解析的输入事件: {} ({})", line, e);
      None
    }
  }
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("笔画文件输入错误: {0}")]
  StrokeFileInputError(#[from] StrokeFileInputError),
  #[error("标准输入错误: {0}")]
  StdinInputError(#[from] StdinInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  StrokeFile(StrokeFileInput),
  Stdin(StdinInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      StrokeFileInput::SCHEME => Ok(InputWrapper::StrokeFile(StrokeFileInput::from_url(url)?)),
      StdinInput::SCHEME => Ok(InputWrapper::Stdin(StdinInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl InputWrapper {
  pub fn into_events(self) -> InputWrapperIter {
    match self {
      InputWrapper::StrokeFile(input) => InputWrapperIter::StrokeFile(input.into_events()),
      InputWrapper::Stdin(input) => InputWrapperIter::Stdin(input.into_events()),
    }
  }
}

pub enum InputWrapperIter {
  StrokeFile(self::stroke_file::StrokeFileEvents),
  Stdin(self::stdin_input::StdinEvents),
}

impl Iterator for InputWrapperIter {
  type Item = PointerEvent;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapperIter::StrokeFile(input) => input.next(),
      InputWrapperIter::Stdin(input) => input.next(),
    }
  }
}
