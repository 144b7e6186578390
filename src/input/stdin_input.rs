// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/input/stdin_input.rs - 标准输入实时事件
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

use std::io::{BufRead, Lines};

use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{CanvasOrigin, PointerEvent, parse_line},
};

#[derive(Error, Debug)]
pub enum StdinInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 逐行读取标准输入中的事件，直到 EOF
pub struct StdinInput {
  origin: CanvasOrigin,
}

impl FromUrlWithScheme for StdinInput {
  const SCHEME: &'static str = "stdin";
}

impl FromUrl for StdinInput {
  type Error = StdinInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(StdinInputError::SchemeMismatch);
    }
    Ok(StdinInput {
      origin: CanvasOrigin::from_query(url),
    })
  }
}

impl StdinInput {
  pub fn into_events(self) -> StdinEvents {
    StdinEvents::new(std::io::stdin().lock(), self.origin)
  }
}

pub type StdinEvents = LineEvents<std::io::StdinLock<'static>>;

/// 任意按行读取的事件流
pub struct LineEvents<R> {
  lines: Lines<R>,
  origin: CanvasOrigin,
}

impl<R: BufRead> LineEvents<R> {
  pub fn new(reader: R, origin: CanvasOrigin) -> Self {
    Self {
      lines: reader.lines(),
      origin,
    }
  }
}

impl<R: BufRead> Iterator for LineEvents<R> {
  type Item = PointerEvent;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      match self.lines.next()? {
        Ok(line) => {
          if let Some(event) = parse_line(&line, self.origin) {
            return Some(event);
          }
        }
        Err(e) => {
          warn!("读取输入失败，结束输入: {}", e);
          return None;
        }
      }
    }
  }
}
