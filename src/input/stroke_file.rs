// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/input/stroke_file.rs - 笔画事件文件输入
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{CanvasOrigin, PointerEvent, parse_line},
  url_path,
};

#[derive(Error, Debug)]
pub enum StrokeFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// 预先录制的指针事件，JSON Lines 格式
pub struct StrokeFileInput {
  events: Vec<PointerEvent>,
}

impl FromUrlWithScheme for StrokeFileInput {
  const SCHEME: &'static str = "strokes";
}

impl FromUrl for StrokeFileInput {
  type Error = StrokeFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(StrokeFileInputError::SchemeMismatch);
    }

    let path = url_path(url);
    let text = std::fs::read_to_string(&path).map_err(|source| StrokeFileInputError::IoError {
      path: path.clone(),
      source,
    })?;
    let input = Self::from_text(&text, CanvasOrigin::from_query(url));
    info!("读取 {} 个指针事件: {}", input.events.len(), path.display());
    Ok(input)
  }
}

impl StrokeFileInput {
  pub fn from_text(text: &str, origin: CanvasOrigin) -> Self {
    Self {
      events: text.lines().filter_map(|line| parse_line(line, origin)).collect(),
    }
  }

  pub fn events(&self) -> &[PointerEvent] {
    &self.events
  }

  pub fn into_events(self) -> StrokeFileEvents {
    StrokeFileEvents {
      inner: self.events.into_iter(),
    }
  }
}

pub struct StrokeFileEvents {
  inner: std::vec::IntoIter<PointerEvent>,
}

impl Iterator for StrokeFileEvents {
  type Item = PointerEvent;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.next()
  }
}
