// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/output/json_lines.rs - JSON Lines 结果输出
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

use std::{
  fs::{File, OpenOptions},
  io::Write,
  sync::Mutex,
};

use image::GrayImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, classify::Classification, output::Render, url_path};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 每个结果追加一行 JSON
pub struct JsonLinesOutput {
  file: Mutex<File>,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonLinesOutputError::SchemeMismatch);
    }
    let path = url_path(url);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(JsonLinesOutput {
      file: Mutex::new(file),
    })
  }
}

impl Render<GrayImage, Classification> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, _frame: &GrayImage, result: &Classification) -> Result<(), Self::Error> {
    let line = serde_json::to_string(result)?;
    let mut file = self
      .file
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    writeln!(file, "{}", line)?;
    Ok(())
  }
}
