// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{DateTime, Datelike, Local};
use image::GrayImage;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  classify::Classification,
  output::Render,
  preprocess::{ClassifierPreprocessor, PreprocessError},
  url_path,
};

const RECORD_FILE: &str = "records.jsonl";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("缩放错误: {0}")]
  PreprocessError(#[from] PreprocessError),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  image: &'a Path,
  time: String,
  #[serde(flatten)]
  result: &'a Classification,
}

/// 每次识别保存一张画布并追加一行记录，
/// `folder:///dir?full` 保存原始分辨率，否则保存 28x28
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  full_resolution: bool,
  frame_counter: Mutex<u16>,
  preprocessor: ClassifierPreprocessor,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let full_resolution = uri.query_pairs().any(|(k, _)| k == "full");
    Ok(DirectoryRecordOutput::new(url_path(uri)).with_full_resolution(full_resolution))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      full_resolution: false,
      frame_counter: Mutex::new(0),
      preprocessor: ClassifierPreprocessor::default(),
    }
  }

  pub fn with_full_resolution(mut self, full_resolution: bool) -> Self {
    self.full_resolution = full_resolution;
    self
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(
    &self,
    now: &DateTime<Local>,
    character: char,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}-{}.png",
      now.format("%H-%M-%S"),
      self.frame_id(),
      character
    )))
  }

  fn append_record(&self, record: &Record) -> Result<(), DirectoryRecordOutputError> {
    let line = serde_json::to_string(record)?;
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(self.directory.join(RECORD_FILE))?;
    writeln!(file, "{}", line)?;
    Ok(())
  }
}

impl Render<GrayImage, Classification> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &GrayImage, result: &Classification) -> Result<(), Self::Error> {
    let now = Local::now();
    let path = self.frame_path(&now, result.character)?;
    if self.full_resolution {
      frame.save(&path)?;
    } else {
      self.preprocessor.downscale(frame)?.save(&path)?;
    }
    debug!("记录画布: {}", path.display());

    self.append_record(&Record {
      image: &path,
      time: now.to_rfc3339(),
      result,
    })
  }
}
